//! Planar helpers shared by the simulation and its systems.
//!
//! Angles are expressed in degrees, measured counter-clockwise from the
//! positive x axis.

use glam::Vec2;

use crate::TileBounds;

/// Unit vector pointing along the provided heading.
#[must_use]
pub fn direction_from_degrees(degrees: f32) -> Vec2 {
    let radians = degrees.to_radians();
    Vec2::new(radians.cos(), radians.sin())
}

/// Vector of the provided length pointing along the heading.
#[must_use]
pub fn polar_degrees(degrees: f32, length: f32) -> Vec2 {
    direction_from_degrees(degrees) * length
}

/// Heading of the vector in degrees, within `(-180, 180]`.
#[must_use]
pub fn angle_degrees(vector: Vec2) -> f32 {
    vector.y.atan2(vector.x).to_degrees()
}

/// Signed rotation in `(-180, 180]` that carries `from` onto `to`.
#[must_use]
pub fn shortest_angular_displacement(from: f32, to: f32) -> f32 {
    let displacement = (to - from).rem_euclid(360.0);
    if displacement > 180.0 {
        displacement - 360.0
    } else {
        displacement
    }
}

/// Rotates `current` toward `goal` by at most `max_delta` degrees.
///
/// Returns `goal` itself once it is within reach so repeated calls settle exactly.
#[must_use]
pub fn turned_toward(current: f32, goal: f32, max_delta: f32) -> f32 {
    let displacement = shortest_angular_displacement(current, goal);
    if displacement.abs() <= max_delta {
        goal
    } else {
        current + max_delta.copysign(displacement)
    }
}

/// Reports whether two discs overlap. Touching discs do not overlap.
#[must_use]
pub fn discs_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let reach = radius_a + radius_b;
    a.distance_squared(b) < reach * reach
}

/// Moves a disc so that `point` lies on or outside its rim.
///
/// A disc centred exactly on the point has no defined escape direction and is left in place.
#[must_use]
pub fn push_disc_out_of_point(center: Vec2, radius: f32, point: Vec2) -> Vec2 {
    let offset = center - point;
    let distance = offset.length();
    if distance >= radius || distance <= f32::EPSILON {
        return center;
    }
    center + offset / distance * (radius - distance)
}

/// Moves the `mobile` disc out of the `fixed` disc, leaving the fixed disc untouched.
#[must_use]
pub fn push_disc_out_of_disc(mobile: Vec2, mobile_radius: f32, fixed: Vec2, fixed_radius: f32) -> Vec2 {
    let reach = mobile_radius + fixed_radius;
    let offset = mobile - fixed;
    let distance = offset.length();
    if distance >= reach {
        return mobile;
    }
    let direction = separation_axis(offset, distance);
    mobile + direction * (reach - distance)
}

/// Separates two overlapping discs along the line between their centres.
///
/// The overlap is shared in inverse proportion to radius: the larger disc
/// moves less, and equal discs move equally.
#[must_use]
pub fn push_discs_apart(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> (Vec2, Vec2) {
    let reach = radius_a + radius_b;
    let offset = a - b;
    let distance = offset.length();
    if distance >= reach || reach <= 0.0 {
        return (a, b);
    }
    let direction = separation_axis(offset, distance);
    let overlap = reach - distance;
    let share_a = radius_b / reach;
    let share_b = radius_a / reach;
    (
        a + direction * (overlap * share_a),
        b - direction * (overlap * share_b),
    )
}

/// Moves a disc out of an axis-aligned box it overlaps.
///
/// A disc whose centre lies inside the box is left in place.
#[must_use]
pub fn push_disc_out_of_bounds(center: Vec2, radius: f32, bounds: TileBounds) -> Vec2 {
    let nearest = bounds.nearest_point(center);
    push_disc_out_of_point(center, radius, nearest)
}

/// Component of `vector` along `axis`. A zero axis yields a zero projection.
#[must_use]
pub fn projected_onto(vector: Vec2, axis: Vec2) -> Vec2 {
    let length_squared = axis.length_squared();
    if length_squared <= f32::EPSILON {
        return Vec2::ZERO;
    }
    axis * (vector.dot(axis) / length_squared)
}

fn separation_axis(offset: Vec2, distance: f32) -> Vec2 {
    if distance > f32::EPSILON {
        offset / distance
    } else {
        Vec2::X
    }
}
