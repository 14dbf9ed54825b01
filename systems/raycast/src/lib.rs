#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Fixed-resolution raycasting against a tile grid.
//!
//! Rays are sampled every 1/50th of a world unit. When a sample lands in a
//! solid tile the impact is placed on that tile's bounds at the point nearest
//! to the previous sample, so thin solids shorter than one step can be missed.
//! Samples that leave the grid count as solid.

use incursion_core::{RaycastResult, TileBounds, TileCoord, TileGrid, Vec2};

/// Number of samples taken per world unit travelled.
pub const SAMPLES_PER_UNIT: f32 = 50.0;

/// Casts a ray from `origin` along the unit vector `direction`.
///
/// Returns the first solid impact within `max_distance`, or a miss whose
/// impact distance equals `max_distance`.
#[must_use]
pub fn raycast(grid: &TileGrid, origin: Vec2, direction: Vec2, max_distance: f32) -> RaycastResult {
    if direction.length_squared() <= f32::EPSILON {
        return RaycastResult::miss(origin, direction, max_distance);
    }

    let step = 1.0 / SAMPLES_PER_UNIT;
    let mut sample: u32 = 0;
    loop {
        let travelled = sample as f32 * step;
        if travelled > max_distance {
            break;
        }

        let previous = origin + direction * travelled;
        let probe = previous + direction * step;
        let coord = TileCoord::containing(probe);
        if grid.is_solid(coord) {
            let bounds = coord.bounds();
            let impact = bounds.nearest_point(previous);
            let distance = impact.distance(origin);
            if distance > max_distance {
                break;
            }
            return RaycastResult {
                impacted: true,
                impact_position: impact,
                impact_distance: distance,
                impact_normal: face_normal(impact, bounds),
                impact_tile: grid.tile(coord),
            };
        }

        sample = match sample.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    RaycastResult::miss(origin, direction, max_distance)
}

/// Reports whether `to` is visible from `from` within `max_distance`.
#[must_use]
pub fn has_line_of_sight(grid: &TileGrid, from: Vec2, to: Vec2, max_distance: f32) -> bool {
    let offset = to - from;
    let distance = offset.length();
    if distance > max_distance {
        return false;
    }
    if distance <= f32::EPSILON {
        return !grid.is_solid_at(from);
    }
    !raycast(grid, from, offset / distance, distance).impacted
}

fn face_normal(point: Vec2, bounds: TileBounds) -> Vec2 {
    if point.x == bounds.min().x {
        Vec2::new(-1.0, 0.0)
    } else if point.x == bounds.max().x {
        Vec2::new(1.0, 0.0)
    } else if point.y == bounds.min().y {
        Vec2::new(0.0, -1.0)
    } else {
        Vec2::new(0.0, 1.0)
    }
}
