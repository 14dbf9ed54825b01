//! Pairwise collision responses used by the tick pipeline.

use incursion_core::{geometry, TileCoord, TileGrid};

use crate::entity::Entity;

/// Neighbour offsets examined when pushing an entity out of solid tiles.
const TILE_FAN: [(i32, i32); 8] = [
    (1, 0),
    (0, 1),
    (-1, 0),
    (0, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
    (1, -1),
];

/// Pushes overlapping entities apart according to their capabilities.
///
/// Both sides move when both can be pushed; otherwise only the pushable side
/// moves, and only when the other side pushes.
pub(crate) fn resolve_pair(a: &mut Entity, b: &mut Entity) {
    let (caps_a, caps_b) = (a.capabilities, b.capabilities);
    if !caps_a.pushed_by_others() && !caps_b.pushed_by_others() {
        return;
    }
    if !caps_a.pushes_others() && !caps_b.pushes_others() {
        return;
    }
    if !a.overlaps(b) {
        return;
    }

    if caps_a.pushed_by_others() && caps_b.pushed_by_others() {
        let (moved_a, moved_b) =
            geometry::push_discs_apart(a.position, a.physics_radius, b.position, b.physics_radius);
        a.position = moved_a;
        b.position = moved_b;
    } else if caps_a.pushed_by_others() && caps_b.pushes_others() {
        a.position =
            geometry::push_disc_out_of_disc(a.position, a.physics_radius, b.position, b.physics_radius);
    } else if caps_b.pushed_by_others() && caps_a.pushes_others() {
        b.position =
            geometry::push_disc_out_of_disc(b.position, b.physics_radius, a.position, a.physics_radius);
    }
}

/// Reflects `mobile` off the fixed disc `still`, keeping its speed.
pub(crate) fn deflect(mobile: &mut Entity, still: &Entity) {
    let normal = still.position - mobile.position;
    let along_normal = geometry::projected_onto(mobile.velocity, normal);
    let tangent = mobile.velocity - along_normal;
    mobile.velocity = tangent - along_normal;
    mobile.orientation_degrees = geometry::angle_degrees(mobile.velocity);
    mobile.position = geometry::push_disc_out_of_disc(
        mobile.position,
        mobile.physics_radius,
        still.position,
        still.physics_radius,
    );
}

/// Pushes a wall-pushable entity out of the solid tiles around its own tile.
///
/// Only the eight neighbours are examined, so radii must stay below one tile.
pub(crate) fn push_out_of_tiles(grid: &TileGrid, entity: &mut Entity) {
    if !entity.capabilities.pushed_by_walls() {
        return;
    }
    let home = TileCoord::containing(entity.position);
    for (dx, dy) in TILE_FAN {
        let coord = home.offset(dx, dy);
        if grid.contains(coord) && grid.is_solid(coord) {
            entity.position =
                geometry::push_disc_out_of_bounds(entity.position, entity.physics_radius, coord.bounds());
        }
    }
}
