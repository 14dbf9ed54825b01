use incursion_core::{EntityKind, Faction, RaycastResult, Sensor, Sighting, TileGrid, Vec2};

use crate::registry::Registry;

/// Perception order: the first visible candidate wins, not the closest.
const SIGHTING_PRIORITY: [EntityKind; 4] = [
    EntityKind::Player,
    EntityKind::NpcTurret,
    EntityKind::NpcTank,
    EntityKind::Pickup,
];

/// Answers steering queries against one map's tiles and entities.
pub(crate) struct MapSensor<'a> {
    grid: &'a TileGrid,
    registry: &'a Registry,
}

impl<'a> MapSensor<'a> {
    pub(crate) fn new(grid: &'a TileGrid, registry: &'a Registry) -> Self {
        Self { grid, registry }
    }
}

impl Sensor for MapSensor<'_> {
    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> RaycastResult {
        incursion_system_raycast::raycast(self.grid, origin, direction, max_distance)
    }

    fn raycast_for_faction(
        &self,
        faction: Faction,
        origin: Vec2,
        max_distance: f32,
    ) -> Option<Sighting> {
        for kind in SIGHTING_PRIORITY {
            for entity in self.registry.iter_kind(kind) {
                if !entity.alive {
                    continue;
                }
                let eligible = if kind == EntityKind::Pickup {
                    entity.faction == faction
                } else {
                    faction.opposes(entity.faction)
                };
                if !eligible {
                    continue;
                }

                let offset = entity.position - origin;
                let distance = offset.length();
                let result = self.raycast(origin, offset.normalize_or_zero(), max_distance);
                if distance < result.impact_distance {
                    return Some(Sighting {
                        entity: entity.id,
                        faction: entity.faction,
                        position: entity.position,
                    });
                }
            }
        }
        None
    }
}
