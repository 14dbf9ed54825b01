use incursion_core::{
    geometry, Capabilities, EntityId, EntitySnapshot, Faction, PickupKind, PlayerIntent, Pose,
    Vec2,
};
use incursion_system_tank_ai::TankBrain;
use incursion_system_turret_ai::TurretBrain;

/// Kind-specific state carried alongside the shared entity attributes.
#[derive(Clone, Debug)]
pub(crate) enum Behavior {
    Player(PlayerState),
    Tank(TankBrain),
    Turret(TurretBrain),
    Boulder,
    Bullet,
    Bomb,
    Pickup(PickupKind),
    Explosion { radius: f32, duration: f32 },
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PlayerState {
    pub(crate) intent: PlayerIntent,
    pub(crate) gun_relative_degrees: f32,
}

#[derive(Clone, Debug)]
pub(crate) struct Entity {
    pub(crate) id: EntityId,
    pub(crate) faction: Faction,
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) acceleration: Vec2,
    pub(crate) orientation_degrees: f32,
    pub(crate) angular_velocity: f32,
    pub(crate) physics_radius: f32,
    pub(crate) cosmetic_radius: f32,
    pub(crate) speed_limit: f32,
    pub(crate) health: i32,
    pub(crate) health_limit: i32,
    pub(crate) bomb_charges: u32,
    pub(crate) living_time: f32,
    pub(crate) alive: bool,
    pub(crate) capabilities: Capabilities,
    pub(crate) behavior: Behavior,
}

impl Entity {
    pub(crate) fn new(
        id: EntityId,
        faction: Faction,
        position: Vec2,
        orientation_degrees: f32,
        behavior: Behavior,
    ) -> Self {
        let profile = id.kind().profile();
        let cosmetic_radius = match behavior {
            Behavior::Explosion { radius, .. } => radius,
            _ => profile.cosmetic_radius,
        };
        Self {
            id,
            faction,
            position,
            velocity: Vec2::ZERO,
            acceleration: Vec2::ZERO,
            orientation_degrees,
            angular_velocity: 0.0,
            physics_radius: profile.physics_radius,
            cosmetic_radius,
            speed_limit: profile.speed_limit,
            health: profile.health,
            health_limit: profile.health,
            bomb_charges: 0,
            living_time: 0.0,
            alive: true,
            capabilities: profile.capabilities,
            behavior,
        }
    }

    pub(crate) fn pose(&self) -> Pose {
        Pose {
            position: self.position,
            orientation_degrees: self.orientation_degrees,
            physics_radius: self.physics_radius,
            faction: self.faction,
        }
    }

    pub(crate) fn gun_orientation_degrees(&self) -> f32 {
        match &self.behavior {
            Behavior::Player(state) => self.orientation_degrees + state.gun_relative_degrees,
            _ => self.orientation_degrees,
        }
    }

    /// Applies angular velocity, acceleration and velocity over `dt` seconds.
    pub(crate) fn integrate(&mut self, dt: f32) {
        self.living_time += dt;
        self.orientation_degrees += self.angular_velocity * dt;
        self.velocity += self.acceleration * dt;
        self.velocity = self.velocity.clamp_length_max(self.speed_limit);
        self.position += self.velocity * dt;
    }

    pub(crate) fn collect(&mut self, pickup: PickupKind) {
        match pickup {
            PickupKind::Health => {
                self.health = (self.health + incursion_core::PICKUP_HEALTH_VALUE).min(self.health_limit);
            }
            PickupKind::FactionBomb => self.bomb_charges = self.bomb_charges.saturating_add(1),
        }
    }

    pub(crate) fn overlaps(&self, other: &Entity) -> bool {
        geometry::discs_overlap(
            self.position,
            self.physics_radius,
            other.position,
            other.physics_radius,
        )
    }

    pub(crate) fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            faction: self.faction,
            position: self.position,
            velocity: self.velocity,
            orientation_degrees: self.orientation_degrees,
            gun_orientation_degrees: self.gun_orientation_degrees(),
            physics_radius: self.physics_radius,
            cosmetic_radius: self.cosmetic_radius,
            health: self.health,
            health_limit: self.health_limit,
            bomb_charges: self.bomb_charges,
            pickup: match self.behavior {
                Behavior::Pickup(kind) => Some(kind),
                _ => None,
            },
            living_time: self.living_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incursion_core::EntityKind;

    fn tank() -> Entity {
        Entity::new(
            EntityId::new(EntityKind::NpcTank, 0, 0),
            Faction::Evil,
            Vec2::new(2.0, 2.0),
            0.0,
            Behavior::Tank(TankBrain::new()),
        )
    }

    #[test]
    fn integration_clamps_speed_to_limit() {
        let mut entity = tank();
        entity.velocity = Vec2::new(5.0, 0.0);
        entity.angular_velocity = 90.0;
        entity.integrate(0.5);
        assert!((entity.position.x - 2.4).abs() < 1e-5);
        assert!((entity.orientation_degrees - 45.0).abs() < 1e-5);
        assert!((entity.living_time - 0.5).abs() < 1e-6);
    }

    #[test]
    fn health_pickups_are_capped() {
        let mut entity = tank();
        entity.collect(PickupKind::Health);
        assert_eq!(entity.health, entity.health_limit);
        entity.health = 1;
        entity.collect(PickupKind::Health);
        assert_eq!(entity.health, 2);
        entity.collect(PickupKind::FactionBomb);
        assert_eq!(entity.bomb_charges, 1);
    }

    #[test]
    fn explosions_take_their_radius_from_the_behavior() {
        let explosion = Entity::new(
            EntityId::new(EntityKind::Explosion, 0, 0),
            Faction::Neutral,
            Vec2::ZERO,
            0.0,
            Behavior::Explosion {
                radius: 4.0,
                duration: 1.2,
            },
        );
        assert_eq!(explosion.cosmetic_radius, 4.0);
        assert_eq!(explosion.snapshot().pickup, None);
    }
}
