#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Steering system for stationary NPC turrets.
//!
//! A turret that sees an opposing combatant stops scanning, turns toward it
//! and fires when its barrel is within tolerance. Otherwise it sweeps back and
//! forth across an arc centred on the last bearing it saw a target at, or
//! spins in one direction until it has seen one.

use incursion_core::{geometry, Pose, Sensor};

/// Tunable constants that drive turret steering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurretTuning {
    /// Barrel turn rate in degrees per second, used for tracking and scanning.
    pub turn_speed: f32,
    /// Range of the perception raycast.
    pub detect_range: f32,
    /// Bearing error within which the turret may fire.
    pub shoot_degrees: f32,
    /// Seconds between shots.
    pub shoot_cooldown: f32,
    /// Half-width of the scan arc around the last seen bearing.
    pub scan_range: f32,
}

impl Default for TurretTuning {
    fn default() -> Self {
        Self {
            turn_speed: 100.0,
            detect_range: 15.0,
            shoot_degrees: 5.0,
            shoot_cooldown: 1.3,
            scan_range: 45.0,
        }
    }
}

/// Per-turret steering memory.
#[derive(Clone, Debug, PartialEq)]
pub struct TurretBrain {
    last_seen_degrees: f32,
    target_seen: bool,
    shoot_countdown: f32,
    angular_velocity: f32,
}

impl TurretBrain {
    /// Creates a brain that has never seen a target and sweeps counter-clockwise.
    #[must_use]
    pub fn new(tuning: &TurretTuning) -> Self {
        Self {
            last_seen_degrees: 0.0,
            target_seen: false,
            shoot_countdown: 0.0,
            angular_velocity: tuning.turn_speed,
        }
    }

    /// Bearing at which a target was last seen, if one ever was.
    #[must_use]
    pub fn last_seen_degrees(&self) -> Option<f32> {
        self.target_seen.then_some(self.last_seen_degrees)
    }

    /// Current scan rate in degrees per second. Zero while tracking.
    #[must_use]
    pub const fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }
}

/// Steering decision produced for one turret on one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TurretCommand {
    /// New barrel heading in degrees.
    pub orientation_degrees: f32,
    /// Angular velocity the world integrates during the update.
    pub angular_velocity: f32,
    /// Whether the turret fires along its new heading this tick.
    pub fire: bool,
}

/// Turret steering system.
#[derive(Clone, Copy, Debug, Default)]
pub struct TurretAi {
    tuning: TurretTuning,
}

impl TurretAi {
    /// Creates a steering system with the provided tuning.
    #[must_use]
    pub const fn new(tuning: TurretTuning) -> Self {
        Self { tuning }
    }

    /// Tuning the system was created with.
    #[must_use]
    pub const fn tuning(&self) -> &TurretTuning {
        &self.tuning
    }

    /// Creates a brain configured for this system.
    #[must_use]
    pub fn brain(&self) -> TurretBrain {
        TurretBrain::new(&self.tuning)
    }

    /// Advances one turret's steering by `dt` seconds.
    ///
    /// Only combatants are tracked; a pickup sighting is treated as nothing seen.
    pub fn think<S>(&self, brain: &mut TurretBrain, pose: Pose, sensor: &S, dt: f32) -> TurretCommand
    where
        S: Sensor + ?Sized,
    {
        let sighting = sensor
            .raycast_for_faction(pose.faction, pose.position, self.tuning.detect_range)
            .filter(|sighting| !sighting.is_pickup());

        let Some(target) = sighting else {
            let drift = geometry::shortest_angular_displacement(
                brain.last_seen_degrees,
                pose.orientation_degrees,
            );
            if !brain.target_seen || brain.angular_velocity == 0.0 || drift < -self.tuning.scan_range {
                brain.angular_velocity = self.tuning.turn_speed;
            } else if drift > self.tuning.scan_range {
                brain.angular_velocity = -self.tuning.turn_speed;
            }
            return TurretCommand {
                orientation_degrees: pose.orientation_degrees,
                angular_velocity: brain.angular_velocity,
                fire: false,
            };
        };

        brain.target_seen = true;
        brain.angular_velocity = 0.0;
        brain.last_seen_degrees = geometry::angle_degrees(target.position - pose.position);
        let orientation = geometry::turned_toward(
            pose.orientation_degrees,
            brain.last_seen_degrees,
            self.tuning.turn_speed * dt,
        );

        let error = geometry::shortest_angular_displacement(orientation, brain.last_seen_degrees);
        let fire = if error.abs() < self.tuning.shoot_degrees {
            if brain.shoot_countdown <= 0.0 {
                brain.shoot_countdown = self.tuning.shoot_cooldown;
                true
            } else {
                brain.shoot_countdown -= dt;
                false
            }
        } else {
            brain.shoot_countdown = 0.0;
            false
        };

        TurretCommand {
            orientation_degrees: orientation,
            angular_velocity: 0.0,
            fire,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incursion_core::{EntityId, EntityKind, Faction, RaycastResult, Sighting, Vec2};

    struct FakeSensor {
        sighting: Option<Sighting>,
    }

    impl Sensor for FakeSensor {
        fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> RaycastResult {
            RaycastResult::miss(origin, direction, max_distance)
        }

        fn raycast_for_faction(
            &self,
            _faction: Faction,
            _origin: Vec2,
            _max_distance: f32,
        ) -> Option<Sighting> {
            self.sighting
        }
    }

    fn turret(orientation_degrees: f32) -> Pose {
        Pose {
            position: Vec2::new(5.0, 5.0),
            orientation_degrees,
            physics_radius: 0.29,
            faction: Faction::Evil,
        }
    }

    fn sighting(kind: EntityKind, position: Vec2) -> FakeSensor {
        FakeSensor {
            sighting: Some(Sighting {
                entity: EntityId::new(kind, 0, 0),
                faction: Faction::Good,
                position,
            }),
        }
    }

    /// Integrates the scan rate the way the world does and returns the headings visited.
    fn sweep(ai: &TurretAi, brain: &mut TurretBrain, sensor: &FakeSensor, ticks: usize) -> Vec<f32> {
        let dt = 0.05;
        let mut pose = turret(0.0);
        let mut headings = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            let command = ai.think(brain, pose, sensor, dt);
            pose.orientation_degrees = command.orientation_degrees + command.angular_velocity * dt;
            headings.push(pose.orientation_degrees);
        }
        headings
    }

    #[test]
    fn unseen_turret_spins_counter_clockwise() {
        let ai = TurretAi::default();
        let mut brain = ai.brain();
        let headings = sweep(&ai, &mut brain, &FakeSensor { sighting: None }, 100);
        assert!(headings.windows(2).all(|pair| pair[1] > pair[0]));
        assert_eq!(brain.last_seen_degrees(), None);
    }

    #[test]
    fn tracking_turns_at_fixed_rate_and_stops_scanning() {
        let ai = TurretAi::default();
        let mut brain = ai.brain();
        let sensor = sighting(EntityKind::Player, Vec2::new(5.0, 10.0));
        let command = ai.think(&mut brain, turret(0.0), &sensor, 0.1);
        assert!((command.orientation_degrees - 10.0).abs() < 1e-4);
        assert_eq!(command.angular_velocity, 0.0);
        assert!(!command.fire);
        let last_seen = brain.last_seen_degrees().expect("target seen");
        assert!((last_seen - 90.0).abs() < 1e-3);
    }

    #[test]
    fn fires_at_most_once_per_cooldown() {
        let ai = TurretAi::default();
        let mut brain = ai.brain();
        let sensor = sighting(EntityKind::Player, Vec2::new(12.0, 5.0));
        let dt = 1.0 / 60.0;
        let mut shot_times = Vec::new();
        for tick in 0..600 {
            if ai.think(&mut brain, turret(0.0), &sensor, dt).fire {
                shot_times.push(tick as f32 * dt);
            }
        }
        assert!(shot_times.len() >= 2);
        for pair in shot_times.windows(2) {
            assert!(pair[1] - pair[0] >= 1.3 - 1e-3);
        }
    }

    #[test]
    fn pickups_are_not_tracked() {
        let ai = TurretAi::default();
        let mut brain = ai.brain();
        let sensor = sighting(EntityKind::Pickup, Vec2::new(12.0, 5.0));
        let command = ai.think(&mut brain, turret(30.0), &sensor, 0.1);
        assert!(!command.fire);
        assert_eq!(command.orientation_degrees, 30.0);
        assert_eq!(command.angular_velocity, 100.0);
    }

    #[test]
    fn lost_target_is_swept_around_its_last_bearing() {
        let ai = TurretAi::default();
        let mut brain = ai.brain();
        let seen = sighting(EntityKind::Player, Vec2::new(12.0, 5.0));
        let _ = ai.think(&mut brain, turret(0.0), &seen, 0.05);
        assert_eq!(brain.last_seen_degrees(), Some(0.0));

        let headings = sweep(&ai, &mut brain, &FakeSensor { sighting: None }, 400);
        let settled = &headings[100..];
        let low = settled.iter().copied().fold(f32::INFINITY, f32::min);
        let high = settled.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(low > -55.0 && low < -40.0, "low edge {low}");
        assert!(high < 55.0 && high > 40.0, "high edge {high}");
    }
}
