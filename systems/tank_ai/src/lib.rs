#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Steering system for roaming NPC tanks.
//!
//! Each tick a tank looks for an opposing combatant, falling back to a
//! friendly pickup. A sighted target becomes the goal position; without one
//! the tank wanders on random headings. Three short whisker rays deflect the
//! goal heading away from solid terrain, and the hull turns toward that
//! heading at a fixed rate.

use incursion_core::{geometry, EntityKind, Pose, RaycastResult, Sensor, Vec2};
use rand::Rng;

/// Tunable constants that drive tank steering.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TankTuning {
    /// Full forward speed in world units per second.
    pub speed: f32,
    /// Hull turn rate in degrees per second.
    pub turn_speed: f32,
    /// Range of the perception raycast.
    pub detect_range: f32,
    /// Heading error above which the tank slows down.
    pub forward_degrees: f32,
    /// Heading error within which the tank may fire.
    pub shoot_degrees: f32,
    /// Seconds between shots.
    pub shoot_cooldown: f32,
    /// Seconds a wander heading is held before a new one is drawn.
    pub wander_countdown: f32,
    /// Length of each whisker ray.
    pub whisker_length: f32,
    /// Degrees added to a whisker's impact normal when steering away from it.
    pub whisker_deflection: f32,
    /// Fraction of full speed used while the heading error is large.
    pub slow_fraction: f32,
}

impl Default for TankTuning {
    fn default() -> Self {
        Self {
            speed: EntityKind::NpcTank.profile().speed_limit,
            turn_speed: 100.0,
            detect_range: 10.0,
            forward_degrees: 45.0,
            shoot_degrees: 5.0,
            shoot_cooldown: 1.7,
            wander_countdown: 2.0,
            whisker_length: 1.0,
            whisker_deflection: 70.0,
            slow_fraction: 0.4,
        }
    }
}

/// Results of the last whisker probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Whiskers {
    /// Ray cast from the left flank.
    pub left: RaycastResult,
    /// Ray cast from the right flank.
    pub right: RaycastResult,
    /// Ray cast from the hull centre.
    pub center: RaycastResult,
}

impl Whiskers {
    fn any_blocked(&self) -> bool {
        self.left.impacted || self.right.impacted || self.center.impacted
    }

    fn all_blocked(&self) -> bool {
        self.left.impacted && self.right.impacted && self.center.impacted
    }
}

/// Per-tank steering memory.
#[derive(Clone, Debug, PartialEq)]
pub struct TankBrain {
    goal_position: Vec2,
    goal_orientation: f32,
    goal_position_reached: bool,
    goal_angle_reached: bool,
    whiskers: Option<Whiskers>,
    shoot_countdown: f32,
    wander_countdown: f32,
}

impl Default for TankBrain {
    fn default() -> Self {
        Self {
            goal_position: Vec2::ZERO,
            goal_orientation: 0.0,
            goal_position_reached: true,
            goal_angle_reached: true,
            whiskers: None,
            shoot_countdown: 0.0,
            wander_countdown: 0.0,
        }
    }
}

impl TankBrain {
    /// Creates a brain with no goal, ready to draw a wander heading.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Goal position the tank is driving toward, if it has one.
    #[must_use]
    pub fn goal_position(&self) -> Option<Vec2> {
        (!self.goal_position_reached).then_some(self.goal_position)
    }

    /// Heading the hull is turning toward.
    #[must_use]
    pub const fn goal_orientation(&self) -> f32 {
        self.goal_orientation
    }

    /// Whisker results from the most recent probe.
    #[must_use]
    pub const fn whiskers(&self) -> Option<&Whiskers> {
        self.whiskers.as_ref()
    }
}

/// Steering decision produced for one tank on one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TankCommand {
    /// New hull heading in degrees.
    pub orientation_degrees: f32,
    /// New velocity.
    pub velocity: Vec2,
    /// Whether the tank fires along its pre-turn heading this tick.
    pub fire: bool,
}

/// Tank steering system.
#[derive(Clone, Copy, Debug, Default)]
pub struct TankAi {
    tuning: TankTuning,
}

impl TankAi {
    /// Creates a steering system with the provided tuning.
    #[must_use]
    pub const fn new(tuning: TankTuning) -> Self {
        Self { tuning }
    }

    /// Tuning the system was created with.
    #[must_use]
    pub const fn tuning(&self) -> &TankTuning {
        &self.tuning
    }

    /// Advances one tank's steering by `dt` seconds.
    pub fn think<S, R>(
        &self,
        brain: &mut TankBrain,
        pose: Pose,
        sensor: &S,
        rng: &mut R,
        dt: f32,
    ) -> TankCommand
    where
        S: Sensor + ?Sized,
        R: Rng + ?Sized,
    {
        let mut fire = false;
        if let Some(sighting) =
            sensor.raycast_for_faction(pose.faction, pose.position, self.tuning.detect_range)
        {
            brain.goal_position = sighting.position;
            brain.goal_position_reached = false;
            if !sighting.is_pickup() {
                brain.goal_angle_reached = true;
                fire = self.check_to_shoot(brain, pose, dt);
            }
        }

        if !brain.goal_position_reached {
            let offset = brain.goal_position - pose.position;
            if offset.length() < pose.physics_radius {
                brain.goal_position_reached = true;
            } else {
                brain.goal_orientation = geometry::angle_degrees(offset);
            }
        }

        if brain.goal_angle_reached {
            self.avoid_walls(brain, pose, sensor);
        }

        if brain.goal_position_reached {
            if brain.wander_countdown <= 0.0 {
                brain.goal_orientation = rng.gen_range(0.0..360.0);
                brain.wander_countdown = self.tuning.wander_countdown;
            } else {
                brain.wander_countdown -= dt;
            }
        }

        let error = geometry::shortest_angular_displacement(
            pose.orientation_degrees,
            brain.goal_orientation,
        );
        if error.abs() <= f32::EPSILON {
            brain.goal_angle_reached = true;
        }

        let orientation = geometry::turned_toward(
            pose.orientation_degrees,
            brain.goal_orientation,
            self.tuning.turn_speed * dt,
        );
        let remaining = geometry::shortest_angular_displacement(orientation, brain.goal_orientation);
        let speed = if remaining.abs() > self.tuning.forward_degrees {
            self.tuning.slow_fraction * self.tuning.speed
        } else {
            self.tuning.speed
        };

        TankCommand {
            orientation_degrees: orientation,
            velocity: geometry::polar_degrees(orientation, speed),
            fire,
        }
    }

    fn check_to_shoot(&self, brain: &mut TankBrain, pose: Pose, dt: f32) -> bool {
        let bearing = geometry::angle_degrees(brain.goal_position - pose.position);
        let error = geometry::shortest_angular_displacement(pose.orientation_degrees, bearing);
        if error.abs() >= self.tuning.shoot_degrees {
            brain.shoot_countdown = 0.0;
            return false;
        }
        if brain.shoot_countdown <= 0.0 {
            brain.shoot_countdown = self.tuning.shoot_cooldown;
            true
        } else {
            brain.shoot_countdown -= dt;
            false
        }
    }

    fn avoid_walls<S>(&self, brain: &mut TankBrain, pose: Pose, sensor: &S)
    where
        S: Sensor + ?Sized,
    {
        let forward = geometry::direction_from_degrees(pose.orientation_degrees);
        let side = forward.perp();
        let offset = side * pose.physics_radius;
        let length = self.tuning.whisker_length;
        let whiskers = Whiskers {
            left: sensor.raycast(pose.position + offset, forward, length),
            right: sensor.raycast(pose.position - offset, forward, length),
            center: sensor.raycast(pose.position, forward, length),
        };
        brain.whiskers = Some(whiskers);

        if !whiskers.any_blocked() {
            return;
        }

        let deflection = self.tuning.whisker_deflection;
        if whiskers.all_blocked() {
            brain.goal_orientation = pose.orientation_degrees + 180.0;
            brain.goal_angle_reached = false;
            return;
        }

        let steer_right = normal_degrees(&whiskers.left, &whiskers.center) + deflection;
        let steer_left = normal_degrees(&whiskers.right, &whiskers.center) - deflection;
        brain.goal_orientation = match (whiskers.left.impacted, whiskers.right.impacted) {
            (true, false) => steer_right,
            (false, true) => steer_left,
            _ if brain.goal_position_reached => {
                if whiskers.left.impact_distance < whiskers.right.impact_distance {
                    steer_right
                } else {
                    steer_left
                }
            }
            _ => {
                let bearing = geometry::angle_degrees(brain.goal_position - pose.position);
                let right_error = geometry::shortest_angular_displacement(steer_right, bearing);
                let left_error = geometry::shortest_angular_displacement(steer_left, bearing);
                if right_error.abs() > left_error.abs() {
                    steer_left
                } else {
                    steer_right
                }
            }
        };
    }
}

/// Heading of the flank whisker's normal, or of the centre whisker's when the flank is clear.
fn normal_degrees(flank: &RaycastResult, center: &RaycastResult) -> f32 {
    if flank.impacted {
        geometry::angle_degrees(flank.impact_normal)
    } else {
        geometry::angle_degrees(center.impact_normal)
    }
}
