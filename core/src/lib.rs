#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Incursion simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing player intents and debug requests, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! that audio and HUD collaborators react to. Systems receive a [`Sensor`]
//! implemented by the world and answer with steering decisions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

pub mod geometry;
mod levels;
mod tiles;

pub use levels::{LevelRecipe, WormSpec};
pub use tiles::{
    DefinitionError, TileBounds, TileCoord, TileDefinition, TileDefinitions, TileGrid, TileType,
};

/// Launch speed and speed limit of bullets and bombs, in world units per second.
pub const BULLET_SPEED: f32 = 2.0;
/// Age in seconds after which a bomb detonates on touching solid terrain.
pub const BOMB_FUSE_SECONDS: f32 = 1.0;
/// Radius of the faction conversion applied by a detonating bomb.
pub const BOMB_EXPLOSION_RADIUS: f32 = 4.0;
/// Longest lifetime of a cosmetic explosion, in seconds.
pub const EXPLOSION_MAX_DURATION: f32 = 3.0;
/// Health restored by a health pickup.
pub const PICKUP_HEALTH_VALUE: i32 = 1;
/// Probability that a dropped pickup carries a faction bomb instead of health.
pub const FACTION_BOMB_DROP_CHANCE: f32 = 0.2;
/// Hull turn rate of the player, in degrees per second.
pub const PLAYER_TURN_SPEED: f32 = 180.0;
/// Gun turn rate of the player, in degrees per second.
pub const PLAYER_GUN_TURN_SPEED: f32 = 270.0;
/// Respawns granted after the player's first spawn.
pub const PLAYER_RESPAWNS: u32 = 4;
/// Where the player enters every level.
pub const PLAYER_SPAWN_POSITION: Vec2 = Vec2::new(1.5, 1.5);

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Replaces the controls applied to the player on subsequent ticks.
    SetPlayerIntent {
        /// Controls to apply.
        intent: PlayerIntent,
    },
    /// Spawns the player, replacing any existing player in place.
    SpawnPlayer,
    /// Spawns an NPC on the current map.
    SpawnNpc {
        /// Kind of NPC to spawn. Only tanks, turrets and boulders are accepted.
        kind: EntityKind,
        /// Faction assigned to the NPC.
        faction: Faction,
        /// Explicit position, or `None` to draw a random enemy spawn point.
        at: Option<Vec2>,
    },
    /// Toggles whether the player takes part in entity collisions.
    SetPlayerCollision {
        /// `false` lets the player pass through entities and bullets.
        enabled: bool,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an entity joined the current map.
    EntitySpawned {
        /// Identifier assigned to the entity.
        entity: EntityId,
        /// Faction of the entity.
        faction: Faction,
    },
    /// Reports that an entity launched a bullet or bomb.
    ShotFired {
        /// Entity that fired.
        shooter: EntityId,
        /// Bullet or bomb that was launched.
        projectile: EntityId,
    },
    /// Reports that an entity lost health.
    EntityDamaged {
        /// Entity that was hurt.
        entity: EntityId,
        /// Health left after the hit.
        health: i32,
    },
    /// Reports that an entity died. Its slot is reclaimed on the next cleanup pass.
    EntityDied {
        /// Entity that died.
        entity: EntityId,
    },
    /// Reports that an entity changed sides.
    FactionSwitched {
        /// Entity that switched.
        entity: EntityId,
        /// Faction the entity now belongs to.
        faction: Faction,
    },
    /// Reports that a bomb went off.
    BombDetonated {
        /// Bomb that detonated.
        bomb: EntityId,
        /// Number of NPCs converted by the blast.
        converted: u32,
    },
    /// Reports that a pickup was consumed.
    PickupCollected {
        /// Pickup that was consumed.
        pickup: EntityId,
        /// Entity that collected it.
        collector: EntityId,
        /// Resource carried by the pickup.
        kind: PickupKind,
    },
    /// Reports that a bullet bounced off a boulder.
    BulletDeflected {
        /// Bullet that bounced.
        bullet: EntityId,
        /// Boulder it bounced off.
        boulder: EntityId,
    },
    /// Announces that the current level was cleared.
    LevelCompleted {
        /// Zero-based index of the cleared level.
        level: usize,
    },
    /// Announces that a level became current.
    LevelStarted {
        /// Zero-based index of the level.
        level: usize,
    },
    /// Announces that the final level was cleared.
    CampaignWon,
    /// Confirms that the player spawned.
    PlayerSpawned {
        /// Identifier of the player entity.
        player: EntityId,
        /// Respawns still available.
        respawns_remaining: u32,
    },
    /// Reports a refused player spawn: no respawns remain or the campaign is won.
    PlayerRespawnDenied,
    /// Reports that an NPC spawn request was refused.
    SpawnRejected {
        /// Kind that was requested.
        kind: EntityKind,
        /// Reason the request failed.
        reason: SpawnRejection,
    },
}

/// Reasons an NPC spawn request may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnRejection {
    /// The requested kind cannot be spawned on demand.
    NotAnNpc,
    /// No enemy-spawnable tile was found.
    NoSpawnableTile,
    /// The campaign has already been won.
    CampaignOver,
}

/// Allegiance of an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    /// The player's side.
    Good,
    /// The invaders.
    Evil,
    /// Scenery such as boulders and explosions.
    Neutral,
}

impl Faction {
    /// Opposing faction. Neutral maps to itself.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Good => Self::Evil,
            Self::Evil => Self::Good,
            Self::Neutral => Self::Neutral,
        }
    }

    /// Reports whether `other` is this faction's opposite.
    #[must_use]
    pub const fn opposes(self, other: Faction) -> bool {
        matches!(
            (self, other),
            (Self::Good, Self::Evil) | (Self::Evil, Self::Good)
        )
    }
}

/// Closed set of entity variants. The declaration order is the registry order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// The player's tank.
    Player,
    /// Roaming NPC tank.
    NpcTank,
    /// Stationary NPC turret.
    NpcTurret,
    /// Neutral pushable rock that deflects bullets.
    Boulder,
    /// Bullet fired by the good faction.
    GoodBullet,
    /// Bullet fired by the evil faction.
    EvilBullet,
    /// Faction bomb.
    Bomb,
    /// Resource dropped by destroyed NPCs.
    Pickup,
    /// Cosmetic explosion.
    Explosion,
}

impl EntityKind {
    /// Number of entity kinds.
    pub const COUNT: usize = 9;

    /// Every kind in registry order.
    pub const ALL: [EntityKind; Self::COUNT] = [
        Self::Player,
        Self::NpcTank,
        Self::NpcTurret,
        Self::Boulder,
        Self::GoodBullet,
        Self::EvilBullet,
        Self::Bomb,
        Self::Pickup,
        Self::Explosion,
    ];

    /// Position of the kind within [`EntityKind::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Reports whether the kind is a bullet of either faction.
    #[must_use]
    pub const fn is_bullet(self) -> bool {
        matches!(self, Self::GoodBullet | Self::EvilBullet)
    }

    /// Reports whether the kind counts toward level completion.
    #[must_use]
    pub const fn is_combatant(self) -> bool {
        matches!(self, Self::Player | Self::NpcTank | Self::NpcTurret)
    }

    /// Bullet kind fired by the provided faction.
    #[must_use]
    pub const fn bullet_for(faction: Faction) -> Option<EntityKind> {
        match faction {
            Faction::Good => Some(Self::GoodBullet),
            Faction::Evil => Some(Self::EvilBullet),
            Faction::Neutral => None,
        }
    }

    /// Static attributes shared by every entity of this kind.
    #[must_use]
    pub const fn profile(self) -> KindProfile {
        match self {
            Self::Player => KindProfile {
                physics_radius: 0.29,
                cosmetic_radius: 0.4,
                speed_limit: 1.0,
                health: 8,
                capabilities: Capabilities::new(true, true, true, true),
            },
            Self::NpcTank => KindProfile {
                physics_radius: 0.29,
                cosmetic_radius: 0.4,
                speed_limit: 0.8,
                health: 3,
                capabilities: Capabilities::new(true, true, true, true),
            },
            Self::NpcTurret => KindProfile {
                physics_radius: 0.29,
                cosmetic_radius: 0.4,
                speed_limit: 0.0,
                health: 5,
                capabilities: Capabilities::new(true, false, true, true),
            },
            Self::Boulder => KindProfile {
                physics_radius: 0.29,
                cosmetic_radius: 0.29,
                speed_limit: 0.0,
                health: 1,
                capabilities: Capabilities::new(true, true, true, false),
            },
            Self::GoodBullet | Self::EvilBullet => KindProfile {
                physics_radius: 0.05,
                cosmetic_radius: 0.05,
                speed_limit: BULLET_SPEED,
                health: 1,
                capabilities: Capabilities::new(false, false, false, true),
            },
            Self::Bomb => KindProfile {
                physics_radius: 0.3,
                cosmetic_radius: 0.3,
                speed_limit: BULLET_SPEED,
                health: 1,
                capabilities: Capabilities::new(false, false, false, true),
            },
            Self::Pickup => KindProfile {
                physics_radius: 0.3,
                cosmetic_radius: 0.3,
                speed_limit: 0.0,
                health: 1,
                capabilities: Capabilities::new(false, false, true, true),
            },
            Self::Explosion => KindProfile {
                physics_radius: 0.0,
                cosmetic_radius: 0.0,
                speed_limit: 0.0,
                health: 1,
                capabilities: Capabilities::new(false, false, false, false),
            },
        }
    }
}

/// Static attributes of an entity kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KindProfile {
    /// Radius used for collisions.
    pub physics_radius: f32,
    /// Radius used for drawing and muzzle placement.
    pub cosmetic_radius: f32,
    /// Largest speed the kind may reach.
    pub speed_limit: f32,
    /// Starting and maximum health.
    pub health: i32,
    /// Collision capabilities.
    pub capabilities: Capabilities,
}

/// Independent collision capability flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pushes_others: bool,
    pushed_by_others: bool,
    pushed_by_walls: bool,
    damaged_by_bullets: bool,
}

impl Capabilities {
    /// Creates a capability set.
    #[must_use]
    pub const fn new(
        pushes_others: bool,
        pushed_by_others: bool,
        pushed_by_walls: bool,
        damaged_by_bullets: bool,
    ) -> Self {
        Self {
            pushes_others,
            pushed_by_others,
            pushed_by_walls,
            damaged_by_bullets,
        }
    }

    /// Other entities are pushed out of this one.
    #[must_use]
    pub const fn pushes_others(&self) -> bool {
        self.pushes_others
    }

    /// This entity yields to entities that push.
    #[must_use]
    pub const fn pushed_by_others(&self) -> bool {
        self.pushed_by_others
    }

    /// Solid tiles push this entity out.
    #[must_use]
    pub const fn pushed_by_walls(&self) -> bool {
        self.pushed_by_walls
    }

    /// Bullets hurt this entity.
    #[must_use]
    pub const fn damaged_by_bullets(&self) -> bool {
        self.damaged_by_bullets
    }
}

/// Resource carried by a pickup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupKind {
    /// Restores one point of health, capped at the collector's limit.
    Health,
    /// Grants one faction bomb charge.
    FactionBomb,
}

/// Handle to an entity slot. Stale handles never resolve to a later occupant of the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    kind: EntityKind,
    slot: u32,
    generation: u32,
}

impl EntityId {
    /// Creates a handle for the provided slot.
    #[must_use]
    pub const fn new(kind: EntityKind, slot: u32, generation: u32) -> Self {
        Self {
            kind,
            slot,
            generation,
        }
    }

    /// Kind of the referenced entity.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Slot index within the kind's collection.
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Number of times the slot was vacated before this entity claimed it.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Controls applied to the player every tick until replaced.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerIntent {
    /// Fraction of full speed requested, clamped to `0..=1`. Zero holds position.
    pub thrust: f32,
    /// Hull heading the player steers toward while thrusting.
    pub heading_degrees: f32,
    /// Absolute gun heading the turret turns toward, if any.
    pub aim_degrees: Option<f32>,
    /// Fires one bullet on the next update.
    pub fire: bool,
    /// Drops one faction bomb on the next update, if a charge is available.
    pub drop_bomb: bool,
}

/// Position, heading and allegiance of an entity as seen by a steering system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// World position.
    pub position: Vec2,
    /// Heading in degrees.
    pub orientation_degrees: f32,
    /// Collision radius.
    pub physics_radius: f32,
    /// Allegiance.
    pub faction: Faction,
}

/// Outcome of a tile raycast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastResult {
    /// Whether the ray struck a solid tile within range.
    pub impacted: bool,
    /// Point of impact, or the end of the ray on a miss.
    pub impact_position: Vec2,
    /// Distance from the origin to the impact, or the range on a miss.
    pub impact_distance: f32,
    /// Cardinal normal of the struck face, or zero on a miss.
    pub impact_normal: Vec2,
    /// Type of the struck tile. `None` on a miss or when the ray left the grid.
    pub impact_tile: Option<TileType>,
}

impl RaycastResult {
    /// Result describing a ray that travelled its full range unobstructed.
    #[must_use]
    pub fn miss(origin: Vec2, direction: Vec2, max_distance: f32) -> Self {
        Self {
            impacted: false,
            impact_position: origin + direction * max_distance,
            impact_distance: max_distance,
            impact_normal: Vec2::ZERO,
            impact_tile: None,
        }
    }
}

/// Entity spotted by a perception raycast.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sighting {
    /// Entity that was seen.
    pub entity: EntityId,
    /// Allegiance of the entity.
    pub faction: Faction,
    /// Position of the entity.
    pub position: Vec2,
}

impl Sighting {
    /// Reports whether the sighting is a pickup rather than a combatant.
    #[must_use]
    pub fn is_pickup(&self) -> bool {
        self.entity.kind() == EntityKind::Pickup
    }
}

/// Perception queries the world answers on behalf of steering systems.
pub trait Sensor {
    /// Casts a ray against solid tiles.
    fn raycast(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> RaycastResult;

    /// Finds the first visible entity for a viewer of `faction`.
    ///
    /// Candidates are checked in the order player, turrets, tanks, pickups.
    /// Combatants must oppose the viewer; pickups must match the viewer's
    /// faction. A candidate is visible when it lies within `max_distance` and
    /// closer than the first solid tile along the line toward it.
    fn raycast_for_faction(
        &self,
        faction: Faction,
        origin: Vec2,
        max_distance: f32,
    ) -> Option<Sighting>;
}

/// Progress of the campaign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CampaignStatus {
    /// The level with the provided zero-based index is being played.
    InProgress {
        /// Current level.
        level: usize,
    },
    /// Every level has been cleared.
    Won,
}

/// Immutable representation of a single entity's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntitySnapshot {
    /// Identifier of the entity.
    pub id: EntityId,
    /// Allegiance.
    pub faction: Faction,
    /// World position.
    pub position: Vec2,
    /// Velocity in world units per second.
    pub velocity: Vec2,
    /// Hull heading in degrees.
    pub orientation_degrees: f32,
    /// Absolute gun heading in degrees. Equals the hull heading for kinds without a gun.
    pub gun_orientation_degrees: f32,
    /// Collision radius.
    pub physics_radius: f32,
    /// Drawing radius.
    pub cosmetic_radius: f32,
    /// Remaining health.
    pub health: i32,
    /// Health cap.
    pub health_limit: i32,
    /// Faction bomb charges carried.
    pub bomb_charges: u32,
    /// Resource carried, for pickups.
    pub pickup: Option<PickupKind>,
    /// Seconds since the entity spawned.
    pub living_time: f32,
}

/// Read-only snapshot describing the live entities of one kind.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntitySnapshot> {
        self.snapshots
    }
}
