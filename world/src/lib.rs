#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Incursion.
//!
//! The world generates every map of the campaign up front, owns the session
//! random stream and drives the steering systems. Adapters mutate it
//! exclusively through [`apply`] and observe it through the [`query`] module
//! and the [`Event`] values each command produces.

use std::time::Duration;

use incursion_core::{
    CampaignStatus, Command, DefinitionError, EntityKind, Event, Faction, LevelRecipe,
    PlayerIntent, SpawnRejection, TileDefinitions, Vec2, PLAYER_RESPAWNS, PLAYER_SPAWN_POSITION,
};
use incursion_system_level_generation::{GenerationError, GenerationSettings, LevelGenerator};
use incursion_system_tank_ai::{TankAi, TankTuning};
use incursion_system_turret_ai::{TurretAi, TurretTuning};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

mod collision;
mod entity;
mod map;
mod perception;
mod registry;

use map::{Map, TickContext};

const DEFAULT_SEED: u64 = 0x5eed_1ac7_9b3d_2e41;

/// Parameters used to build a [`World`].
#[derive(Clone, Debug, PartialEq)]
pub struct WorldConfig {
    /// Seed of the session random stream.
    pub seed: u64,
    /// Levels played in order.
    pub campaign: Vec<LevelRecipe>,
    /// Limits applied while generating each level.
    pub generation: GenerationSettings,
    /// Whether the player takes part in entity, bullet and bomb contacts.
    pub player_collision: bool,
    /// Tank steering constants.
    pub tank: TankTuning,
    /// Turret steering constants.
    pub turret: TurretTuning,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            campaign: LevelRecipe::standard_campaign(),
            generation: GenerationSettings::default(),
            player_collision: true,
            tank: TankTuning::default(),
            turret: TurretTuning::default(),
        }
    }
}

/// Failures raised while building a world.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The configuration lists no levels.
    #[error("the campaign holds no levels")]
    EmptyCampaign,
    /// A level could not be generated.
    #[error("level {level} could not be generated")]
    Generation {
        /// Zero-based index of the failing level.
        level: usize,
        /// Generator failure.
        #[source]
        source: GenerationError,
    },
    /// The first level could not be populated.
    #[error("level {level} has no enemy-spawnable tile for its {kind:?} population")]
    NoSpawnableTile {
        /// Zero-based index of the failing level.
        level: usize,
        /// Kind that could not be placed.
        kind: EntityKind,
    },
    /// The built-in tile definition table is malformed.
    #[error("tile definitions are malformed")]
    Definitions(#[from] DefinitionError),
}

/// Represents the authoritative Incursion world state.
#[derive(Debug)]
pub struct World {
    campaign: Vec<LevelRecipe>,
    maps: Vec<Map>,
    current: usize,
    status: CampaignStatus,
    rng: ChaCha8Rng,
    tank_ai: TankAi,
    turret_ai: TurretAi,
    player_collision: bool,
    respawns_remaining: u32,
    tick_index: u64,
}

impl World {
    /// Generates every level of the campaign, starts the first one and spawns the player.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        if config.campaign.is_empty() {
            return Err(WorldError::EmptyCampaign);
        }

        let definitions = TileDefinitions::standard()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut generator = LevelGenerator::new(config.generation);
        let mut maps = Vec::with_capacity(config.campaign.len());
        for (level, recipe) in config.campaign.iter().enumerate() {
            let grid = generator
                .generate(recipe, &definitions, &mut rng)
                .map_err(|source| WorldError::Generation { level, source })?;
            maps.push(Map::new(grid));
        }

        let mut world = Self {
            campaign: config.campaign,
            maps,
            current: 0,
            status: CampaignStatus::InProgress { level: 0 },
            rng,
            tank_ai: TankAi::new(config.tank),
            turret_ai: TurretAi::new(config.turret),
            player_collision: config.player_collision,
            respawns_remaining: PLAYER_RESPAWNS,
            tick_index: 0,
        };

        let mut discarded = Vec::new();
        world
            .start_current_level(&mut discarded)
            .map_err(|(kind, _)| WorldError::NoSpawnableTile { level: 0, kind })?;
        let _ = world.maps[0].spawn_player(Faction::Good, PLAYER_SPAWN_POSITION, &mut discarded);

        tracing::info!(
            seed = config.seed,
            levels = world.maps.len(),
            "world created"
        );
        Ok(world)
    }

    fn current_map(&self) -> &Map {
        &self.maps[self.current]
    }

    /// Splits the current map from the session state it advances with.
    fn split<'a>(&'a mut self, events: &'a mut Vec<Event>) -> (&'a mut Map, TickContext<'a>) {
        let map = &mut self.maps[self.current];
        let ctx = TickContext {
            rng: &mut self.rng,
            events,
            tank_ai: &self.tank_ai,
            turret_ai: &self.turret_ai,
            player_collision: self.player_collision,
        };
        (map, ctx)
    }

    fn start_current_level(
        &mut self,
        out_events: &mut Vec<Event>,
    ) -> Result<(), (EntityKind, SpawnRejection)> {
        let recipe = self.campaign[self.current].clone();
        let (map, mut ctx) = self.split(out_events);
        map.start_up(&recipe, &mut ctx)
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.status == CampaignStatus::Won {
            return;
        }
        self.tick_index += 1;
        out_events.push(Event::TimeAdvanced { dt });

        let map = &mut self.maps[self.current];
        let _ = map.prune_dead();
        if map.is_level_completed() {
            self.advance_level(out_events);
            return;
        }

        let seconds = dt.as_secs_f32();
        let (map, mut ctx) = self.split(out_events);
        map.run_stages(seconds, &mut ctx);
    }

    fn advance_level(&mut self, out_events: &mut Vec<Event>) {
        let level = self.current;
        out_events.push(Event::LevelCompleted { level });
        if level + 1 >= self.maps.len() {
            self.status = CampaignStatus::Won;
            out_events.push(Event::CampaignWon);
            tracing::info!(level, "campaign won");
            return;
        }

        let player = self.maps[level].take_player();
        self.current = level + 1;
        self.status = CampaignStatus::InProgress {
            level: self.current,
        };
        if let Err((kind, reason)) = self.start_current_level(out_events) {
            tracing::warn!(level = self.current, ?kind, ?reason, "level start-up incomplete");
            out_events.push(Event::SpawnRejected { kind, reason });
        }
        if let Some(player) = player {
            let _ = self.maps[self.current].receive_player(player, PLAYER_SPAWN_POSITION, out_events);
        }
        out_events.push(Event::LevelStarted {
            level: self.current,
        });
        tracing::info!(level = self.current, "level started");
    }

    fn set_player_intent(&mut self, intent: PlayerIntent) {
        if let Some(state) = self.maps[self.current].player_mut() {
            state.intent = intent;
        }
    }

    fn respawn_player(&mut self, out_events: &mut Vec<Event>) {
        if self.status == CampaignStatus::Won || self.respawns_remaining == 0 {
            out_events.push(Event::PlayerRespawnDenied);
            return;
        }
        self.respawns_remaining -= 1;
        let player =
            self.maps[self.current].spawn_player(Faction::Good, PLAYER_SPAWN_POSITION, out_events);
        out_events.push(Event::PlayerSpawned {
            player,
            respawns_remaining: self.respawns_remaining,
        });
        tracing::info!(respawns_remaining = self.respawns_remaining, "player respawned");
    }

    fn spawn_npc(
        &mut self,
        kind: EntityKind,
        faction: Faction,
        at: Option<Vec2>,
        out_events: &mut Vec<Event>,
    ) {
        if self.status == CampaignStatus::Won {
            out_events.push(Event::SpawnRejected {
                kind,
                reason: SpawnRejection::CampaignOver,
            });
            return;
        }
        let (map, mut ctx) = self.split(out_events);
        if let Err(reason) = map.spawn_npc(kind, faction, at, &mut ctx) {
            tracing::warn!(?kind, ?reason, "npc spawn rejected");
            ctx.events.push(Event::SpawnRejected { kind, reason });
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::SetPlayerIntent { intent } => world.set_player_intent(intent),
        Command::SpawnPlayer => world.respawn_player(out_events),
        Command::SpawnNpc { kind, faction, at } => world.spawn_npc(kind, faction, at, out_events),
        Command::SetPlayerCollision { enabled } => world.player_collision = enabled,
    }
}

/// Query functions that provide read-only access to the world state.
///
/// Entity queries only report live entities of the current level.
pub mod query {
    use incursion_core::{
        CampaignStatus, EntityKind, EntitySnapshot, EntityView, TileDefinitions, TileGrid, Vec2,
    };

    use super::World;

    /// Captures the live entities of one kind on the current level.
    #[must_use]
    pub fn entities(world: &World, kind: EntityKind) -> EntityView {
        world.current_map().view(kind)
    }

    /// Captures the player, if one is alive on the current level.
    #[must_use]
    pub fn player(world: &World) -> Option<EntitySnapshot> {
        world.current_map().live_player().map(|player| player.snapshot())
    }

    /// Provides read-only access to the current level's tiles.
    #[must_use]
    pub fn tile_grid(world: &World) -> &TileGrid {
        &world.current_map().grid
    }

    /// Width and height of the current level in tiles.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        let grid = &world.current_map().grid;
        (grid.width(), grid.height())
    }

    /// Tile definition table shared by every level.
    #[must_use]
    pub fn tile_definitions(world: &World) -> &TileDefinitions {
        world.current_map().grid.definitions()
    }

    /// Zero-based index of the level being played.
    #[must_use]
    pub fn current_level(world: &World) -> usize {
        world.current
    }

    /// Number of levels in the campaign.
    #[must_use]
    pub fn level_count(world: &World) -> usize {
        world.maps.len()
    }

    /// Progress of the campaign.
    #[must_use]
    pub fn campaign_status(world: &World) -> CampaignStatus {
        world.status
    }

    /// Respawns the player may still request.
    #[must_use]
    pub fn respawns_remaining(world: &World) -> u32 {
        world.respawns_remaining
    }

    /// Whether the player currently takes part in contacts.
    #[must_use]
    pub fn player_collision(world: &World) -> bool {
        world.player_collision
    }

    /// Reports whether every live combatant on the current level sides with the player.
    #[must_use]
    pub fn is_level_completed(world: &World) -> bool {
        world.current_map().is_level_completed()
    }

    /// Reports whether no solid tile of the current level blocks the segment.
    #[must_use]
    pub fn line_of_sight(world: &World, from: Vec2, to: Vec2, max_distance: f32) -> bool {
        incursion_system_raycast::has_line_of_sight(
            &world.current_map().grid,
            from,
            to,
            max_distance,
        )
    }

    /// Number of ticks that advanced the simulation.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
