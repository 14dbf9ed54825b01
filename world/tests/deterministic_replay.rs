use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use incursion_core::{Command, EntityId, EntityKind, EntitySnapshot, Faction, PlayerIntent};
use incursion_world::{self as world, query, World, WorldConfig};

const TICKS: u32 = 900;

#[test]
fn identical_seeds_replay_identically() {
    let first = replay(42);
    let second = replay(42);

    assert_eq!(first, second, "replay diverged between runs");
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert!(first.events > TICKS as usize);
}

#[test]
fn different_seeds_generate_different_campaigns() {
    let first = World::new(config(1)).expect("world");
    let second = World::new(config(2)).expect("world");
    assert_ne!(
        query::tile_grid(&first).tiles(),
        query::tile_grid(&second).tiles()
    );
}

fn config(seed: u64) -> WorldConfig {
    WorldConfig {
        seed,
        ..WorldConfig::default()
    }
}

fn replay(seed: u64) -> ReplayOutcome {
    let mut world = World::new(config(seed)).expect("standard campaign generates");
    let mut events = Vec::new();
    let mut hasher = DefaultHasher::new();

    for tick in 0..TICKS {
        if tick % 120 == 0 {
            world::apply(
                &mut world,
                Command::SetPlayerIntent {
                    intent: scripted_intent(tick),
                },
                &mut events,
            );
        }
        world::apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(16),
            },
            &mut events,
        );
        if tick == 300 {
            world::apply(
                &mut world,
                Command::SpawnNpc {
                    kind: EntityKind::NpcTank,
                    faction: Faction::Evil,
                    at: None,
                },
                &mut events,
            );
        }
    }

    format!("{events:?}").hash(&mut hasher);
    let entities = EntityKind::ALL
        .into_iter()
        .flat_map(|kind| query::entities(&world, kind).into_vec())
        .map(EntityState::from)
        .collect();

    ReplayOutcome {
        entities,
        events: events.len(),
        event_digest: hasher.finish(),
        level: query::current_level(&world),
    }
}

fn scripted_intent(tick: u32) -> PlayerIntent {
    let heading = (tick / 120) as f32 * 67.0;
    PlayerIntent {
        thrust: 1.0,
        heading_degrees: heading,
        aim_degrees: Some(heading + 30.0),
        fire: true,
        drop_bomb: false,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ReplayOutcome {
    entities: Vec<EntityState>,
    events: usize,
    event_digest: u64,
    level: usize,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct EntityState {
    id: EntityId,
    faction: Faction,
    position: (u32, u32),
    orientation: u32,
    health: i32,
}

impl From<EntitySnapshot> for EntityState {
    fn from(snapshot: EntitySnapshot) -> Self {
        Self {
            id: snapshot.id,
            faction: snapshot.faction,
            position: (snapshot.position.x.to_bits(), snapshot.position.y.to_bits()),
            orientation: snapshot.orientation_degrees.to_bits(),
            health: snapshot.health,
        }
    }
}
