use std::time::Duration;

use incursion_core::{
    CampaignStatus, Command, EntityId, EntityKind, Event, Faction, LevelRecipe, PlayerIntent,
    SpawnRejection, TileType, Vec2, PLAYER_RESPAWNS, PLAYER_SPAWN_POSITION,
};
use incursion_system_level_generation::GenerationError;
use incursion_world::{self as world, query, World, WorldConfig, WorldError};

const FRAME: Duration = Duration::from_nanos(16_666_667);

fn open_level() -> LevelRecipe {
    LevelRecipe {
        width: 30,
        height: 12,
        default_tile: TileType::Grass,
        edge_tile: TileType::Stone,
        start_tile: TileType::Ground,
        end_tile: TileType::Ground,
        worms: Vec::new(),
        turrets: 0,
        tanks: 0,
        boulders: 0,
    }
}

fn world_with(levels: Vec<LevelRecipe>) -> World {
    World::new(WorldConfig {
        seed: 9,
        campaign: levels,
        ..WorldConfig::default()
    })
    .expect("open levels generate")
}

fn tick(world: &mut World) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::Tick { dt: FRAME }, &mut events);
    events
}

#[test]
fn world_starts_with_a_player_at_the_spawn_corner() {
    let world = world_with(vec![open_level()]);
    let player = query::player(&world).expect("player spawned");
    assert_eq!(player.position, PLAYER_SPAWN_POSITION);
    assert_eq!(player.faction, Faction::Good);
    assert_eq!(query::respawns_remaining(&world), PLAYER_RESPAWNS);
    assert_eq!(query::dimensions(&world), (30, 12));
    assert_eq!(query::level_count(&world), 1);
    assert!(query::player_collision(&world));
}

#[test]
fn invalid_campaigns_are_rejected() {
    assert!(matches!(
        World::new(WorldConfig {
            campaign: Vec::new(),
            ..WorldConfig::default()
        }),
        Err(WorldError::EmptyCampaign)
    ));

    let mut tiny = open_level();
    tiny.width = 4;
    assert!(matches!(
        World::new(WorldConfig {
            campaign: vec![open_level(), tiny],
            ..WorldConfig::default()
        }),
        Err(WorldError::Generation {
            level: 1,
            source: GenerationError::GridTooSmall { .. },
        })
    ));
}

#[test]
fn cleared_levels_move_the_player_and_finally_win() {
    let mut world = world_with(vec![open_level(), open_level()]);

    let events = tick(&mut world);
    assert!(events.contains(&Event::LevelCompleted { level: 0 }));
    assert!(events.contains(&Event::LevelStarted { level: 1 }));
    assert_eq!(query::current_level(&world), 1);
    assert_eq!(
        query::campaign_status(&world),
        CampaignStatus::InProgress { level: 1 }
    );
    assert_eq!(query::entities(&world, EntityKind::Player).len(), 1);
    let player = query::player(&world).expect("player moved with the level");
    assert_eq!(player.position, PLAYER_SPAWN_POSITION);

    let events = tick(&mut world);
    assert!(events.contains(&Event::LevelCompleted { level: 1 }));
    assert!(events.contains(&Event::CampaignWon));
    assert_eq!(query::campaign_status(&world), CampaignStatus::Won);

    let before = query::tick_index(&world);
    assert!(tick(&mut world).is_empty());
    assert_eq!(query::tick_index(&world), before);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnNpc {
            kind: EntityKind::NpcTank,
            faction: Faction::Evil,
            at: None,
        },
        &mut events,
    );
    assert_eq!(
        events,
        vec![Event::SpawnRejected {
            kind: EntityKind::NpcTank,
            reason: SpawnRejection::CampaignOver,
        }]
    );
}

#[test]
fn finished_campaigns_refuse_respawns() {
    let mut world = world_with(vec![open_level()]);
    let respawns = query::respawns_remaining(&world);
    assert!(tick(&mut world).contains(&Event::CampaignWon));

    let mut events = Vec::new();
    world::apply(&mut world, Command::SpawnPlayer, &mut events);
    assert_eq!(events, vec![Event::PlayerRespawnDenied]);
    assert_eq!(query::respawns_remaining(&world), respawns);
    assert_eq!(query::entities(&world, EntityKind::Player).len(), 1);
}

#[test]
fn respawns_run_out() {
    let mut world = world_with(vec![open_level()]);
    for expected in (0..PLAYER_RESPAWNS).rev() {
        let mut events = Vec::new();
        world::apply(&mut world, Command::SpawnPlayer, &mut events);
        assert!(events.iter().any(|event| matches!(
            event,
            Event::PlayerSpawned { respawns_remaining, .. } if *respawns_remaining == expected
        )));
    }
    let mut events = Vec::new();
    world::apply(&mut world, Command::SpawnPlayer, &mut events);
    assert_eq!(events, vec![Event::PlayerRespawnDenied]);
    assert_eq!(query::entities(&world, EntityKind::Player).len(), 1);
}

#[test]
fn only_npc_kinds_spawn_on_demand() {
    let mut world = world_with(vec![open_level()]);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnNpc {
            kind: EntityKind::Pickup,
            faction: Faction::Good,
            at: None,
        },
        &mut events,
    );
    assert_eq!(
        events,
        vec![Event::SpawnRejected {
            kind: EntityKind::Pickup,
            reason: SpawnRejection::NotAnNpc,
        }]
    );

    events.clear();
    world::apply(
        &mut world,
        Command::SpawnNpc {
            kind: EntityKind::Boulder,
            faction: Faction::Neutral,
            at: None,
        },
        &mut events,
    );
    let boulders = query::entities(&world, EntityKind::Boulder).into_vec();
    assert_eq!(boulders.len(), 1);
    assert!(!query::tile_grid(&world).is_solid_at(boulders[0].position));
}

#[test]
fn turret_engages_an_approaching_player() {
    let mut world = world_with(vec![open_level()]);
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnNpc {
            kind: EntityKind::NpcTurret,
            faction: Faction::Evil,
            at: Some(Vec2::new(27.5, 1.5)),
        },
        &mut events,
    );
    let turret = query::entities(&world, EntityKind::NpcTurret).into_vec()[0].id;
    world::apply(
        &mut world,
        Command::SetPlayerIntent {
            intent: PlayerIntent {
                thrust: 1.0,
                heading_degrees: 0.0,
                ..PlayerIntent::default()
            },
        },
        &mut events,
    );
    let player = query::player(&world).expect("player").id;

    let mut parked = false;
    let mut shots = Vec::new();
    for index in 0..2400u32 {
        let events = tick(&mut world);
        for event in &events {
            if let Event::ShotFired { shooter, .. } = event {
                if *shooter == turret {
                    shots.push(index);
                }
            }
        }
        assert_death_matches_damage(&events, player);

        if !parked && query::player(&world).is_some_and(|snapshot| snapshot.position.x > 16.0) {
            parked = true;
            world::apply(
                &mut world,
                Command::SetPlayerIntent {
                    intent: PlayerIntent::default(),
                },
                &mut Vec::new(),
            );
        }
    }

    assert!(parked, "player never reached the turret's range");
    assert!(!shots.is_empty(), "turret never fired");
    let cooldown_ticks = 1.3 / FRAME.as_secs_f32() - 1e-3;
    for pair in shots.windows(2) {
        assert!((pair[1] - pair[0]) as f32 >= cooldown_ticks);
    }
    assert_eq!(query::entities(&world, EntityKind::NpcTurret).len(), 1);
}

fn assert_death_matches_damage(events: &[Event], player: EntityId) {
    let lethal = events.iter().any(|event| {
        matches!(event, Event::EntityDamaged { entity, health } if *entity == player && *health <= 0)
    });
    let died = events.contains(&Event::EntityDied { entity: player });
    assert_eq!(lethal, died, "player death must coincide with its lethal hit");
}
