#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line harness that runs an Incursion session.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use incursion_core::{CampaignStatus, Command, EntityKind, Event, PlayerIntent};
use incursion_world::{self as world, query, World};
use tracing_subscriber::EnvFilter;

use crate::config::{PlayerScript, SimulationConfig};

/// Runs the Incursion simulation without a renderer and prints a summary.
#[derive(Debug, Parser)]
#[command(name = "incursion", version, about)]
struct Args {
    /// TOML file with simulation settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed of the session random stream.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of ticks to simulate.
    #[arg(long)]
    ticks: Option<u32>,
    /// Simulated milliseconds per tick.
    #[arg(long)]
    tick_millis: Option<u64>,
    /// Lets the player pass through entities and bullets.
    #[arg(long)]
    no_player_collision: bool,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn apply_overrides(&self, config: &mut SimulationConfig) {
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(ticks) = self.ticks {
            config.ticks = ticks;
        }
        if let Some(tick_millis) = self.tick_millis {
            config.tick_millis = tick_millis;
        }
        if self.no_player_collision {
            config.player_collision = false;
        }
    }
}

/// Tallies of the events a session produced.
#[derive(Debug, Default)]
struct Summary {
    ticks: u64,
    shots: u64,
    deaths: u64,
    conversions: u64,
    pickups: u64,
    deflections: u64,
    levels_completed: u64,
    respawns: u64,
    rejected_spawns: u64,
}

impl Summary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TimeAdvanced { .. } => self.ticks += 1,
                Event::ShotFired { .. } => self.shots += 1,
                Event::EntityDied { .. } => self.deaths += 1,
                Event::FactionSwitched { .. } => self.conversions += 1,
                Event::PickupCollected { .. } => self.pickups += 1,
                Event::BulletDeflected { .. } => self.deflections += 1,
                Event::LevelCompleted { .. } => self.levels_completed += 1,
                Event::PlayerSpawned { .. } => self.respawns += 1,
                Event::SpawnRejected { .. } => self.rejected_spawns += 1,
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    args.apply_overrides(&mut config);
    config.validate().context("invalid settings after applying flags")?;

    tracing::info!(
        seed = config.seed,
        ticks = config.ticks,
        tick_millis = config.tick_millis,
        "starting headless session"
    );
    let mut world = World::new(config.world_config()).context("failed to build world")?;
    let summary = run(&mut world, &config);
    print_summary(&world, &summary);
    Ok(())
}

fn init_tracing(fallback: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(fallback)
            .with_context(|| format!("invalid log level {fallback:?}"))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn run(world: &mut World, config: &SimulationConfig) -> Summary {
    let mut summary = Summary::default();
    let mut events = Vec::new();
    let dt = config.tick_duration();

    for tick in 0..config.ticks {
        events.clear();
        if query::player(world).is_none() && config.player.respawn {
            world::apply(world, Command::SpawnPlayer, &mut events);
        }
        world::apply(
            world,
            Command::SetPlayerIntent {
                intent: scripted_intent(&config.player, tick),
            },
            &mut events,
        );
        world::apply(world, Command::Tick { dt }, &mut events);
        summary.record(&events);

        if query::campaign_status(world) == CampaignStatus::Won {
            break;
        }
    }
    summary
}

fn scripted_intent(script: &PlayerScript, tick: u32) -> PlayerIntent {
    PlayerIntent {
        thrust: script.thrust,
        heading_degrees: script.heading_degrees,
        aim_degrees: script.aim_degrees,
        fire: script.fire_every > 0 && tick % script.fire_every == 0,
        drop_bomb: false,
    }
}

fn print_summary(world: &World, summary: &Summary) {
    let status = match query::campaign_status(world) {
        CampaignStatus::InProgress { level } => {
            format!("level {} of {}", level + 1, query::level_count(world))
        }
        CampaignStatus::Won => "campaign won".to_owned(),
    };
    println!("status: {status}");
    println!("ticks simulated: {}", summary.ticks);
    println!(
        "levels completed: {}, respawns used: {}, respawns left: {}",
        summary.levels_completed,
        summary.respawns,
        query::respawns_remaining(world)
    );
    println!(
        "shots: {}, deaths: {}, conversions: {}, pickups: {}, deflections: {}",
        summary.shots, summary.deaths, summary.conversions, summary.pickups, summary.deflections
    );
    if summary.rejected_spawns > 0 {
        println!("rejected spawns: {}", summary.rejected_spawns);
    }
    for kind in [EntityKind::NpcTank, EntityKind::NpcTurret, EntityKind::Boulder] {
        println!("live {kind:?}: {}", query::entities(world, kind).len());
    }
    match query::player(world) {
        Some(player) => println!(
            "player: health {}/{}, bombs {}, at ({:.2}, {:.2})",
            player.health,
            player.health_limit,
            player.bomb_charges,
            player.position.x,
            player.position.y
        ),
        None => println!("player: dead"),
    }
}
