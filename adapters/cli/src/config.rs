//! Simulation settings read from an optional TOML file.

use std::{path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use incursion_core::LevelRecipe;
use incursion_system_level_generation::GenerationSettings;
use incursion_world::WorldConfig;
use serde::Deserialize;

/// Everything the headless harness needs to run a session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SimulationConfig {
    pub(crate) seed: u64,
    pub(crate) ticks: u32,
    pub(crate) tick_millis: u64,
    pub(crate) player_collision: bool,
    pub(crate) max_generation_attempts: u32,
    pub(crate) player: PlayerScript,
    /// Replaces the built-in campaign when present.
    pub(crate) campaign: Option<Vec<LevelRecipe>>,
}

/// Fixed controls the harness feeds the player.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlayerScript {
    pub(crate) thrust: f32,
    pub(crate) heading_degrees: f32,
    pub(crate) aim_degrees: Option<f32>,
    /// Ticks between shots. Zero never fires.
    pub(crate) fire_every: u32,
    /// Requests a respawn whenever the player is dead.
    pub(crate) respawn: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let world = WorldConfig::default();
        Self {
            seed: world.seed,
            ticks: 3_600,
            tick_millis: 16,
            player_collision: world.player_collision,
            max_generation_attempts: world.generation.max_attempts,
            player: PlayerScript::default(),
            campaign: None,
        }
    }
}

impl Default for PlayerScript {
    fn default() -> Self {
        Self {
            thrust: 0.0,
            heading_degrees: 0.0,
            aim_degrees: None,
            fire_every: 30,
            respawn: true,
        }
    }
}

impl SimulationConfig {
    /// Reads and validates a configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("failed to parse config toml")?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        ensure!(self.tick_millis > 0, "tick_millis must be positive");
        ensure!(
            self.max_generation_attempts > 0,
            "max_generation_attempts must be positive"
        );
        ensure!(
            (0.0..=1.0).contains(&self.player.thrust),
            "player thrust must lie in 0..=1, got {}",
            self.player.thrust
        );
        if let Some(campaign) = &self.campaign {
            ensure!(!campaign.is_empty(), "campaign must list at least one level");
        }
        Ok(())
    }

    pub(crate) fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub(crate) fn world_config(&self) -> WorldConfig {
        WorldConfig {
            seed: self.seed,
            campaign: self
                .campaign
                .clone()
                .unwrap_or_else(LevelRecipe::standard_campaign),
            generation: GenerationSettings {
                max_attempts: self.max_generation_attempts,
            },
            player_collision: self.player_collision,
            ..WorldConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use incursion_core::{TileType, WormSpec};

    #[test]
    fn empty_file_yields_defaults() {
        let config = SimulationConfig::parse("").expect("defaults");
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.world_config().campaign.len(), 3);
    }

    #[test]
    fn custom_campaign_and_player_script_are_read() {
        let config = SimulationConfig::parse(
            r#"
            seed = 7
            ticks = 120
            player_collision = false

            [player]
            thrust = 0.5
            heading_degrees = 45.0
            fire_every = 0

            [[campaign]]
            width = 12
            height = 10
            default_tile = "grass"
            edge_tile = "stone"
            start_tile = "ground"
            end_tile = "ground"
            worms = [{ tile = "mud", count = 3, length = 4 }]
            tanks = 2
            "#,
        )
        .expect("valid config");

        assert_eq!(config.seed, 7);
        assert_eq!(config.ticks, 120);
        assert_eq!(config.player.fire_every, 0);
        assert!(config.player.respawn);

        let world = config.world_config();
        assert!(!world.player_collision);
        assert_eq!(world.campaign.len(), 1);
        let level = &world.campaign[0];
        assert_eq!(level.worms, vec![WormSpec::new(TileType::Mud, 3, 4)]);
        assert_eq!((level.turrets, level.tanks, level.boulders), (0, 2, 0));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(SimulationConfig::parse("tick_millis = 0").is_err());
        assert!(SimulationConfig::parse("campaign = []").is_err());
        assert!(SimulationConfig::parse("[player]\nthrust = 2.0").is_err());
        assert!(SimulationConfig::parse("speed = 3").is_err());
    }
}
