use serde::{Deserialize, Serialize};

use crate::TileType;

/// Describes a family of worms painted across a freshly filled grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WormSpec {
    /// Tile type painted along each worm.
    pub tile: TileType,
    /// Number of worms to carve.
    pub count: u32,
    /// Step budget of each worm, including blocked steps.
    pub length: u32,
}

impl WormSpec {
    /// Creates a new worm specification.
    #[must_use]
    pub const fn new(tile: TileType, count: u32, length: u32) -> Self {
        Self {
            tile,
            count,
            length,
        }
    }
}

/// Everything needed to generate and populate one level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRecipe {
    /// Number of tile columns.
    pub width: u32,
    /// Number of tile rows.
    pub height: u32,
    /// Tile type that fills the interior before carving.
    pub default_tile: TileType,
    /// Tile type of the outer ring and of the open-area chokepoints. Must be solid.
    pub edge_tile: TileType,
    /// Tile type of the open area near the start corner.
    pub start_tile: TileType,
    /// Tile type of the open area near the far corner.
    pub end_tile: TileType,
    /// Worm families carved in order.
    #[serde(default)]
    pub worms: Vec<WormSpec>,
    /// Number of turrets spawned when the level starts.
    #[serde(default)]
    pub turrets: u32,
    /// Number of tanks spawned when the level starts.
    #[serde(default)]
    pub tanks: u32,
    /// Number of boulders spawned when the level starts.
    #[serde(default)]
    pub boulders: u32,
}

impl LevelRecipe {
    /// The three levels of the shipped campaign.
    #[must_use]
    pub fn standard_campaign() -> Vec<LevelRecipe> {
        vec![
            LevelRecipe {
                width: 20,
                height: 30,
                default_tile: TileType::Grass,
                edge_tile: TileType::Stone,
                start_tile: TileType::Ground,
                end_tile: TileType::Ground,
                worms: vec![
                    WormSpec::new(TileType::Stone, 30, 6),
                    WormSpec::new(TileType::Mud, 20, 7),
                ],
                turrets: 5,
                tanks: 5,
                boulders: 30,
            },
            LevelRecipe {
                width: 30,
                height: 20,
                default_tile: TileType::Dirt,
                edge_tile: TileType::Brick,
                start_tile: TileType::Ground,
                end_tile: TileType::Ground,
                worms: vec![
                    WormSpec::new(TileType::Brick, 45, 5),
                    WormSpec::new(TileType::Sand, 20, 7),
                ],
                turrets: 10,
                tanks: 10,
                boulders: 30,
            },
            LevelRecipe {
                width: 30,
                height: 20,
                default_tile: TileType::Quartz,
                edge_tile: TileType::Steel,
                start_tile: TileType::Ground,
                end_tile: TileType::Ground,
                worms: vec![
                    WormSpec::new(TileType::Steel, 65, 5),
                    WormSpec::new(TileType::Water, 30, 7),
                ],
                turrets: 15,
                tanks: 15,
                boulders: 60,
            },
        ]
    }
}
