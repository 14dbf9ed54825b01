use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Terrain variants a tile may carry.
///
/// The declaration order is the index order of [`TileDefinitions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    /// Open meadow.
    Grass,
    /// Solid rock.
    Stone,
    /// Slow, open ground.
    Mud,
    /// Plain ground used for corner open areas.
    Ground,
    /// Level exit marker.
    Exit,
    /// Slow, open sand.
    Sand,
    /// Open dirt.
    Dirt,
    /// Solid masonry.
    Brick,
    /// Slow, shallow water.
    Water,
    /// Solid plating.
    Steel,
    /// Open crystalline floor.
    Quartz,
}

impl TileType {
    /// Number of declared tile types.
    pub const COUNT: usize = 11;

    /// Every tile type in declaration order.
    pub const ALL: [TileType; Self::COUNT] = [
        Self::Grass,
        Self::Stone,
        Self::Mud,
        Self::Ground,
        Self::Exit,
        Self::Sand,
        Self::Dirt,
        Self::Brick,
        Self::Water,
        Self::Steel,
        Self::Quartz,
    ];

    /// Position of the tile type within [`TileType::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Static properties attached to a tile type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    tile: TileType,
    solid: bool,
    speed_factor: f32,
    enemy_spawnable: bool,
}

impl TileDefinition {
    /// Creates a definition for the provided tile type.
    #[must_use]
    pub const fn new(tile: TileType, solid: bool, speed_factor: f32, enemy_spawnable: bool) -> Self {
        Self {
            tile,
            solid,
            speed_factor,
            enemy_spawnable,
        }
    }

    /// Tile type described by this definition.
    #[must_use]
    pub const fn tile(&self) -> TileType {
        self.tile
    }

    /// Reports whether the tile blocks movement and rays.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        self.solid
    }

    /// Multiplier applied to the simulated time of walkers standing on the tile.
    #[must_use]
    pub const fn speed_factor(&self) -> f32 {
        self.speed_factor
    }

    /// Reports whether random NPC spawn points may land on the tile.
    #[must_use]
    pub const fn is_enemy_spawnable(&self) -> bool {
        self.enemy_spawnable
    }
}

const STANDARD_DEFINITIONS: [TileDefinition; TileType::COUNT] = [
    TileDefinition::new(TileType::Grass, false, 1.0, true),
    TileDefinition::new(TileType::Stone, true, 0.0, false),
    TileDefinition::new(TileType::Mud, false, 0.5, true),
    TileDefinition::new(TileType::Ground, false, 1.0, false),
    TileDefinition::new(TileType::Exit, false, 1.0, false),
    TileDefinition::new(TileType::Sand, false, 0.5, true),
    TileDefinition::new(TileType::Dirt, false, 1.0, true),
    TileDefinition::new(TileType::Brick, true, 0.0, false),
    TileDefinition::new(TileType::Water, false, 0.5, true),
    TileDefinition::new(TileType::Steel, true, 0.0, false),
    TileDefinition::new(TileType::Quartz, false, 1.0, true),
];

/// Failures raised while assembling the tile definition table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// The table does not hold exactly one entry per declared tile type.
    #[error("tile definition table holds {actual} entries but {expected} tile types are declared")]
    LengthMismatch {
        /// Number of declared tile types.
        expected: usize,
        /// Number of entries supplied.
        actual: usize,
    },
    /// An entry sits at the index of a different tile type.
    #[error("tile definition {index} describes {found:?} but {expected:?} was expected")]
    OutOfOrder {
        /// Index of the offending entry.
        index: usize,
        /// Tile type that owns the index.
        expected: TileType,
        /// Tile type the entry describes.
        found: TileType,
    },
}

/// Validated table mapping every tile type to its definition.
#[derive(Clone, Debug, PartialEq)]
pub struct TileDefinitions {
    entries: Vec<TileDefinition>,
}

impl TileDefinitions {
    /// Builds a table, rejecting it unless it holds one entry per tile type in declaration order.
    pub fn new(entries: Vec<TileDefinition>) -> Result<Self, DefinitionError> {
        if entries.len() != TileType::COUNT {
            return Err(DefinitionError::LengthMismatch {
                expected: TileType::COUNT,
                actual: entries.len(),
            });
        }

        for (index, (entry, expected)) in entries.iter().zip(TileType::ALL).enumerate() {
            if entry.tile() != expected {
                return Err(DefinitionError::OutOfOrder {
                    index,
                    expected,
                    found: entry.tile(),
                });
            }
        }

        Ok(Self { entries })
    }

    /// Builds the table used by the shipped campaign.
    pub fn standard() -> Result<Self, DefinitionError> {
        Self::new(STANDARD_DEFINITIONS.to_vec())
    }

    /// Definition registered for the provided tile type.
    #[must_use]
    pub fn get(&self, tile: TileType) -> &TileDefinition {
        &self.entries[tile.index()]
    }

    /// Iterator over the definitions in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &TileDefinition> {
        self.entries.iter()
    }
}

/// Integer coordinate of a tile. Tile `(x, y)` covers `[x, x + 1] × [y, y + 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: i32,
    y: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing the provided world position.
    #[must_use]
    pub fn containing(position: Vec2) -> Self {
        Self {
            x: position.x.floor() as i32,
            y: position.y.floor() as i32,
        }
    }

    /// Column of the tile.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Row of the tile.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Coordinate displaced by the provided offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// World-space centre of the tile.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    /// Axis-aligned bounds covered by the tile.
    #[must_use]
    pub fn bounds(&self) -> TileBounds {
        let min = Vec2::new(self.x as f32, self.y as f32);
        TileBounds::new(min, min + Vec2::ONE)
    }
}

/// Axis-aligned rectangle in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileBounds {
    min: Vec2,
    max: Vec2,
}

impl TileBounds {
    /// Creates bounds from the provided corners.
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Lower-left corner.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Upper-right corner.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }

    /// Point inside the bounds closest to `point`.
    #[must_use]
    pub fn nearest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Reports whether the point lies inside or on the bounds.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

/// Rectangular grid of typed tiles together with the definitions that describe them.
#[derive(Clone, Debug, PartialEq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tiles: Vec<TileType>,
    definitions: TileDefinitions,
}

impl TileGrid {
    /// Creates a grid with every tile set to `tile`.
    #[must_use]
    pub fn filled(width: u32, height: u32, tile: TileType, definitions: TileDefinitions) -> Self {
        let capacity = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            tiles: vec![tile; capacity],
            definitions,
        }
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Grid extent in world units.
    #[must_use]
    pub fn extent(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Definitions backing the grid's tile types.
    #[must_use]
    pub const fn definitions(&self) -> &TileDefinitions {
        &self.definitions
    }

    /// Tile types in row-major order.
    #[must_use]
    pub fn tiles(&self) -> &[TileType] {
        &self.tiles
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub fn contains(&self, coord: TileCoord) -> bool {
        self.index(coord).is_some()
    }

    /// Row-major index of the coordinate, or `None` when it lies outside the grid.
    #[must_use]
    pub fn index(&self, coord: TileCoord) -> Option<usize> {
        let x = u32::try_from(coord.x()).ok()?;
        let y = u32::try_from(coord.y()).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        Some(usize::try_from(y).ok()? * width + usize::try_from(x).ok()?)
    }

    /// Coordinate stored at the provided row-major index.
    #[must_use]
    pub fn coord(&self, index: usize) -> Option<TileCoord> {
        if index >= self.tiles.len() {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let x = i32::try_from(index % width).ok()?;
        let y = i32::try_from(index / width).ok()?;
        Some(TileCoord::new(x, y))
    }

    /// Tile type at the coordinate.
    #[must_use]
    pub fn tile(&self, coord: TileCoord) -> Option<TileType> {
        self.index(coord)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Tile type under the world position.
    #[must_use]
    pub fn tile_at(&self, position: Vec2) -> Option<TileType> {
        self.tile(TileCoord::containing(position))
    }

    /// Overwrites the tile at `coord`, returning `false` when it lies outside the grid.
    pub fn set(&mut self, coord: TileCoord, tile: TileType) -> bool {
        match self.index(coord).and_then(|index| self.tiles.get_mut(index)) {
            Some(slot) => {
                *slot = tile;
                true
            }
            None => false,
        }
    }

    /// Reports whether the tile blocks movement. Coordinates outside the grid are solid.
    #[must_use]
    pub fn is_solid(&self, coord: TileCoord) -> bool {
        self.tile(coord)
            .map_or(true, |tile| self.definitions.get(tile).is_solid())
    }

    /// Reports whether the world position lies in a solid tile.
    #[must_use]
    pub fn is_solid_at(&self, position: Vec2) -> bool {
        self.is_solid(TileCoord::containing(position))
    }

    /// Speed multiplier of the tile under the position. Positions off the grid keep full speed.
    #[must_use]
    pub fn speed_factor_at(&self, position: Vec2) -> f32 {
        self.tile_at(position)
            .map_or(1.0, |tile| self.definitions.get(tile).speed_factor())
    }

    /// Reports whether random NPC spawns may use the tile under the position.
    #[must_use]
    pub fn is_enemy_spawnable_at(&self, position: Vec2) -> bool {
        self.tile_at(position)
            .is_some_and(|tile| self.definitions.get(tile).is_enemy_spawnable())
    }

    /// Reports whether the coordinate lies on the outer ring.
    #[must_use]
    pub fn is_edge(&self, coord: TileCoord) -> bool {
        if !self.contains(coord) {
            return false;
        }
        let last_x = i64::from(self.width) - 1;
        let last_y = i64::from(self.height) - 1;
        let x = i64::from(coord.x());
        let y = i64::from(coord.y());
        x == 0 || y == 0 || x == last_x || y == last_y
    }

    /// Iterator over every tile and its coordinate in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (TileCoord, TileType)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .filter_map(|(index, tile)| self.coord(index).map(|coord| (coord, *tile)))
    }
}
