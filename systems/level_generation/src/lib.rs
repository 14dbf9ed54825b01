#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural level generation with reachability validation.
//!
//! A layout is carved by filling the grid with the recipe's default tile,
//! ringing it with the edge tile, painting random worms and stamping the two
//! corner open areas. The layout is then flood filled from the start corner;
//! layouts whose far corner is unreachable are thrown away and carved again.
//! Accepted layouts have their unreachable pockets sealed with solid terrain.

use incursion_core::{LevelRecipe, TileCoord, TileDefinitions, TileGrid, TileType, WormSpec};
use rand::Rng;

/// Smallest width or height that fits both corner open areas inside the edge ring.
pub const MIN_DIMENSION: u32 = 7;

/// Side length of the square open area stamped into each corner.
const OPEN_AREA_SPAN: i32 = 5;

/// Chokepoint row and column inside each open area.
const OPEN_AREA_CHOKEPOINT: i32 = 4;

/// Tuning knobs for the generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Number of layouts carved before giving up.
    pub max_attempts: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10_000,
        }
    }
}

/// Failures surfaced by the generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The recipe's grid cannot hold both open areas.
    #[error("a {width}x{height} grid cannot hold both open areas; each side needs at least {} tiles", MIN_DIMENSION)]
    GridTooSmall {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The recipe's edge tile does not block movement.
    #[error("edge tile {tile:?} is not solid")]
    EdgeNotSolid {
        /// Offending tile type.
        tile: TileType,
    },
    /// No connected layout was found within the attempt budget.
    #[error("no connected layout found after {attempts} attempts")]
    AttemptsExhausted {
        /// Number of layouts carved and rejected.
        attempts: u32,
    },
}

/// Outcome of a connectivity check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    /// The far corner is reachable. Unreachable pockets were sealed.
    Connected {
        /// Interior tiles overwritten while sealing pockets.
        sealed: usize,
    },
    /// The far corner cannot be reached from the start corner.
    Disconnected,
}

/// Level generator that reuses its flood-fill scratch buffers between attempts.
#[derive(Debug, Default)]
pub struct LevelGenerator {
    settings: GenerationSettings,
    reachable: Vec<bool>,
    resolved: Vec<bool>,
}

impl LevelGenerator {
    /// Creates a generator with the provided settings.
    #[must_use]
    pub fn new(settings: GenerationSettings) -> Self {
        Self {
            settings,
            reachable: Vec::new(),
            resolved: Vec::new(),
        }
    }

    /// Settings the generator was built with.
    #[must_use]
    pub const fn settings(&self) -> GenerationSettings {
        self.settings
    }

    /// Carves layouts until one connects both corners.
    pub fn generate<R: Rng + ?Sized>(
        &mut self,
        recipe: &LevelRecipe,
        definitions: &TileDefinitions,
        rng: &mut R,
    ) -> Result<TileGrid, GenerationError> {
        validate_recipe(recipe, definitions)?;

        for attempt in 1..=self.settings.max_attempts {
            let mut grid = carve(recipe, definitions, rng);
            match self.seal_unreachable(&mut grid, recipe.edge_tile) {
                Connectivity::Connected { sealed } => {
                    tracing::debug!(attempt, sealed, "accepted generated layout");
                    return Ok(grid);
                }
                Connectivity::Disconnected => {
                    tracing::debug!(attempt, "rejected disconnected layout");
                }
            }
        }

        Err(GenerationError::AttemptsExhausted {
            attempts: self.settings.max_attempts,
        })
    }

    /// Checks that the far interior corner is reachable from the near one.
    ///
    /// Reachability spreads from tile `(1, 1)` across non-solid interior tiles
    /// by sweeping the grid until a fixed point. When tile
    /// `(width - 2, height - 2)` is reached, every interior tile the sweep
    /// never touched is overwritten with a solid neighbour's type, falling back
    /// to `seal` when a neighbour is not solid. The grid is untouched when the
    /// corners are disconnected.
    pub fn seal_unreachable(&mut self, grid: &mut TileGrid, seal: TileType) -> Connectivity {
        let tile_count = grid.tiles().len();
        self.reachable.clear();
        self.reachable.resize(tile_count, false);
        self.resolved.clear();
        self.resolved.resize(tile_count, false);

        for (index, tile) in grid.tiles().iter().enumerate() {
            self.resolved[index] = grid.definitions().get(*tile).is_solid();
        }

        let interior = interior_coords(grid);
        let Some(start) = grid.index(TileCoord::new(1, 1)) else {
            return Connectivity::Disconnected;
        };
        let Some(target) = far_corner(grid).and_then(|coord| grid.index(coord)) else {
            return Connectivity::Disconnected;
        };
        self.reachable[start] = true;

        let mut changed = true;
        while changed {
            changed = false;
            for coord in &interior {
                let Some(index) = grid.index(*coord) else {
                    continue;
                };
                if self.resolved[index] || !self.reachable[index] {
                    continue;
                }
                for neighbor in neighbors(*coord) {
                    if let Some(next) = grid.index(neighbor) {
                        if !self.resolved[next] {
                            self.reachable[next] = true;
                        }
                    }
                }
                self.resolved[index] = true;
                changed = true;
            }
        }

        if !self.reachable[target] {
            return Connectivity::Disconnected;
        }

        let sealed = self.seal_pockets(grid, &interior, seal);
        Connectivity::Connected { sealed }
    }

    fn seal_pockets(&mut self, grid: &mut TileGrid, interior: &[TileCoord], seal: TileType) -> usize {
        let mut sealed = 0;
        let mut changed = true;
        while changed {
            changed = false;
            for coord in interior {
                let Some(index) = grid.index(*coord) else {
                    continue;
                };
                if self.resolved[index] {
                    continue;
                }
                let donor = neighbors(*coord).into_iter().find_map(|neighbor| {
                    let donor_index = grid.index(neighbor)?;
                    if self.resolved[donor_index] {
                        grid.tile(neighbor)
                    } else {
                        None
                    }
                });
                let Some(donor) = donor else {
                    continue;
                };

                let replacement = if grid.definitions().get(donor).is_solid() {
                    donor
                } else {
                    seal
                };
                if grid.set(*coord, replacement) {
                    sealed += 1;
                }
                self.resolved[index] = true;
                changed = true;
            }
        }
        sealed
    }
}

/// Rejects recipes the generator cannot satisfy.
pub fn validate_recipe(
    recipe: &LevelRecipe,
    definitions: &TileDefinitions,
) -> Result<(), GenerationError> {
    if recipe.width < MIN_DIMENSION || recipe.height < MIN_DIMENSION {
        return Err(GenerationError::GridTooSmall {
            width: recipe.width,
            height: recipe.height,
        });
    }
    if !definitions.get(recipe.edge_tile).is_solid() {
        return Err(GenerationError::EdgeNotSolid {
            tile: recipe.edge_tile,
        });
    }
    Ok(())
}

/// Carves a single candidate layout without validating it.
#[must_use]
pub fn carve<R: Rng + ?Sized>(
    recipe: &LevelRecipe,
    definitions: &TileDefinitions,
    rng: &mut R,
) -> TileGrid {
    let mut grid = TileGrid::filled(
        recipe.width,
        recipe.height,
        recipe.default_tile,
        definitions.clone(),
    );
    paint_edge_ring(&mut grid, recipe.edge_tile);
    for worm in &recipe.worms {
        for _ in 0..worm.count {
            carve_worm(&mut grid, worm, rng);
        }
    }
    stamp_open_areas(&mut grid, recipe);
    grid
}

fn paint_edge_ring(grid: &mut TileGrid, edge: TileType) {
    let coords: Vec<TileCoord> = grid
        .iter()
        .map(|(coord, _)| coord)
        .filter(|coord| grid.is_edge(*coord))
        .collect();
    for coord in coords {
        let _ = grid.set(coord, edge);
    }
}

/// Paints one worm: a random walk from a random interior tile.
///
/// Every step paints the current tile and then picks a random neighbour.
/// Neighbours on the edge ring are re-drawn, each re-draw consuming one step.
pub fn carve_worm<R: Rng + ?Sized>(grid: &mut TileGrid, worm: &WormSpec, rng: &mut R) {
    let (Some(last_x), Some(last_y)) = (last_interior(grid.width()), last_interior(grid.height()))
    else {
        return;
    };
    let mut current = TileCoord::new(rng.gen_range(1..=last_x), rng.gen_range(1..=last_y));

    let mut step = 0;
    while step < worm.length {
        let _ = grid.set(current, worm.tile);
        let mut next = random_neighbor(current, rng);
        while step < worm.length && !is_interior(grid, next) {
            step += 1;
            next = random_neighbor(current, rng);
        }
        if is_interior(grid, next) {
            current = next;
        }
        step += 1;
    }
}

fn stamp_open_areas(grid: &mut TileGrid, recipe: &LevelRecipe) {
    let (Ok(width), Ok(height)) = (i32::try_from(grid.width()), i32::try_from(grid.height()))
    else {
        return;
    };
    for x in 1..=OPEN_AREA_SPAN {
        for y in 1..=OPEN_AREA_SPAN {
            let near = TileCoord::new(x, y);
            let far = TileCoord::new(width - 1 - x, height - 1 - y);
            let chokepoint = (x == OPEN_AREA_CHOKEPOINT && y > 1 && y < OPEN_AREA_CHOKEPOINT + 1)
                || (y == OPEN_AREA_CHOKEPOINT && x > 1 && x < OPEN_AREA_CHOKEPOINT + 1);
            if chokepoint {
                let _ = grid.set(near, recipe.edge_tile);
                let _ = grid.set(far, recipe.edge_tile);
            } else {
                let _ = grid.set(near, recipe.start_tile);
                let _ = grid.set(far, recipe.end_tile);
            }
        }
    }
}

fn random_neighbor<R: Rng + ?Sized>(coord: TileCoord, rng: &mut R) -> TileCoord {
    let roll: f32 = rng.gen();
    if roll < 0.25 {
        coord.offset(-1, 0)
    } else if roll < 0.5 {
        coord.offset(0, 1)
    } else if roll < 0.75 {
        coord.offset(1, 0)
    } else {
        coord.offset(0, -1)
    }
}

fn is_interior(grid: &TileGrid, coord: TileCoord) -> bool {
    grid.contains(coord) && !grid.is_edge(coord)
}

fn last_interior(extent: u32) -> Option<i32> {
    let last = i32::try_from(extent).ok()? - 2;
    (last >= 1).then_some(last)
}

fn far_corner(grid: &TileGrid) -> Option<TileCoord> {
    Some(TileCoord::new(
        last_interior(grid.width())?,
        last_interior(grid.height())?,
    ))
}

fn interior_coords(grid: &TileGrid) -> Vec<TileCoord> {
    grid.iter()
        .map(|(coord, _)| coord)
        .filter(|coord| !grid.is_edge(*coord))
        .collect()
}

fn neighbors(coord: TileCoord) -> [TileCoord; 4] {
    [
        coord.offset(1, 0),
        coord.offset(-1, 0),
        coord.offset(0, 1),
        coord.offset(0, -1),
    ]
}
