//! The tile grid: movement weights, terrain effects and occupancy.
//!
//! The grid only stores data and enforces bounds. Keeping a tile's occupant
//! consistent with the unit's own position is the job of
//! [`Battle`](crate::battle::Battle), which updates both sides together.

use serde::{Deserialize, Serialize};

use crate::coord::Coord;
use crate::error::{GameError, Result};
use crate::pathfinding::CostGrid;
use crate::topping::{PlacedTopping, Topping, ToppingBehavior, ToppingId};
use crate::unit::UnitId;

/// One cell of the grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    coord: Coord,
    weight: u32,
    topping: Option<PlacedTopping>,
    occupant: Option<UnitId>,
}

impl Tile {
    /// Position of this tile. Never changes.
    #[must_use]
    pub const fn coord(&self) -> Coord {
        self.coord
    }

    /// Movement weight. Zero means impassable.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }

    /// Terrain effect on this tile, if any.
    #[must_use]
    pub const fn topping(&self) -> Option<&PlacedTopping> {
        self.topping.as_ref()
    }

    /// Unit standing on this tile, if any.
    #[must_use]
    pub const fn occupant(&self) -> Option<UnitId> {
        self.occupant
    }

    /// Whether the terrain alone stops movement onto this tile.
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        self.weight == 0 || self.topping.as_ref().is_some_and(|t| t.topping.is_blocking())
    }
}

/// Rectangular grid of tiles with fixed dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    /// Tile data stored in row-major order.
    tiles: Vec<Tile>,
    next_topping_id: ToppingId,
}

impl Grid {
    /// Create a grid where every tile has the same weight.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero or does not fit an `i32`.
    #[must_use]
    pub fn new(width: u32, height: u32, weight: u32) -> Self {
        let cells = (width as usize) * (height as usize);
        match Self::from_weights(width, height, vec![weight; cells]) {
            Ok(grid) => grid,
            Err(err) => panic!("{err}"),
        }
    }

    /// Create a grid from row-major weights (`weights[y * width + x]`).
    pub fn from_weights(width: u32, height: u32, weights: Vec<u32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidGrid(format!(
                "dimensions must be positive, got {width}x{height}"
            )));
        }
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(GameError::InvalidGrid(format!(
                "dimensions {width}x{height} exceed the coordinate range"
            )));
        }
        let expected = (width as usize) * (height as usize);
        if weights.len() != expected {
            return Err(GameError::InvalidGrid(format!(
                "expected {expected} weights for {width}x{height}, got {}",
                weights.len()
            )));
        }

        let tiles = weights
            .into_iter()
            .enumerate()
            .map(|(i, weight)| Tile {
                coord: Coord::new((i % width as usize) as i32, (i / width as usize) as i32),
                weight,
                topping: None,
                occupant: None,
            })
            .collect();

        Ok(Self {
            width,
            height,
            tiles,
            next_topping_id: 0,
        })
    }

    /// Grid width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check if a coordinate is within grid bounds.
    #[must_use]
    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x >= 0 && coord.y >= 0 && (coord.x as u32) < self.width && (coord.y as u32) < self.height
    }

    /// Reject out-of-bounds coordinates with an error.
    pub fn check_bounds(&self, coord: Coord) -> Result<()> {
        if self.in_bounds(coord) {
            Ok(())
        } else {
            Err(GameError::OutOfBounds {
                coord,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Convert a coordinate to a tile index.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is out of bounds. Engine code only calls this
    /// with coordinates it has already validated.
    #[inline]
    fn index(&self, coord: Coord) -> usize {
        assert!(
            self.in_bounds(coord),
            "coordinate {coord} outside {}x{} grid",
            self.width,
            self.height
        );
        (coord.y as usize) * (self.width as usize) + (coord.x as usize)
    }

    /// Get a tile. Returns `None` if out of bounds.
    #[must_use]
    pub fn tile(&self, coord: Coord) -> Option<&Tile> {
        self.in_bounds(coord).then(|| &self.tiles[self.index(coord)])
    }

    /// Iterate over all tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Change a tile's movement weight.
    pub fn set_weight(&mut self, coord: Coord, weight: u32) -> Result<()> {
        self.check_bounds(coord)?;
        let index = self.index(coord);
        self.tiles[index].weight = weight;
        Ok(())
    }

    /// Put a terrain effect on a tile, replacing any existing one.
    ///
    /// Each placement is a new effect instance with a fresh ID.
    pub fn place_topping(&mut self, coord: Coord, topping: Topping) -> Result<ToppingId> {
        self.check_bounds(coord)?;
        self.next_topping_id += 1;
        let id = self.next_topping_id;
        let index = self.index(coord);
        self.tiles[index].topping = Some(PlacedTopping { id, topping });
        Ok(id)
    }

    /// Remove and return the terrain effect on a tile.
    pub fn remove_topping(&mut self, coord: Coord) -> Option<PlacedTopping> {
        if !self.in_bounds(coord) {
            return None;
        }
        let index = self.index(coord);
        self.tiles[index].topping.take()
    }

    /// Terrain effect on a tile. Returns `None` if out of bounds or bare.
    #[must_use]
    pub fn topping_at(&self, coord: Coord) -> Option<&PlacedTopping> {
        self.tile(coord).and_then(Tile::topping)
    }

    /// Unit on a tile. Returns `None` if out of bounds or empty.
    #[must_use]
    pub fn occupant(&self, coord: Coord) -> Option<UnitId> {
        self.tile(coord).and_then(Tile::occupant)
    }

    /// Set or clear a tile's occupant. Only `Battle` calls this, together
    /// with the matching update of the unit's position.
    pub(crate) fn set_occupant(&mut self, coord: Coord, occupant: Option<UnitId>) {
        let index = self.index(coord);
        self.tiles[index].occupant = occupant;
    }

    /// Whether a unit could be placed on this tile right now.
    #[must_use]
    pub fn is_free(&self, coord: Coord) -> bool {
        self.tile(coord)
            .is_some_and(|tile| !tile.is_blocked() && tile.occupant.is_none())
    }

    /// Movement costs as seen by the pathfinder.
    ///
    /// A tile's weight, or zero if a blocking topping or a unit stands on it.
    #[must_use]
    pub fn cost_grid(&self) -> CostGrid {
        let weights = self
            .tiles
            .iter()
            .map(|tile| {
                if tile.is_blocked() || tile.occupant.is_some() {
                    0
                } else {
                    tile.weight
                }
            })
            .collect();
        CostGrid::from_raw(self.width, self.height, weights)
    }
}
