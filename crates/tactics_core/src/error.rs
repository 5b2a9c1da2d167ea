//! Error types for the rules engine.
//!
//! Illegal player actions are not errors: commands resolve them as no-ops.
//! These variants cover bad setup data and queries that reference things
//! that do not exist.

use thiserror::Error;

use crate::coord::Coord;
use crate::unit::UnitId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all rules engine errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    /// Coordinate lies outside the grid.
    #[error("Coordinate {coord} is outside the {width}x{height} grid")]
    OutOfBounds {
        /// Offending coordinate.
        coord: Coord,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },

    /// Grid dimensions or weight data are unusable.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// Tile already holds a unit.
    #[error("Tile {0} is already occupied")]
    TileOccupied(Coord),

    /// Tile cannot hold a unit (impassable weight or blocking topping).
    #[error("Tile {0} is blocked")]
    TileBlocked(Coord),

    /// Invalid unit identifier.
    #[error("Unknown unit ID: {0}")]
    UnknownUnit(UnitId),

    /// Configuration value outside the supported range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data text parsing error.
    #[error("Failed to parse {source_name} data: {message}")]
    DataParseError {
        /// What was being parsed.
        source_name: String,
        /// Error message.
        message: String,
    },
}
