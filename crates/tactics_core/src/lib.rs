//! # Tactics Core
//!
//! Deterministic rules engine for a turn-based grid tactics game.
//!
//! This crate contains **only** rules logic:
//! - No rendering
//! - No IO
//! - No system randomness (hit rolls draw from an injected RNG)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless runners and scripted scenarios
//! - Reproducible battles from a seed
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`grid`] - Tiles, weights, terrain effects and occupancy
//! - [`pathfinding`] - A* search and bounded range costs
//! - [`combat`] - Attack definitions and attack resolution
//! - [`topping`] - Terrain effect variants and their propagation
//! - [`commands`] - Move and attack commands
//! - [`battle`] - Session state and the turn cycle
//! - [`events`] - Outcome records and sinks
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod combat;
pub mod commands;
pub mod config;
pub mod coord;
pub mod element;
pub mod error;
pub mod events;
pub mod grid;
pub mod math;
pub mod pathfinding;
pub mod topping;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::Battle;
    pub use crate::combat::{Attack, AttackOutcome, Hit};
    pub use crate::commands::{AttackUnit, MoveOutcome, MoveUnit};
    pub use crate::config::{BalanceConfig, RulesConfig};
    pub use crate::coord::{Coord, Direction, Rotation};
    pub use crate::element::{Effectiveness, Element, ElementProfile};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{EventLog, EventSink, GameEvent, GameOutcome, NullSink};
    pub use crate::grid::{Grid, Tile};
    pub use crate::math::Fixed;
    pub use crate::pathfinding::{
        CancelToken, CostGrid, CostMatrix, Heuristic, MovementModel, Path, PathError, Pathfinder,
        PathfinderConfig,
    };
    pub use crate::topping::{HazardField, Obstacle, OilSlick, Topping, ToppingBehavior, ToppingId};
    pub use crate::unit::{Team, TurnState, Unit, UnitId, UnitRoster, UnitSpawnParams};
}
