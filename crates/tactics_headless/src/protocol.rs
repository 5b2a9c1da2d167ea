//! JSON protocol for headless battle communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses, including the events each command produced
//!
//! # Protocol Flow
//!
//! 1. Runner loads the scenario and outputs `{"type":"ready",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Every command gets exactly one response line
//! 4. `quit` (or end of input) ends the session with `{"type":"bye"}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","scenario":"Duel","units":2}
//! -> {"cmd":"start_turn"}
//! <- {"type":"events","cmd":"start_turn","events":[{"event":"turn_started","unit":1,"round":1}]}
//! -> {"cmd":"path","from_x":0,"from_y":1,"to_x":2,"to_y":0}
//! <- {"type":"path","tiles":[[0,1],[1,1],[1,0],[2,0]],"cost":3}
//! -> {"cmd":"move","unit":1,"x":2,"y":0}
//! <- {"type":"events","cmd":"move","events":[{"event":"unit_moved",...}]}
//! -> {"cmd":"move","unit":1,"x":0,"y":0}
//! <- {"type":"rejected","cmd":"move"}
//! -> {"cmd":"quit"}
//! <- {"type":"bye"}
//! ```

use serde::{Deserialize, Serialize};
use tactics_core::prelude::*;
use std::result::Result;

/// Protocol version reported in the ready line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// End the active turn (if any) and start the next unit's turn.
    StartTurn,

    /// End the active turn.
    EndTurn,

    /// Move a unit to a tile.
    Move { unit: u32, x: i32, y: i32 },

    /// Attack a tile with a named attack from the scenario.
    Attack {
        unit: u32,
        attack: String,
        x: i32,
        y: i32,
    },

    /// Query a path without moving anything.
    Path {
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
    },

    /// Query movement costs around a tile.
    Range { x: i32, y: i32, range: u32 },

    /// Query the full battle state.
    Query,

    /// Report the current state hash (for determinism verification).
    Hash,

    /// Quit the session.
    Quit,
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        scenario: String,
        units: usize,
    },

    /// Events produced by a state-changing command.
    Events { cmd: String, events: Vec<GameEvent> },

    /// The command was legal to send but not legal to perform; nothing changed.
    Rejected { cmd: String },

    /// A path query succeeded.
    Path { tiles: Vec<(i32, i32)>, cost: u32 },

    /// A path query failed.
    NoPath { reason: String },

    /// Reachable tiles of a range query.
    Range {
        origin: (i32, i32),
        tiles: Vec<RangeTile>,
    },

    /// Current battle state.
    State {
        round: u32,
        active: Option<u32>,
        outcome: Option<GameOutcome>,
        units: Vec<UnitState>,
        hash: u64,
    },

    /// State hash for determinism verification.
    StateHash { round: u32, hash: u64 },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// A reachable tile and its movement cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeTile {
    pub x: i32,
    pub y: i32,
    pub cost: u32,
}

/// State of a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    pub id: u32,
    pub name: String,
    pub team: Team,
    pub health: i32,
    pub max_health: i32,
    pub movement_points: u32,
    pub can_move: bool,
    pub can_attack: bool,
    /// `None` once the unit has died.
    pub position: Option<(i32, i32)>,
}

impl From<&Unit> for UnitState {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id.0,
            name: unit.name.clone(),
            team: unit.team,
            health: unit.health,
            max_health: unit.max_health,
            movement_points: unit.movement_points,
            can_move: unit.can_move,
            can_attack: unit.can_attack,
            position: unit.position().map(|c| (c.x, c.y)),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(scenario: &str, units: usize) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            scenario: scenario.to_string(),
            units,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Create a rejection.
    pub fn rejected(cmd: &str) -> Self {
        Self::Rejected {
            cmd: cmd.to_string(),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name as used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartTurn => "start_turn",
            Self::EndTurn => "end_turn",
            Self::Move { .. } => "move",
            Self::Attack { .. } => "attack",
            Self::Path { .. } => "path",
            Self::Range { .. } => "range",
            Self::Query => "query",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
