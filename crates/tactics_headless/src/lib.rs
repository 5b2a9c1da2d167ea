//! Headless battle runner for scripted play and CI verification.
//!
//! This crate drives a [`tactics_core`] battle without any user interface.
//! A controller sends JSON commands on stdin and reads game state and
//! events on stdout. This enables:
//!
//! - **AI testing**: An agent can play a battle over a pipe
//! - **CI verification**: Scripted scenarios check rules and determinism
//! - **Batch runs**: The same script replayed under many hit-roll seeds
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (start_turn, move, attack, etc.)
//! - **stdout**: Responses and the events each command produced (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"start_turn"}' | cargo run -p tactics_headless -- run --scenario duel.ron
//!
//! # Verify determinism of a scenario's script
//! cargo run -p tactics_headless -- verify --scenario duel.ron --seed 7 --runs 5
//! ```

pub mod batch;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, run_script, verify_determinism, BatchSummary, DeterminismReport, ScriptRun};
pub use protocol::{Command, Response};
pub use runner::HeadlessRunner;
pub use scenario::{Scenario, ScenarioError, ScriptStep};
