//! # Tactics Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Grid, unit and battle fixtures
//! - Seeded and scripted random sources
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
