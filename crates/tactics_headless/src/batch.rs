//! Scripted batch runs and determinism verification.
//!
//! Replays a scenario's script under many seeds in parallel using rayon,
//! or under one seed many times to check that the engine is deterministic.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tactics_core::prelude::*;
use std::result::Result;
use tracing::{info, warn};

use crate::protocol::Response;
use crate::runner::HeadlessRunner;
use crate::scenario::{Scenario, ScenarioError};

/// Result of replaying a script once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRun {
    /// Seed of the hit-roll RNG.
    pub seed: u64,
    /// Final state hash.
    pub hash: u64,
    /// Final result, if the script ended the battle.
    pub outcome: Option<GameOutcome>,
    /// Script steps the engine rejected as illegal.
    pub rejected: usize,
    /// Every event published during the script.
    pub events: Vec<GameEvent>,
}

/// Replay the scenario's script with the given seed.
pub fn run_script(scenario: &Scenario, seed: u64) -> Result<ScriptRun, ScenarioError> {
    scenario.validate_script()?;
    let mut runner = HeadlessRunner::new(scenario, seed)?;

    let mut rejected = 0;
    let mut events = Vec::new();
    for step in &scenario.script {
        match runner.apply_step(step) {
            Response::Events {
                events: produced, ..
            } => events.extend(produced),
            _ => rejected += 1,
        }
    }

    let battle = runner.battle();
    Ok(ScriptRun {
        seed,
        hash: battle.state_hash(),
        outcome: battle.outcome(),
        rejected,
        events,
    })
}

/// Outcome counts over a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs played.
    pub runs: usize,
    /// Player team won.
    pub victories: usize,
    /// AI team won.
    pub defeats: usize,
    /// Both teams wiped out.
    pub draws: usize,
    /// Script ended before either team was wiped out.
    pub unfinished: usize,
}

impl BatchSummary {
    /// Tally outcomes.
    pub fn from_runs(runs: &[ScriptRun]) -> Self {
        let mut summary = Self {
            runs: runs.len(),
            ..Self::default()
        };
        for run in runs {
            match run.outcome {
                Some(GameOutcome::Victory) => summary.victories += 1,
                Some(GameOutcome::Defeat) => summary.defeats += 1,
                Some(GameOutcome::Draw) => summary.draws += 1,
                None => summary.unfinished += 1,
            }
        }
        summary
    }
}

/// Replay the script once per seed in `seed_start..seed_start + count`.
pub fn run_batch(
    scenario: &Scenario,
    seed_start: u64,
    count: u32,
) -> Result<(Vec<ScriptRun>, BatchSummary), ScenarioError> {
    scenario.validate_script()?;

    let runs: Vec<ScriptRun> = (0..count)
        .into_par_iter()
        .map(|i| run_script(scenario, seed_start.wrapping_add(u64::from(i))))
        .collect::<Result<_, _>>()?;

    let summary = BatchSummary::from_runs(&runs);
    info!(
        "Batch complete: {} runs, {} victories, {} defeats, {} draws",
        summary.runs, summary.victories, summary.defeats, summary.draws
    );
    Ok((runs, summary))
}

/// Hashes collected by [`verify_determinism`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminismReport {
    /// Seed every run used.
    pub seed: u64,
    /// Final hash of each run.
    pub hashes: Vec<u64>,
    /// Whether every run produced the same hash and event stream.
    pub deterministic: bool,
}

/// Replay the script `runs` times with the same seed and compare results.
pub fn verify_determinism(
    scenario: &Scenario,
    seed: u64,
    runs: u32,
) -> Result<DeterminismReport, ScenarioError> {
    let results: Vec<ScriptRun> = (0..runs.max(1))
        .into_par_iter()
        .map(|_| run_script(scenario, seed))
        .collect::<Result<_, _>>()?;

    let first = &results[0];
    let deterministic = results
        .iter()
        .all(|r| r.hash == first.hash && r.events == first.events);
    if !deterministic {
        warn!(seed, "runs diverged");
    }

    Ok(DeterminismReport {
        seed,
        hashes: results.iter().map(|r| r.hash).collect(),
        deterministic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_script_records_events() {
        let run = run_script(&Scenario::duel(), 1).unwrap();
        assert!(matches!(
            run.events.first(),
            Some(GameEvent::TurnStarted { round: 1, .. })
        ));
        assert!(run
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::UnitMoved { .. })));
    }

    #[test]
    fn test_run_script_rejects_bad_script() {
        let mut scenario = Scenario::duel();
        scenario.script.push(crate::scenario::ScriptStep::Move { unit: 7, x: 0, y: 0 });
        assert!(matches!(
            run_script(&scenario, 1),
            Err(ScenarioError::UnknownUnit { unit: 7, .. })
        ));
    }

    #[test]
    fn test_batch_summary_counts_every_run() {
        let (runs, summary) = run_batch(&Scenario::duel(), 100, 16).unwrap();
        assert_eq!(runs.len(), 16);
        assert_eq!(
            summary.victories + summary.defeats + summary.draws + summary.unfinished,
            16
        );
        for (i, run) in runs.iter().enumerate() {
            assert_eq!(run.seed, 100 + i as u64);
        }
    }

    #[test]
    fn test_verify_determinism() {
        let report = verify_determinism(&Scenario::duel(), 12345, 4).unwrap();
        assert!(report.deterministic);
        assert_eq!(report.hashes.len(), 4);
    }
}
