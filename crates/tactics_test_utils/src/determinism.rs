//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical
//! results given identical setup, actions and RNG seed.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`tactics_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Units are stored in ID order and toppings are walked by coordinate.
//!
//! - **System randomness**: Hit rolls draw only from the RNG handed to
//!   each attack, seeded by the test.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual module determinism (pathfinding, combat, etc.)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full scripted battles are reproducible
//! 4. **Parallel tests**: Running N battles on separate threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use rand_chacha::ChaCha8Rng;
use tactics_core::battle::Battle;
use tactics_core::combat::Attack;
use tactics_core::coord::Coord;
use tactics_core::events::EventLog;
use tactics_core::unit::UnitId;

use crate::fixtures::seeded_rng;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps applied per run.
    pub steps: usize,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// One scripted action against a battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BattleAction {
    /// Begin the next unit's turn.
    StartTurn,
    /// End the active unit's turn.
    EndTurn,
    /// Move a unit.
    Move {
        /// Unit to move.
        unit: UnitId,
        /// Destination.
        target: Coord,
    },
    /// Attack a tile.
    Attack {
        /// Attacker.
        unit: UnitId,
        /// Targeted tile.
        target: Coord,
        /// Attack used.
        attack: Attack,
    },
}

/// Apply one action. Illegal actions are no-ops, exactly as in the engine.
pub fn apply_action(battle: &mut Battle<EventLog>, action: &BattleAction, rng: &mut ChaCha8Rng) {
    match action {
        BattleAction::StartTurn => {
            battle.start_next_turn();
        }
        BattleAction::EndTurn => battle.end_turn(),
        BattleAction::Move { unit, target } => {
            battle.execute_move(*unit, *target);
        }
        BattleAction::Attack {
            unit,
            target,
            attack,
        } => {
            battle.execute_attack(*unit, *target, attack, rng);
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance the state by one step (receives the step index)
/// * `hash` - Function to compute state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: usize,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, usize),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for index in 0..steps {
            step(&mut state, index);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Replay a script against freshly built battles and compare final hashes.
///
/// Each run gets its own RNG seeded with `seed`.
///
/// # Example
///
/// ```
/// use tactics_core::unit::Team;
/// use tactics_test_utils::determinism::{verify_battle_determinism, BattleAction};
/// use tactics_test_utils::fixtures::{battle_on, unit_at, uniform_grid};
///
/// let result = verify_battle_determinism(
///     || {
///         let mut battle = battle_on(uniform_grid(4, 4));
///         battle.spawn_unit(unit_at(Team::Player, 0, 0)).unwrap();
///         battle.spawn_unit(unit_at(Team::Ai, 3, 3)).unwrap();
///         battle
///     },
///     7,
///     &[BattleAction::StartTurn, BattleAction::EndTurn],
///     3,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_battle_determinism<F>(
    setup_fn: F,
    seed: u64,
    script: &[BattleAction],
    runs: usize,
) -> DeterminismResult
where
    F: Fn() -> Battle<EventLog>,
{
    verify_determinism(
        runs,
        script.len(),
        || (setup_fn(), seeded_rng(seed)),
        |state: &mut (Battle<EventLog>, ChaCha8Rng), index| {
            apply_action(&mut state.0, &script[index], &mut state.1);
        },
        |state: &(Battle<EventLog>, ChaCha8Rng)| state.0.state_hash(),
    )
}

/// Replay a script on N threads at once and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
pub fn run_parallel_battles<F>(
    setup_fn: F,
    seed: u64,
    script: &[BattleAction],
    num_battles: usize,
) -> DeterminismResult
where
    F: Fn() -> Battle<EventLog> + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup_fn();
                    let mut rng = seeded_rng(seed);
                    for action in script {
                        apply_action(&mut battle, action, &mut rng);
                    }
                    battle.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|_| panic!("battle thread panicked")))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        steps: script.len(),
    }
}

/// Compare two runs action by action, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(step)` if they first differ
/// after that many actions (`0` means the setups already differ).
pub fn find_first_divergence<F>(setup_fn: F, seed: u64, script: &[BattleAction]) -> Option<usize>
where
    F: Fn() -> Battle<EventLog>,
{
    let mut first = setup_fn();
    let mut second = setup_fn();
    let mut first_rng = seeded_rng(seed);
    let mut second_rng = seeded_rng(seed);

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for (index, action) in script.iter().enumerate() {
        apply_action(&mut first, action, &mut first_rng);
        apply_action(&mut second, action, &mut second_rng);

        if first.state_hash() != second.state_hash() {
            return Some(index + 1);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for rules testing.
///
/// These strategies generate random but reproducible grids, coordinates and
/// terrain layouts for property-based testing.
pub mod strategies {
    use proptest::prelude::*;
    use tactics_core::coord::Coord;
    use tactics_core::grid::Grid;
    use tactics_core::pathfinding::CostGrid;
    use tactics_core::topping::{HazardField, Obstacle, OilSlick, Topping};

    /// Generate grid dimensions between 1 and `max` on each side.
    pub fn arb_dimensions(max: u32) -> impl Strategy<Value = (u32, u32)> {
        (1..=max, 1..=max)
    }

    /// Generate a coordinate inside a `width` x `height` grid.
    pub fn arb_coord(width: u32, height: u32) -> impl Strategy<Value = Coord> {
        (0..width as i32, 0..height as i32).prop_map(|(x, y)| Coord::new(x, y))
    }

    /// Generate a tile weight: mostly passable, sometimes a wall.
    pub fn arb_weight() -> impl Strategy<Value = u32> {
        prop_oneof![
            1 => Just(0u32),
            4 => 1u32..=5u32,
        ]
    }

    /// Generate a cost grid up to `max` tiles on each side.
    pub fn arb_cost_grid(max: u32) -> impl Strategy<Value = CostGrid> {
        arb_dimensions(max).prop_flat_map(|(width, height)| {
            proptest::collection::vec(arb_weight(), (width * height) as usize)
                .prop_map(move |weights| CostGrid::from_raw(width, height, weights))
        })
    }

    /// Generate a cost grid together with two coordinates inside it.
    pub fn arb_cost_grid_with_endpoints(
        max: u32,
    ) -> impl Strategy<Value = (CostGrid, Coord, Coord)> {
        arb_cost_grid(max).prop_flat_map(|costs| {
            let (width, height) = (costs.width(), costs.height());
            (Just(costs), arb_coord(width, height), arb_coord(width, height))
        })
    }

    /// Generate any terrain effect.
    pub fn arb_topping() -> impl Strategy<Value = Topping> {
        prop_oneof![
            Just(Topping::from(Obstacle)),
            Just(Topping::from(HazardField::default())),
            Just(Topping::from(OilSlick::default())),
        ]
    }

    /// Generate a uniform grid where each tile may carry a terrain effect.
    pub fn arb_topping_grid(max: u32) -> impl Strategy<Value = Grid> {
        arb_dimensions(max).prop_flat_map(|(width, height)| {
            proptest::collection::vec(
                proptest::option::weighted(0.6, arb_topping()),
                (width * height) as usize,
            )
            .prop_map(move |layout| {
                let mut grid = Grid::new(width, height, 1);
                for (i, topping) in layout.into_iter().enumerate() {
                    if let Some(topping) = topping {
                        let coord = Coord::new(
                            (i % width as usize) as i32,
                            (i / width as usize) as i32,
                        );
                        grid.place_topping(coord, topping)
                            .unwrap_or_else(|err| panic!("{err}"));
                    }
                }
                grid
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{battle_on, fighter_at, unit_at, uniform_grid};
    use proptest::prelude::*;
    use tactics_core::unit::Team;

    fn duel() -> Battle<EventLog> {
        let mut battle = battle_on(uniform_grid(6, 6));
        battle
            .spawn_unit(fighter_at(Team::Player, 0, 0, 12, 3))
            .unwrap();
        battle.spawn_unit(fighter_at(Team::Ai, 5, 5, 12, 3)).unwrap();
        battle
    }

    fn duel_script() -> Vec<BattleAction> {
        let jab = Attack::melee("Jab", 1, 2).with_hit_percent(60);
        let mut script = Vec::new();
        for round in 0..4 {
            let offset = round % 2;
            script.extend([
                BattleAction::StartTurn,
                BattleAction::Move {
                    unit: UnitId(1),
                    target: Coord::new(2 + offset, 2),
                },
                BattleAction::Attack {
                    unit: UnitId(1),
                    target: Coord::new(3, 3),
                    attack: jab.clone(),
                },
                BattleAction::StartTurn,
                BattleAction::Move {
                    unit: UnitId(2),
                    target: Coord::new(3, 3),
                },
                BattleAction::Attack {
                    unit: UnitId(2),
                    target: Coord::new(3, 2),
                    attack: jab.clone(),
                },
            ]);
        }
        script
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n, _| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
    }

    #[test]
    fn test_empty_battle_determinism() {
        let result = verify_battle_determinism(|| battle_on(uniform_grid(3, 3)), 0, &[], 2);
        result.assert_deterministic();
    }

    #[test]
    fn test_scripted_duel_determinism() {
        let script = duel_script();
        verify_battle_determinism(duel, 99, &script, 4).assert_deterministic();
        assert_eq!(find_first_divergence(duel, 99, &script), None);
    }

    #[test]
    fn test_parallel_duels_match() {
        let script = duel_script();
        run_parallel_battles(duel, 1234, &script, 4).assert_deterministic();
    }

    #[test]
    fn test_divergent_setups_detected() {
        use std::sync::atomic::{AtomicU32, Ordering};
        let calls = AtomicU32::new(0);
        let setup = || {
            let mut battle = battle_on(uniform_grid(4, 4));
            let x = calls.fetch_add(1, Ordering::Relaxed) as i32 % 2;
            battle.spawn_unit(unit_at(Team::Player, x, 0)).unwrap();
            battle
        };
        assert_eq!(find_first_divergence(setup, 0, &[]), Some(0));
    }

    proptest! {
        #[test]
        fn prop_topping_grid_is_reproducible(grid in arb_topping_grid(6)) {
            prop_assert_eq!(compute_hash(&grid), compute_hash(&grid.clone()));
        }

        #[test]
        fn prop_cost_grid_dimensions((costs, a, b) in arb_cost_grid_with_endpoints(8)) {
            prop_assert!(costs.in_bounds(a));
            prop_assert!(costs.in_bounds(b));
        }
    }
}
