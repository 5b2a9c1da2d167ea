//! The battle session: authoritative state plus the turn cycle.
//!
//! A [`Battle`] owns the grid, every unit, the rules and the event sink. All
//! mutations go through it, one command at a time, and each command runs to
//! completion (terrain reactions and event publication included) before the
//! next one starts.
//!
//! # Determinism
//!
//! - No floating-point math (fixed-point via [`Fixed`](crate::math::Fixed))
//! - No system randomness; attacks take an injected RNG
//! - Units are iterated in ID order
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use tactics_core::prelude::*;
//!
//! let mut battle = Battle::new(Grid::new(5, 5, 1), RulesConfig::default(), EventLog::new());
//! let knight = battle
//!     .spawn_unit(UnitSpawnParams {
//!         name: "Knight".into(),
//!         team: Team::Player,
//!         element: Element::Neutral,
//!         max_health: 10,
//!         attack: 3,
//!         movement: 4,
//!         position: Coord::new(0, 0),
//!     })
//!     .unwrap();
//!
//! battle.start_next_turn();
//! let moved = battle.execute_move(knight, Coord::new(2, 1));
//! assert_eq!(moved.map(|m| m.path.cost), Some(3));
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let slash = Attack::melee("Slash", 1, 2);
//! let attacked = battle.execute_attack(knight, Coord::new(3, 1), &slash, &mut rng);
//! assert!(attacked.is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::RngCore;
use tracing::{debug, info};

use crate::combat::{Attack, AttackOutcome};
use crate::commands::{AttackUnit, MoveOutcome, MoveUnit};
use crate::config::RulesConfig;
use crate::coord::Coord;
use crate::error::{GameError, Result};
use crate::events::{EventLog, EventSink, GameEvent, GameOutcome};
use crate::grid::Grid;
use crate::pathfinding::{CancelToken, CostMatrix, Path, PathError, Pathfinder};
use crate::topping::{Topping, ToppingBehavior, ToppingId};
use crate::unit::{Team, Unit, UnitId, UnitRoster, UnitSpawnParams};

/// A running battle.
#[derive(Debug)]
pub struct Battle<S: EventSink = EventLog> {
    pub(crate) grid: Grid,
    pub(crate) units: UnitRoster,
    pub(crate) rules: RulesConfig,
    pub(crate) sink: S,
    /// Unit whose turn is in progress.
    active: Option<UnitId>,
    /// Unit whose turn started most recently, used to find the next one.
    last_turn: Option<UnitId>,
    round: u32,
    outcome: Option<GameOutcome>,
}

impl<S: EventSink> Battle<S> {
    /// Start a battle on `grid`. Units are added with [`Self::spawn_unit`].
    #[must_use]
    pub fn new(grid: Grid, rules: RulesConfig, sink: S) -> Self {
        Self {
            grid,
            units: UnitRoster::new(),
            rules,
            sink,
            active: None,
            last_turn: None,
            round: 0,
            outcome: None,
        }
    }

    /// The grid.
    #[must_use]
    pub const fn grid(&self) -> &Grid {
        &self.grid
    }

    /// All units, dead ones included.
    #[must_use]
    pub const fn units(&self) -> &UnitRoster {
        &self.units
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Active rules.
    #[must_use]
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// The event sink.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the event sink, e.g. to drain it.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Unit whose turn is in progress.
    #[must_use]
    pub const fn active_unit(&self) -> Option<UnitId> {
        self.active
    }

    /// Current round, zero before the first turn.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Final result, once one team is wiped out.
    #[must_use]
    pub const fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    /// Whether the battle has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Look up a unit the caller guarantees exists.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown.
    pub(crate) fn expect_unit(&self, id: UnitId) -> &Unit {
        match self.units.get(id) {
            Some(unit) => unit,
            None => panic!("command references unknown unit {id}"),
        }
    }

    /// Place a new unit on a free tile.
    ///
    /// # Errors
    ///
    /// - [`GameError::OutOfBounds`] if the position is outside the grid.
    /// - [`GameError::TileBlocked`] if the tile is impassable.
    /// - [`GameError::TileOccupied`] if another unit stands there.
    pub fn spawn_unit(&mut self, params: UnitSpawnParams) -> Result<UnitId> {
        let position = params.position;
        self.grid.check_bounds(position)?;
        if self.grid.occupant(position).is_some() {
            return Err(GameError::TileOccupied(position));
        }
        if !self.grid.is_free(position) {
            return Err(GameError::TileBlocked(position));
        }

        let team = params.team;
        let id = self.units.insert(params);
        self.grid.set_occupant(position, Some(id));
        debug!(unit = %id, ?team, %position, "unit spawned");

        self.sink.publish(GameEvent::UnitSpawned {
            unit: id,
            team,
            position,
        });
        self.debug_validate();
        Ok(id)
    }

    /// Put a terrain effect on a tile, replacing any existing one.
    ///
    /// # Errors
    ///
    /// - [`GameError::OutOfBounds`] if the tile is outside the grid.
    /// - [`GameError::TileOccupied`] if the effect blocks and a unit stands there.
    pub fn place_topping(&mut self, coord: Coord, topping: Topping) -> Result<ToppingId> {
        self.grid.check_bounds(coord)?;
        if topping.is_blocking() && self.grid.occupant(coord).is_some() {
            return Err(GameError::TileOccupied(coord));
        }
        self.grid.place_topping(coord, topping)
    }

    /// Pathfinder over the current movement costs.
    #[must_use]
    pub fn pathfinder(&self) -> Pathfinder {
        Pathfinder::new(self.grid.cost_grid(), self.rules.pathfinder)
    }

    /// Cheapest path between two tiles, treating units and blocking
    /// toppings as impassable.
    ///
    /// # Errors
    ///
    /// See [`Pathfinder::find_path`].
    pub fn compute_path(&self, from: Coord, to: Coord) -> std::result::Result<Path, PathError> {
        self.pathfinder().find_path(from, to)
    }

    /// Like [`Self::compute_path`], polling `cancel` between expansions.
    ///
    /// # Errors
    ///
    /// See [`Pathfinder::find_path`].
    pub fn compute_path_cancellable(
        &self,
        from: Coord,
        to: Coord,
        cancel: &CancelToken,
    ) -> std::result::Result<Path, PathError> {
        self.pathfinder().find_path_cancellable(from, to, cancel)
    }

    /// Minimum movement cost from `origin` to every tile within `max_range`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::OutOfBounds`] if the origin is outside the grid.
    pub fn compute_range_costs(
        &self,
        origin: Coord,
        max_range: u32,
    ) -> std::result::Result<CostMatrix, PathError> {
        self.pathfinder().range_costs(origin, max_range)
    }

    /// Move a unit. `None` if the move is not legal.
    ///
    /// # Panics
    ///
    /// Panics if `unit` is not part of this battle.
    pub fn execute_move(&mut self, unit: UnitId, target: Coord) -> Option<MoveOutcome> {
        let outcome = MoveUnit { unit, target }.execute(self);
        self.debug_validate();
        outcome
    }

    /// Attack a tile. `None` if the attack is not legal.
    ///
    /// # Panics
    ///
    /// Panics if `unit` is not part of this battle.
    pub fn execute_attack<R: RngCore + ?Sized>(
        &mut self,
        unit: UnitId,
        target: Coord,
        attack: &Attack,
        rng: &mut R,
    ) -> Option<AttackOutcome> {
        let outcome = AttackUnit {
            source: unit,
            target,
            attack,
        }
        .execute(self, rng);
        self.debug_validate();
        outcome
    }

    /// Restore a unit's movement points and permissions.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownUnit`] if the unit does not exist.
    pub fn reset_unit_resources(&mut self, unit: UnitId) -> Result<()> {
        self.units
            .get_mut(unit)
            .ok_or(GameError::UnknownUnit(unit))?
            .reset_resources();
        Ok(())
    }

    /// Begin the next living unit's turn, in spawn order.
    ///
    /// A turn still in progress is ended first. Returns the new active unit,
    /// or `None` once the battle is over or nobody is left.
    pub fn start_next_turn(&mut self) -> Option<UnitId> {
        if self.active.is_some() {
            self.end_turn();
        }
        if self.is_over() {
            return None;
        }

        let after_last = self
            .units
            .living()
            .map(|unit| unit.id)
            .find(|&id| self.last_turn.map_or(true, |last| id > last));
        let next = match after_last {
            Some(id) if self.round > 0 => id,
            _ => {
                self.round += 1;
                self.units.living().next()?.id
            }
        };

        self.units.expect_mut(next).reset_resources();
        self.active = Some(next);
        self.last_turn = Some(next);
        info!(unit = %next, round = self.round, "turn started");
        self.sink.publish(GameEvent::TurnStarted {
            unit: next,
            round: self.round,
        });
        Some(next)
    }

    /// End the active unit's turn: apply the stay effect of the terrain it
    /// stands on, then resolve deaths and game over.
    pub fn end_turn(&mut self) {
        let Some(id) = self.active.take() else {
            return;
        };
        if self.is_over() {
            return;
        }

        let unit = self.expect_unit(id);
        let Some(coord) = unit.position().filter(|_| unit.is_alive()) else {
            return;
        };
        let Some(placed) = self.grid.topping_at(coord) else {
            return;
        };

        let effect = placed.topping.on_stay_effect(unit);
        if effect.damage == 0 {
            return;
        }

        self.units.expect_mut(id).lose_health(effect.damage);
        debug!(unit = %id, %coord, damage = effect.damage, "stay effect applied");
        self.sink.publish(GameEvent::StayEffectApplied {
            unit: id,
            coord,
            damage: effect.damage,
        });
        self.resolve_deaths(&[id]);
        self.check_game_over();
        self.debug_validate();
    }

    /// Move a unit between tiles, or off the grid with `None`, keeping the
    /// tile occupant and the unit's position in step.
    ///
    /// # Panics
    ///
    /// Panics if the destination is out of bounds or held by another unit.
    pub(crate) fn relocate_unit(&mut self, id: UnitId, to: Option<Coord>) {
        let from = self.expect_unit(id).position();
        if let Some(to) = to {
            assert!(
                self.grid.occupant(to).map_or(true, |other| other == id),
                "cannot move {id} onto occupied tile {to}"
            );
        }

        if let Some(from) = from {
            self.grid.set_occupant(from, None);
        }
        if let Some(to) = to {
            self.grid.set_occupant(to, Some(id));
        }
        self.units.expect_mut(id).set_position(to);
    }

    /// Remove every dead unit among `candidates` from the grid and announce
    /// each death. Returns the units removed.
    pub(crate) fn resolve_deaths(&mut self, candidates: &[UnitId]) -> Vec<UnitId> {
        let mut deaths = Vec::new();
        for &id in candidates {
            let unit = self.expect_unit(id);
            if unit.is_alive() || unit.position().is_none() {
                continue;
            }
            self.relocate_unit(id, None);
            if self.active == Some(id) {
                self.active = None;
            }
            info!(unit = %id, "unit died");
            self.sink.publish(GameEvent::UnitDied { unit: id });
            deaths.push(id);
        }
        deaths
    }

    /// Publish [`GameEvent::GameOver`] the first time a team is wiped out.
    pub(crate) fn check_game_over(&mut self) {
        if self.is_over() {
            return;
        }
        let outcome = match (
            self.units.team_alive(Team::Player),
            self.units.team_alive(Team::Ai),
        ) {
            (true, true) => return,
            (true, false) => GameOutcome::Victory,
            (false, true) => GameOutcome::Defeat,
            (false, false) => GameOutcome::Draw,
        };

        self.outcome = Some(outcome);
        self.active = None;
        info!(?outcome, "game over");
        self.sink.publish(GameEvent::GameOver { outcome });
    }

    /// Calculate a hash of the current battle state.
    ///
    /// Two battles with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.round.hash(&mut hasher);
        self.active.hash(&mut hasher);
        self.outcome.hash(&mut hasher);
        self.grid.hash(&mut hasher);

        // Roster iterates in ID order
        self.units.len().hash(&mut hasher);
        for unit in self.units.iter() {
            unit.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Consume the battle and return its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Assert that every tile occupant and unit position agree.
    ///
    /// # Panics
    ///
    /// Panics on the first mismatch.
    pub fn validate(&self) {
        for tile in self.grid.tiles() {
            if let Some(id) = tile.occupant() {
                let unit = self.expect_unit(id);
                assert_eq!(
                    unit.position(),
                    Some(tile.coord()),
                    "tile {} holds {id} but the unit is elsewhere",
                    tile.coord()
                );
            }
        }
        for unit in self.units.iter() {
            if let Some(position) = unit.position() {
                assert_eq!(
                    self.grid.occupant(position),
                    Some(unit.id),
                    "unit {} claims tile {position} it does not occupy",
                    unit.id
                );
            }
        }
    }

    #[inline]
    fn debug_validate(&self) {
        #[cfg(any(debug_assertions, feature = "debug-validation"))]
        self.validate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::topping::{HazardField, Obstacle};

    fn params(team: Team, x: i32, y: i32) -> UnitSpawnParams {
        UnitSpawnParams {
            name: format!("{team:?}@{x},{y}"),
            team,
            element: Element::Neutral,
            max_health: 10,
            attack: 2,
            movement: 4,
            position: Coord::new(x, y),
        }
    }

    fn battle() -> Battle {
        Battle::new(Grid::new(5, 5, 1), RulesConfig::default(), EventLog::new())
    }

    #[test]
    fn test_spawn_unit_publishes_event() {
        let mut battle = battle();
        let id = battle.spawn_unit(params(Team::Player, 1, 1)).unwrap();

        assert_eq!(battle.grid().occupant(Coord::new(1, 1)), Some(id));
        assert_eq!(
            battle.sink().events(),
            &[GameEvent::UnitSpawned {
                unit: id,
                team: Team::Player,
                position: Coord::new(1, 1),
            }]
        );
    }

    #[test]
    fn test_spawn_rejects_bad_tiles() {
        let mut battle = battle();
        battle.spawn_unit(params(Team::Player, 1, 1)).unwrap();
        battle.place_topping(Coord::new(2, 2), Obstacle.into()).unwrap();

        assert_eq!(
            battle.spawn_unit(params(Team::Ai, 1, 1)),
            Err(GameError::TileOccupied(Coord::new(1, 1)))
        );
        assert_eq!(
            battle.spawn_unit(params(Team::Ai, 2, 2)),
            Err(GameError::TileBlocked(Coord::new(2, 2)))
        );
        assert!(matches!(
            battle.spawn_unit(params(Team::Ai, 5, 0)),
            Err(GameError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_blocking_topping_cannot_cover_unit() {
        let mut battle = battle();
        battle.spawn_unit(params(Team::Player, 0, 0)).unwrap();
        assert_eq!(
            battle.place_topping(Coord::new(0, 0), Obstacle.into()),
            Err(GameError::TileOccupied(Coord::new(0, 0)))
        );
        assert!(battle
            .place_topping(Coord::new(0, 0), HazardField::default().into())
            .is_ok());
    }

    #[test]
    fn test_turn_order_follows_spawn_order() {
        let mut battle = battle();
        let a = battle.spawn_unit(params(Team::Player, 0, 0)).unwrap();
        let b = battle.spawn_unit(params(Team::Ai, 4, 4)).unwrap();

        assert_eq!(battle.start_next_turn(), Some(a));
        assert_eq!(battle.round(), 1);
        assert_eq!(battle.start_next_turn(), Some(b));
        assert_eq!(battle.round(), 1);
        assert_eq!(battle.start_next_turn(), Some(a));
        assert_eq!(battle.round(), 2);
    }

    #[test]
    fn test_turn_start_resets_resources() {
        let mut battle = battle();
        let a = battle.spawn_unit(params(Team::Player, 0, 0)).unwrap();
        battle.spawn_unit(params(Team::Ai, 4, 4)).unwrap();

        battle.start_next_turn();
        battle.execute_move(a, Coord::new(0, 2)).unwrap();
        assert!(!battle.unit(a).unwrap().can_move);
        assert_eq!(battle.unit(a).unwrap().movement_points, 2);

        battle.start_next_turn();
        battle.start_next_turn();
        let unit = battle.unit(a).unwrap();
        assert!(unit.can_move);
        assert_eq!(unit.movement_points, 4);
    }

    #[test]
    fn test_reset_unknown_unit() {
        let mut battle = battle();
        assert_eq!(
            battle.reset_unit_resources(UnitId(9)),
            Err(GameError::UnknownUnit(UnitId(9)))
        );
    }

    #[test]
    fn test_stay_effect_on_end_turn() {
        let mut battle = battle();
        let a = battle.spawn_unit(params(Team::Player, 0, 0)).unwrap();
        battle.spawn_unit(params(Team::Ai, 4, 4)).unwrap();
        battle
            .place_topping(Coord::new(0, 0), HazardField::default().into())
            .unwrap();

        battle.start_next_turn();
        battle.end_turn();

        assert_eq!(battle.unit(a).unwrap().health, 9);
        assert!(battle.sink().events().contains(&GameEvent::StayEffectApplied {
            unit: a,
            coord: Coord::new(0, 0),
            damage: 1,
        }));
        assert_eq!(battle.active_unit(), None);
    }

    #[test]
    fn test_stay_effect_can_end_the_game() {
        let mut battle = battle();
        let a = battle
            .spawn_unit(UnitSpawnParams {
                max_health: 1,
                ..params(Team::Player, 0, 0)
            })
            .unwrap();
        battle.spawn_unit(params(Team::Ai, 4, 4)).unwrap();
        battle
            .place_topping(Coord::new(0, 0), HazardField::default().into())
            .unwrap();

        battle.start_next_turn();
        battle.end_turn();

        assert!(!battle.unit(a).unwrap().is_alive());
        assert_eq!(battle.grid().occupant(Coord::new(0, 0)), None);
        assert_eq!(battle.outcome(), Some(GameOutcome::Defeat));
        assert_eq!(battle.start_next_turn(), None);

        let game_overs = battle
            .sink()
            .events()
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count();
        assert_eq!(game_overs, 1);
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let mut first = battle();
        let mut second = battle();
        let a = first.spawn_unit(params(Team::Player, 0, 0)).unwrap();
        second.spawn_unit(params(Team::Player, 0, 0)).unwrap();
        assert_eq!(first.state_hash(), second.state_hash());

        first.execute_move(a, Coord::new(1, 0)).unwrap();
        assert_ne!(first.state_hash(), second.state_hash());
    }

    #[test]
    fn test_relocate_keeps_references_consistent() {
        let mut battle = battle();
        let a = battle.spawn_unit(params(Team::Player, 0, 0)).unwrap();

        battle.relocate_unit(a, Some(Coord::new(3, 3)));
        assert_eq!(battle.grid().occupant(Coord::new(0, 0)), None);
        assert_eq!(battle.grid().occupant(Coord::new(3, 3)), Some(a));
        assert_eq!(battle.unit(a).unwrap().position(), Some(Coord::new(3, 3)));
        battle.validate();
    }

    #[test]
    #[should_panic(expected = "occupied tile")]
    fn test_relocate_onto_other_unit_panics() {
        let mut battle = battle();
        let a = battle.spawn_unit(params(Team::Player, 0, 0)).unwrap();
        battle.spawn_unit(params(Team::Ai, 1, 0)).unwrap();
        battle.relocate_unit(a, Some(Coord::new(1, 0)));
    }
}
