//! Player intents. Each command is built with everything it needs, executed
//! once against a [`Battle`], and dropped.
//!
//! Illegal commands resolve to `None` and leave the battle untouched.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::Battle;
use crate::combat::{resolve_attack, Attack, AttackOutcome};
use crate::coord::Coord;
use crate::events::{EventSink, GameEvent};
use crate::pathfinding::Path;
use crate::unit::UnitId;

/// Walk a unit to a target tile along the cheapest path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveUnit {
    /// Unit to move.
    pub unit: UnitId,
    /// Destination tile.
    pub target: Coord,
}

/// Result of a successful move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// Moved unit.
    pub unit: UnitId,
    /// Path walked, start included.
    pub path: Path,
}

impl MoveUnit {
    /// Execute the move.
    ///
    /// # Panics
    ///
    /// Panics if the unit is not part of the battle.
    pub fn execute<S: EventSink>(self, battle: &mut Battle<S>) -> Option<MoveOutcome> {
        let path = match self.plan(battle) {
            Ok(path) => path,
            Err(reason) => {
                debug!(unit = %self.unit, target = %self.target, reason, "move rejected");
                return None;
            }
        };

        battle.relocate_unit(self.unit, Some(self.target));
        let unit = battle.units.expect_mut(self.unit);
        unit.use_movement(path.cost);
        unit.can_move = false;

        battle.sink.publish(GameEvent::UnitMoved {
            unit: self.unit,
            path: path.tiles.clone(),
            cost: path.cost,
        });

        Some(MoveOutcome {
            unit: self.unit,
            path,
        })
    }

    /// Validate the move and find its path without changing anything.
    fn plan<S: EventSink>(&self, battle: &Battle<S>) -> Result<Path, &'static str> {
        if battle.is_over() {
            return Err("battle is over");
        }
        let unit = battle.expect_unit(self.unit);
        if !unit.is_alive() {
            return Err("unit is dead");
        }
        if !unit.can_move {
            return Err("movement already used this turn");
        }
        let Some(start) = unit.position() else {
            return Err("unit is not on the grid");
        };
        if !battle.grid().in_bounds(self.target) {
            return Err("target out of bounds");
        }
        if start == self.target {
            return Err("unit is already there");
        }

        let path = battle
            .compute_path(start, self.target)
            .map_err(|_| "no path to target")?;
        if path.cost > unit.movement_points {
            return Err("not enough movement points");
        }
        Ok(path)
    }
}

/// Perform an attack from a unit against a target tile.
#[derive(Debug, Clone, Copy)]
pub struct AttackUnit<'a> {
    /// Attacking unit.
    pub source: UnitId,
    /// Targeted tile.
    pub target: Coord,
    /// Attack used.
    pub attack: &'a Attack,
}

impl AttackUnit<'_> {
    /// Execute the attack, drawing the hit roll from `rng`.
    ///
    /// # Panics
    ///
    /// Panics if the source unit is not part of the battle.
    pub fn execute<S, R>(self, battle: &mut Battle<S>, rng: &mut R) -> Option<AttackOutcome>
    where
        S: EventSink,
        R: RngCore + ?Sized,
    {
        resolve_attack(battle, self.source, self.target, self.attack, rng)
    }
}
