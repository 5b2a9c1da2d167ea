//! Units, their per-turn resources, and the roster that owns them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::Coord;
use crate::element::Element;

/// Unique identifier for units, assigned in spawn order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Team {
    /// Human-controlled side.
    #[default]
    Player,
    /// Computer-controlled side.
    Ai,
}

/// Where a unit stands in its own turn, derived from its resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// Movement and attack both available.
    Ready,
    /// Movement used, attack still available.
    Moved,
    /// Attack used, movement still available.
    Attacked,
    /// Both used.
    Spent,
}

/// Parameters for spawning a new unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpawnParams {
    /// Display name.
    pub name: String,
    /// Owning side.
    pub team: Team,
    /// Elemental affiliation.
    #[serde(default)]
    pub element: Element,
    /// Maximum health (unit starts at full health).
    pub max_health: i32,
    /// Attack value added to every attack's base damage.
    pub attack: u32,
    /// Movement points restored at the start of each turn.
    pub movement: u32,
    /// Tile to spawn on.
    pub position: Coord,
}

/// A combatant on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier.
    pub id: UnitId,
    /// Display name.
    pub name: String,
    /// Owning side.
    pub team: Team,
    /// Elemental affiliation.
    pub element: Element,
    /// Current health. Zero or below means dead.
    pub health: i32,
    /// Maximum health.
    pub max_health: i32,
    /// Attack value.
    pub attack: u32,
    /// Movement points restored each turn.
    pub max_movement: u32,
    /// Movement points left this turn.
    pub movement_points: u32,
    /// Whether the unit may still move this turn.
    pub can_move: bool,
    /// Whether the unit may still attack this turn.
    pub can_attack: bool,
    /// Tile the unit stands on. `None` once it has died and left the grid.
    ///
    /// This is the source of truth for the unit's location; the tile's
    /// occupant reference mirrors it.
    position: Option<Coord>,
}

impl Unit {
    /// Build a unit from spawn parameters. Resources start full.
    #[must_use]
    pub fn new(id: UnitId, params: UnitSpawnParams) -> Self {
        Self {
            id,
            name: params.name,
            team: params.team,
            element: params.element,
            health: params.max_health,
            max_health: params.max_health,
            attack: params.attack,
            max_movement: params.movement,
            movement_points: params.movement,
            can_move: true,
            can_attack: true,
            position: Some(params.position),
        }
    }

    /// Tile the unit currently stands on.
    #[must_use]
    pub const fn position(&self) -> Option<Coord> {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Option<Coord>) {
        self.position = position;
    }

    /// Whether the unit still has health left.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Subtract damage from health. Health may drop below zero.
    pub fn lose_health(&mut self, damage: u32) {
        let damage = i32::try_from(damage).unwrap_or(i32::MAX);
        self.health = self.health.saturating_sub(damage);
    }

    /// Spend movement points, saturating at zero.
    pub fn use_movement(&mut self, cost: u32) {
        self.movement_points = self.movement_points.saturating_sub(cost);
    }

    /// Restore movement points and both permissions for a new turn.
    pub fn reset_resources(&mut self) {
        self.movement_points = self.max_movement;
        self.can_move = true;
        self.can_attack = true;
    }

    /// Current turn state derived from the two permissions.
    #[must_use]
    pub const fn turn_state(&self) -> TurnState {
        match (self.can_move, self.can_attack) {
            (true, true) => TurnState::Ready,
            (false, true) => TurnState::Moved,
            (true, false) => TurnState::Attacked,
            (false, false) => TurnState::Spent,
        }
    }
}

/// Storage for all units, dead or alive.
///
/// Dead units stay in the roster so outcome records can keep referring to
/// them; they simply no longer have a position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitRoster {
    units: BTreeMap<UnitId, Unit>,
    next_id: u32,
}

impl UnitRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a unit from `params`, store it, and return its ID.
    pub(crate) fn insert(&mut self, params: UnitSpawnParams) -> UnitId {
        self.next_id += 1;
        let id = UnitId(self.next_id);
        self.units.insert(id, Unit::new(id, params));
        id
    }

    /// Get a unit by ID.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Look up a unit the engine already holds a reference to.
    ///
    /// # Panics
    ///
    /// Panics if the ID is unknown; that means a dangling reference inside
    /// the engine.
    pub(crate) fn expect_mut(&mut self, id: UnitId) -> &mut Unit {
        match self.units.get_mut(&id) {
            Some(unit) => unit,
            None => panic!("unit {id} is referenced but not in the roster"),
        }
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of units, including dead ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Iterate over all units in ID (spawn) order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Iterate over living units in ID order.
    pub fn living(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|unit| unit.is_alive())
    }

    /// Whether the team still has at least one living unit.
    #[must_use]
    pub fn team_alive(&self, team: Team) -> bool {
        self.living().any(|unit| unit.team == team)
    }
}
