//! Scenario loading and battle setup.
//!
//! A scenario describes the starting board for a headless battle: grid size
//! and terrain, toppings, units, the attacks units may use, rule overrides
//! and an optional scripted command list for replay and determinism checks.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tactics_core::prelude::*;
use std::result::Result;
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The board could not be built.
    #[error("Invalid scenario setup: {0}")]
    Setup(#[from] GameError),
    /// A script step names an attack that is not in the attack library.
    #[error("Script step {step} uses unknown attack {name:?}")]
    UnknownAttack {
        /// Zero-based script index.
        step: usize,
        /// Attack name.
        name: String,
    },
    /// A script step names a unit that does not exist.
    #[error("Script step {step} references unknown unit {unit}")]
    UnknownUnit {
        /// Zero-based script index.
        step: usize,
        /// Unit ID as written in the script.
        unit: u32,
    },
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Grid dimensions and terrain weights.
    pub grid: GridSetup,
    /// Terrain effects placed before any unit spawns.
    #[serde(default)]
    pub toppings: Vec<ToppingPlacement>,
    /// Units, spawned in order. The first gets ID 1.
    pub units: Vec<UnitPlacement>,
    /// Attacks available to `attack` commands, by name.
    #[serde(default)]
    pub attacks: BTreeMap<String, Attack>,
    /// Rule overrides.
    #[serde(default)]
    pub rules: RulesConfig,
    /// Commands replayed by `verify` and `batch`.
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

/// Grid size and terrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSetup {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Weight of every tile not listed in `weights`.
    #[serde(default = "default_weight")]
    pub default_weight: u32,
    /// Per-tile weight overrides. Zero marks an impassable tile.
    #[serde(default)]
    pub weights: Vec<WeightOverride>,
}

fn default_weight() -> u32 {
    1
}

/// A single tile weight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeightOverride {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Movement cost of the tile.
    pub weight: u32,
}

/// Topping variants a scenario can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToppingKind {
    /// Blocking obstacle.
    Obstacle,
    /// Damaging hazard field.
    Hazard,
    /// Oil that fire turns into a hazard.
    Oil,
}

/// A topping on a tile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ToppingPlacement {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// Variant.
    pub kind: ToppingKind,
    /// Hazard damage per turn, overriding the default.
    #[serde(default)]
    pub damage: Option<u32>,
}

impl ToppingPlacement {
    /// Build the engine topping for this placement.
    #[must_use]
    pub fn topping(&self) -> Topping {
        let hazard = HazardField {
            damage_per_turn: self
                .damage
                .unwrap_or(HazardField::default().damage_per_turn),
            ..HazardField::default()
        };
        match self.kind {
            ToppingKind::Obstacle => Obstacle.into(),
            ToppingKind::Hazard => hazard.into(),
            ToppingKind::Oil => OilSlick {
                ignites_into: hazard,
            }
            .into(),
        }
    }
}

/// A unit to spawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Display name.
    pub name: String,
    /// Side.
    pub team: Team,
    /// Elemental affiliation.
    #[serde(default)]
    pub element: Element,
    /// Starting and maximum health.
    pub health: i32,
    /// Attack value added to every attack's base damage.
    #[serde(default)]
    pub attack: u32,
    /// Movement points per turn.
    pub movement: u32,
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl UnitPlacement {
    /// Spawn parameters for the engine.
    #[must_use]
    pub fn spawn_params(&self) -> UnitSpawnParams {
        UnitSpawnParams {
            name: self.name.clone(),
            team: self.team,
            element: self.element,
            max_health: self.health,
            attack: self.attack,
            movement: self.movement,
            position: Coord::new(self.x, self.y),
        }
    }
}

/// One scripted command.
///
/// Unit IDs follow spawn order, starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptStep {
    /// Start the next unit's turn.
    StartTurn,
    /// End the active unit's turn.
    EndTurn,
    /// Move a unit.
    Move {
        /// Unit ID.
        unit: u32,
        /// Target column.
        x: i32,
        /// Target row.
        y: i32,
    },
    /// Attack a tile with a named attack.
    Attack {
        /// Unit ID.
        unit: u32,
        /// Attack name in the scenario's library.
        attack: String,
        /// Target column.
        x: i32,
        /// Target row.
        y: i32,
    },
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.rules.validate()?;
        Ok(scenario)
    }

    /// Build the grid: terrain weights first, then toppings.
    pub fn build_grid(&self) -> Result<Grid, ScenarioError> {
        let setup = &self.grid;
        let mut grid = Grid::new(setup.width, setup.height, setup.default_weight);
        for tile in &setup.weights {
            grid.set_weight(Coord::new(tile.x, tile.y), tile.weight)?;
        }
        for placement in &self.toppings {
            grid.place_topping(Coord::new(placement.x, placement.y), placement.topping())?;
        }
        Ok(grid)
    }

    /// Build a battle with every unit spawned.
    ///
    /// Spawn events are left in the log.
    pub fn build_battle(&self) -> Result<Battle<EventLog>, ScenarioError> {
        self.rules.validate()?;
        let mut battle = Battle::new(self.build_grid()?, self.rules.clone(), EventLog::new());
        for unit in &self.units {
            battle.spawn_unit(unit.spawn_params())?;
        }
        Ok(battle)
    }

    /// Check that every script step names a known unit and attack.
    pub fn validate_script(&self) -> Result<(), ScenarioError> {
        let unit_count = self.units.len();
        let known_unit = |unit: u32| unit >= 1 && (unit as usize) <= unit_count;

        for (step, command) in self.script.iter().enumerate() {
            match command {
                ScriptStep::StartTurn | ScriptStep::EndTurn => {}
                ScriptStep::Move { unit, .. } => {
                    if !known_unit(*unit) {
                        return Err(ScenarioError::UnknownUnit { step, unit: *unit });
                    }
                }
                ScriptStep::Attack { unit, attack, .. } => {
                    if !known_unit(*unit) {
                        return Err(ScenarioError::UnknownUnit { step, unit: *unit });
                    }
                    if !self.attacks.contains_key(attack) {
                        return Err(ScenarioError::UnknownAttack {
                            step,
                            name: attack.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// A two-unit duel across a hazard strip, with a short script.
    #[must_use]
    pub fn duel() -> Self {
        let mut attacks = BTreeMap::new();
        attacks.insert("Slash".to_string(), Attack::melee("Slash", 1, 3));
        attacks.insert(
            "Firebolt".to_string(),
            Attack::melee("Firebolt", 3, 2)
                .with_hit_percent(75)
                .with_element(ElementProfile::plain(Element::Fire).strong_against(Element::Earth)),
        );

        Self {
            name: "Duel".to_string(),
            description: "One fighter per side, an oil strip between them".to_string(),
            grid: GridSetup {
                width: 6,
                height: 3,
                default_weight: 1,
                weights: vec![WeightOverride {
                    x: 2,
                    y: 2,
                    weight: 0,
                }],
            },
            toppings: vec![
                ToppingPlacement {
                    x: 2,
                    y: 1,
                    kind: ToppingKind::Oil,
                    damage: None,
                },
                ToppingPlacement {
                    x: 3,
                    y: 1,
                    kind: ToppingKind::Oil,
                    damage: None,
                },
                ToppingPlacement {
                    x: 3,
                    y: 0,
                    kind: ToppingKind::Obstacle,
                    damage: None,
                },
            ],
            units: vec![
                UnitPlacement {
                    name: "Pyromancer".to_string(),
                    team: Team::Player,
                    element: Element::Fire,
                    health: 12,
                    attack: 2,
                    movement: 3,
                    x: 0,
                    y: 1,
                },
                UnitPlacement {
                    name: "Golem".to_string(),
                    team: Team::Ai,
                    element: Element::Earth,
                    health: 16,
                    attack: 1,
                    movement: 2,
                    x: 5,
                    y: 1,
                },
            ],
            attacks,
            rules: RulesConfig::default(),
            script: vec![
                ScriptStep::StartTurn,
                ScriptStep::Attack {
                    unit: 1,
                    attack: "Firebolt".to_string(),
                    x: 2,
                    y: 1,
                },
                ScriptStep::Move { unit: 1, x: 1, y: 0 },
                ScriptStep::StartTurn,
                ScriptStep::Move { unit: 2, x: 4, y: 1 },
                ScriptStep::StartTurn,
                ScriptStep::Move { unit: 1, x: 2, y: 0 },
                ScriptStep::Attack {
                    unit: 1,
                    attack: "Firebolt".to_string(),
                    x: 4,
                    y: 1,
                },
                ScriptStep::EndTurn,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL: &str = r#"
        (
            name: "Corridor",
            grid: (
                width: 4,
                height: 2,
                weights: [(x: 1, y: 1, weight: 0), (x: 2, y: 0, weight: 3)],
            ),
            toppings: [
                (x: 3, y: 1, kind: Hazard, damage: Some(2)),
                (x: 1, y: 0, kind: Oil),
            ],
            units: [
                (name: "Knight", team: Player, health: 10, attack: 2, movement: 4, x: 0, y: 0),
                (name: "Imp", team: Ai, element: Fire, health: 5, movement: 3, x: 3, y: 0),
            ],
            attacks: {
                "Slash": (name: "Slash", range: 1, hit_chance: 1.0, damage: 3),
            },
            script: [
                StartTurn,
                Move(unit: 1, x: 2, y: 0),
                Attack(unit: 1, attack: "Slash", x: 3, y: 0),
                EndTurn,
            ],
        )
    "#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_ron_str(SMALL).unwrap();
        assert_eq!(scenario.name, "Corridor");
        assert_eq!(scenario.grid.default_weight, 1);
        assert_eq!(scenario.units.len(), 2);
        assert_eq!(scenario.units[1].element, Element::Fire);
        assert_eq!(scenario.attacks["Slash"].area, vec![Coord::ZERO]);
        assert_eq!(scenario.script.len(), 4);
        assert_eq!(scenario.rules, RulesConfig::default());
    }

    #[test]
    fn test_build_battle() {
        let scenario = Scenario::from_ron_str(SMALL).unwrap();
        let battle = scenario.build_battle().unwrap();

        let grid = battle.grid();
        assert_eq!(grid.tile(Coord::new(1, 1)).map(|t| t.weight()), Some(0));
        assert_eq!(grid.tile(Coord::new(2, 0)).map(|t| t.weight()), Some(3));
        assert!(matches!(
            grid.topping_at(Coord::new(3, 1)).map(|t| t.topping),
            Some(Topping::HazardField(HazardField {
                damage_per_turn: 2,
                ..
            }))
        ));
        assert_eq!(battle.units().len(), 2);
        assert_eq!(grid.occupant(Coord::new(3, 0)), Some(UnitId(2)));
        assert_eq!(battle.sink().len(), 2);
    }

    #[test]
    fn test_spawn_on_blocked_tile_fails() {
        let mut scenario = Scenario::from_ron_str(SMALL).unwrap();
        scenario.units[0].x = 1;
        scenario.units[0].y = 1;
        assert!(matches!(
            scenario.build_battle(),
            Err(ScenarioError::Setup(GameError::TileBlocked(_)))
        ));
    }

    #[test]
    fn test_validate_script() {
        let mut scenario = Scenario::from_ron_str(SMALL).unwrap();
        assert!(scenario.validate_script().is_ok());

        scenario.script.push(ScriptStep::Attack {
            unit: 1,
            attack: "Fireball".to_string(),
            x: 0,
            y: 0,
        });
        assert!(matches!(
            scenario.validate_script(),
            Err(ScenarioError::UnknownAttack { step: 4, .. })
        ));

        scenario.script.pop();
        scenario.script.push(ScriptStep::Move { unit: 3, x: 0, y: 0 });
        assert!(matches!(
            scenario.validate_script(),
            Err(ScenarioError::UnknownUnit { step: 4, unit: 3 })
        ));
    }

    #[test]
    fn test_duel_round_trips_through_ron() {
        let duel = Scenario::duel();
        let text = ron::ser::to_string_pretty(&duel, ron::ser::PrettyConfig::default()).unwrap();
        let parsed = Scenario::from_ron_str(&text).unwrap();
        assert_eq!(parsed.script, duel.script);
        assert!(parsed.build_battle().is_ok());
        assert!(parsed.validate_script().is_ok());
    }

    #[test]
    fn test_fractional_hit_chance_and_bad_rules() {
        let text = SMALL.replace("hit_chance: 1.0", "hit_chance: 0.125");
        let scenario = Scenario::from_ron_str(&text).unwrap();
        assert_eq!(scenario.attacks["Slash"].hit_chance, Fixed::from_num(0.125));

        let text = SMALL.replace("hit_chance: 1.0", "hit_chance: 1.5");
        assert!(matches!(
            Scenario::from_ron_str(&text),
            Err(ScenarioError::ParseError(_))
        ));

        let text = SMALL.replace(
            "script: [",
            "rules: (balance: (strong_percent: 3000000000)),\n            script: [",
        );
        assert!(matches!(
            Scenario::from_ron_str(&text),
            Err(ScenarioError::Setup(GameError::InvalidConfig(_)))
        ));

        let mut scenario = Scenario::from_ron_str(SMALL).unwrap();
        scenario.rules.balance.weak_percent = u32::MAX;
        assert!(matches!(
            scenario.build_battle(),
            Err(ScenarioError::Setup(GameError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/nonexistent/scenario.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
