//! Headless battle runner implementation.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tactics_core::pathfinding::PathError;
use tactics_core::prelude::*;
use std::result::Result;
use tracing::{debug, info, warn};

use crate::protocol::{Command, RangeTile, Response, UnitState};
use crate::scenario::{Scenario, ScenarioError, ScriptStep};

/// Drives one battle from protocol commands.
///
/// The runner owns the battle, the scenario's attack library and the seeded
/// RNG used for hit rolls, so two runners built from the same scenario and
/// seed answer the same command stream identically.
#[derive(Debug)]
pub struct HeadlessRunner {
    scenario_name: String,
    battle: Battle<EventLog>,
    attacks: BTreeMap<String, Attack>,
    rng: ChaCha8Rng,
}

impl HeadlessRunner {
    /// Build the scenario's battle and seed the hit-roll RNG.
    ///
    /// Spawn events are discarded; the ready line reports the unit count.
    pub fn new(scenario: &Scenario, seed: u64) -> Result<Self, ScenarioError> {
        let mut battle = scenario.build_battle()?;
        battle.sink_mut().drain();
        info!(scenario = %scenario.name, seed, units = battle.units().len(), "battle ready");

        Ok(Self {
            scenario_name: scenario.name.clone(),
            battle,
            attacks: scenario.attacks.clone(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// The battle being driven.
    #[must_use]
    pub fn battle(&self) -> &Battle<EventLog> {
        &self.battle
    }

    /// Handle one command and return its response.
    pub fn handle(&mut self, cmd: Command) -> Response {
        let cmd_name = cmd.name();

        match cmd {
            Command::StartTurn => {
                self.battle.start_next_turn();
                self.events(cmd_name)
            }

            Command::EndTurn => {
                self.battle.end_turn();
                self.events(cmd_name)
            }

            Command::Move { unit, x, y } => {
                let Some(id) = self.known_unit(unit) else {
                    return Response::error(format!("Unit {unit} not found"), Some(cmd_name));
                };
                match self.battle.execute_move(id, Coord::new(x, y)) {
                    Some(_) => self.events(cmd_name),
                    None => Response::rejected(cmd_name),
                }
            }

            Command::Attack { unit, attack, x, y } => {
                let Some(id) = self.known_unit(unit) else {
                    return Response::error(format!("Unit {unit} not found"), Some(cmd_name));
                };
                let Some(attack) = self.attacks.get(&attack) else {
                    return Response::error(format!("Attack {attack:?} not found"), Some(cmd_name));
                };
                match self
                    .battle
                    .execute_attack(id, Coord::new(x, y), attack, &mut self.rng)
                {
                    Some(_) => self.events(cmd_name),
                    None => Response::rejected(cmd_name),
                }
            }

            Command::Path {
                from_x,
                from_y,
                to_x,
                to_y,
            } => {
                let from = Coord::new(from_x, from_y);
                let to = Coord::new(to_x, to_y);
                match self.battle.compute_path(from, to) {
                    Ok(path) => Response::Path {
                        tiles: path.tiles.iter().map(|c| (c.x, c.y)).collect(),
                        cost: path.cost,
                    },
                    Err(err) => Response::NoPath {
                        reason: err.to_string(),
                    },
                }
            }

            Command::Range { x, y, range } => {
                let origin = Coord::new(x, y);
                match self.battle.compute_range_costs(origin, range) {
                    Ok(matrix) => Response::Range {
                        origin: (x, y),
                        tiles: matrix
                            .reachable()
                            .map(|(c, cost)| RangeTile { x: c.x, y: c.y, cost })
                            .collect(),
                    },
                    Err(err @ PathError::OutOfBounds(_)) => {
                        Response::error(err.to_string(), Some(cmd_name))
                    }
                    Err(err) => Response::NoPath {
                        reason: err.to_string(),
                    },
                }
            }

            Command::Query => self.state(),

            Command::Hash => Response::StateHash {
                round: self.battle.round(),
                hash: self.battle.state_hash(),
            },

            Command::Quit => Response::Bye,
        }
    }

    /// Run the JSON lines loop until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        let ready = Response::ready(&self.scenario_name, self.battle.units().len());
        output.write_all(ready.to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match Command::from_json(line) {
                Ok(cmd) => {
                    debug!(cmd = cmd.name(), "command received");
                    let quit = matches!(cmd, Command::Quit);
                    let response = self.handle(cmd);
                    if quit {
                        output.write_all(response.to_json_line().as_bytes())?;
                        output.flush()?;
                        return Ok(());
                    }
                    response
                }
                Err(e) => {
                    warn!("Parse error: {}", e);
                    Response::error(format!("Parse error: {e}"), None)
                }
            };

            output.write_all(response.to_json_line().as_bytes())?;
            output.flush()?;
        }

        output.write_all(Response::Bye.to_json_line().as_bytes())?;
        output.flush()
    }

    /// Run the scenario on stdin/stdout.
    pub fn run_stdio(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }

    /// Apply a scripted step.
    pub fn apply_step(&mut self, step: &ScriptStep) -> Response {
        self.handle(Command::from(step.clone()))
    }

    /// Map a wire unit ID onto a unit of this battle.
    ///
    /// The engine treats unknown IDs as a caller bug, so they are filtered here.
    fn known_unit(&self, unit: u32) -> Option<UnitId> {
        let id = UnitId(unit);
        self.battle.units().contains(id).then_some(id)
    }

    fn events(&mut self, cmd: &str) -> Response {
        Response::Events {
            cmd: cmd.to_string(),
            events: self.battle.sink_mut().drain(),
        }
    }

    fn state(&self) -> Response {
        Response::State {
            round: self.battle.round(),
            active: self.battle.active_unit().map(|id| id.0),
            outcome: self.battle.outcome(),
            units: self.battle.units().iter().map(UnitState::from).collect(),
            hash: self.battle.state_hash(),
        }
    }
}

impl From<ScriptStep> for Command {
    fn from(step: ScriptStep) -> Self {
        match step {
            ScriptStep::StartTurn => Self::StartTurn,
            ScriptStep::EndTurn => Self::EndTurn,
            ScriptStep::Move { unit, x, y } => Self::Move { unit, x, y },
            ScriptStep::Attack { unit, attack, x, y } => Self::Attack { unit, attack, x, y },
        }
    }
}
