//! Outcome records and the sink they are published to.
//!
//! Events are immutable values. The engine publishes each one after the
//! state it describes is already consistent, and never reads anything back
//! from the sink.

use serde::{Deserialize, Serialize};

use crate::combat::Hit;
use crate::coord::Coord;
use crate::unit::{Team, UnitId};

/// How a battle ended, from the player team's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    /// Only player units remain.
    Victory,
    /// Only AI units remain.
    Defeat,
    /// Both sides were wiped out by the same action.
    Draw,
}

/// Something that happened in the battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A unit entered the grid.
    UnitSpawned {
        /// The new unit.
        unit: UnitId,
        /// Its side.
        team: Team,
        /// Spawn tile.
        position: Coord,
    },
    /// A unit's turn began and its resources were restored.
    TurnStarted {
        /// Active unit.
        unit: UnitId,
        /// Round counter, starting at 1.
        round: u32,
    },
    /// A unit walked a path.
    UnitMoved {
        /// Moving unit.
        unit: UnitId,
        /// Tiles walked, start included.
        path: Vec<Coord>,
        /// Movement points spent.
        cost: u32,
    },
    /// An attack was resolved. Damage in `victims` is not yet applied when
    /// this is published.
    UnitAttacked {
        /// Attacking unit.
        source: UnitId,
        /// Targeted tile.
        target: Coord,
        /// Attack name.
        attack: String,
        /// Whether the hit roll succeeded.
        hit: bool,
        /// Units about to take damage.
        victims: Vec<Hit>,
        /// Tiles whose terrain effect reacted.
        triggered: Vec<Coord>,
    },
    /// A unit ran out of health and left the grid.
    UnitDied {
        /// The dead unit.
        unit: UnitId,
    },
    /// A terrain effect acted on a unit ending its turn on it.
    StayEffectApplied {
        /// Affected unit.
        unit: UnitId,
        /// Tile the unit stands on.
        coord: Coord,
        /// Damage dealt.
        damage: u32,
    },
    /// One team has no living units left.
    GameOver {
        /// Result for the player team.
        outcome: GameOutcome,
    },
}

/// Fire-and-forget receiver of [`GameEvent`]s.
pub trait EventSink {
    /// Accept one event. Must not panic.
    fn publish(&mut self, event: GameEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn publish(&mut self, event: GameEvent) {
        (**self).publish(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn publish(&mut self, event: GameEvent) {
        (**self).publish(event);
    }
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&mut self, _event: GameEvent) {}
}

/// In-memory sink that keeps every event in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<GameEvent>,
}

impl EventLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far.
    #[must_use]
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Remove and return all events published so far.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of events held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventLog {
    fn publish(&mut self, event: GameEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_keeps_order() {
        let mut log = EventLog::new();
        log.publish(GameEvent::UnitDied { unit: UnitId(2) });
        log.publish(GameEvent::GameOver {
            outcome: GameOutcome::Victory,
        });

        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0], GameEvent::UnitDied { unit: UnitId(2) });

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_publish_through_reference() {
        fn emit(mut sink: impl EventSink) {
            sink.publish(GameEvent::UnitDied { unit: UnitId(1) });
        }

        let mut log = EventLog::new();
        emit(&mut log);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_json_shape() {
        let event = GameEvent::TurnStarted {
            unit: UnitId(3),
            round: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"turn_started","unit":3,"round":2}"#);
    }
}
