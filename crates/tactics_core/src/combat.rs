//! Attack definitions and attack resolution.
//!
//! Resolution order for a legal attack:
//! 1. consume the attacker's attack permission,
//! 2. roll to hit,
//! 3. rotate the area pattern onto the target and collect affected tiles,
//! 4. schedule every linked topping, then trigger each one still in place,
//! 5. publish [`GameEvent::UnitAttacked`] with all pending damage,
//! 6. apply damage, then remove and announce each dead unit.

use std::collections::HashSet;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::Battle;
use crate::coord::{Coord, Rotation};
use crate::element::{Effectiveness, ElementProfile};
use crate::events::{EventSink, GameEvent};
use crate::grid::Grid;
use crate::math::{percent, round_to_u32, unit_sample, Fixed};
use crate::topping::{collect_linked, AttackReaction, ToppingBehavior};
use crate::unit::UnitId;

/// A named attack a unit can perform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attack {
    /// Display name, echoed in events.
    pub name: String,
    /// Maximum Manhattan distance to the target. Zero targets the attacker's own tile.
    pub range: u32,
    /// Probability of hitting, in `[0, 1]`.
    #[serde(with = "crate::math::probability_serde")]
    pub hit_chance: Fixed,
    /// Base damage, added to the attacker's attack value.
    pub damage: u32,
    /// Element and type matchups.
    #[serde(default)]
    pub element: ElementProfile,
    /// Affected tiles relative to the target, in the canonical "up" orientation.
    #[serde(default = "default_area")]
    pub area: Vec<Coord>,
}

fn default_area() -> Vec<Coord> {
    vec![Coord::ZERO]
}

impl Attack {
    /// Single-tile attack that always hits.
    #[must_use]
    pub fn melee(name: impl Into<String>, range: u32, damage: u32) -> Self {
        Self {
            name: name.into(),
            range,
            hit_chance: Fixed::ONE,
            damage,
            element: ElementProfile::default(),
            area: default_area(),
        }
    }

    /// Builder method to set the element profile.
    #[must_use]
    pub fn with_element(mut self, element: ElementProfile) -> Self {
        self.element = element;
        self
    }

    /// Builder method to set the area pattern.
    #[must_use]
    pub fn with_area(mut self, area: Vec<Coord>) -> Self {
        self.area = area;
        self
    }

    /// Builder method to set the hit probability, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_hit_chance(mut self, hit_chance: Fixed) -> Self {
        self.hit_chance = hit_chance.clamp(Fixed::ZERO, Fixed::ONE);
        self
    }

    /// Builder method to set the hit chance in whole percent.
    #[must_use]
    pub fn with_hit_percent(self, percent_chance: u8) -> Self {
        self.with_hit_chance(percent(u32::from(percent_chance)))
    }
}

/// Damage recorded against one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hit {
    /// Victim.
    pub unit: UnitId,
    /// Damage dealt.
    pub damage: u32,
    /// Type matchup of the attack against the victim.
    pub effectiveness: Effectiveness,
}

/// What a resolved attack did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    /// Attacking unit.
    pub source: UnitId,
    /// Targeted tile, after range-zero retargeting.
    pub target: Coord,
    /// Whether the hit roll succeeded.
    pub hit: bool,
    /// Units damaged.
    pub victims: Vec<Hit>,
    /// Tiles whose terrain effect reacted.
    pub triggered: Vec<Coord>,
    /// Units killed by this attack.
    pub deaths: Vec<UnitId>,
}

/// Integer damage: `round((attack_value + base_damage) * modifier)`,
/// rounding halves away from zero.
#[must_use]
pub fn calculate_damage(attack_value: u32, base_damage: u32, modifier: Fixed) -> u32 {
    let raw = Fixed::saturating_from_num(attack_value.saturating_add(base_damage));
    round_to_u32(raw.saturating_mul(modifier))
}

/// Absolute tiles covered by an area pattern aimed from `origin` at `target`.
///
/// The pattern is rotated to face the snapped direction from origin to
/// target, then translated onto the target. Out-of-bounds tiles are dropped
/// and duplicates removed, keeping pattern order.
#[must_use]
pub fn attack_area(grid: &Grid, origin: Coord, target: Coord, pattern: &[Coord]) -> Vec<Coord> {
    let rotation = Rotation::facing(target - origin);
    let mut seen = HashSet::new();
    pattern
        .iter()
        .map(|&offset| target + rotation.apply(offset))
        .filter(|&coord| grid.in_bounds(coord) && seen.insert(coord))
        .collect()
}

/// Resolve `attack` by `source` against the `target` tile.
///
/// Returns `None`, without touching any state, when the attack is not legal:
/// the battle is over, the source is dead or has already attacked, or the
/// target is out of bounds or out of range.
///
/// # Panics
///
/// Panics if `source` is not a unit of this battle.
pub fn resolve_attack<S, R>(
    battle: &mut Battle<S>,
    source: UnitId,
    target: Coord,
    attack: &Attack,
    rng: &mut R,
) -> Option<AttackOutcome>
where
    S: EventSink,
    R: RngCore + ?Sized,
{
    let attacker = battle.expect_unit(source);
    let (attack_value, origin) = match check_attack(battle, source, target, attack) {
        Ok(origin) => (attacker.attack, origin),
        Err(reason) => {
            debug!(unit = %source, %target, attack = %attack.name, reason, "attack rejected");
            return None;
        }
    };
    let target = if attack.range == 0 { origin } else { target };

    battle.units.expect_mut(source).can_attack = false;

    let roll = unit_sample(rng.next_u32());
    if roll > attack.hit_chance {
        debug!(unit = %source, %target, attack = %attack.name, %roll, "attack missed");
        battle.sink.publish(GameEvent::UnitAttacked {
            source,
            target,
            attack: attack.name.clone(),
            hit: false,
            victims: Vec::new(),
            triggered: Vec::new(),
        });
        return Some(AttackOutcome {
            source,
            target,
            hit: false,
            victims: Vec::new(),
            triggered: Vec::new(),
            deaths: Vec::new(),
        });
    }

    let area = attack_area(&battle.grid, origin, target, &attack.area);
    let victims = collect_victims(battle, &area, attack_value, attack);
    let triggered = trigger_toppings(battle, &area, attack);

    battle.sink.publish(GameEvent::UnitAttacked {
        source,
        target,
        attack: attack.name.clone(),
        hit: true,
        victims: victims.clone(),
        triggered: triggered.clone(),
    });

    for hit in &victims {
        battle.units.expect_mut(hit.unit).lose_health(hit.damage);
    }
    let victim_ids: Vec<UnitId> = victims.iter().map(|hit| hit.unit).collect();
    let deaths = battle.resolve_deaths(&victim_ids);
    battle.check_game_over();

    Some(AttackOutcome {
        source,
        target,
        hit: true,
        victims,
        triggered,
        deaths,
    })
}

/// Check attack preconditions. Returns the attacker's tile on success.
fn check_attack<S: EventSink>(
    battle: &Battle<S>,
    source: UnitId,
    target: Coord,
    attack: &Attack,
) -> Result<Coord, &'static str> {
    if battle.is_over() {
        return Err("battle is over");
    }
    let attacker = battle.expect_unit(source);
    if !attacker.is_alive() {
        return Err("attacker is dead");
    }
    let Some(origin) = attacker.position() else {
        return Err("attacker is not on the grid");
    };
    if !attacker.can_attack {
        return Err("attack already used this turn");
    }
    if attack.range == 0 {
        return Ok(origin);
    }
    if !battle.grid.in_bounds(target) {
        return Err("target out of bounds");
    }
    if origin.manhattan_distance(target) > attack.range {
        return Err("target out of range");
    }
    Ok(origin)
}

/// Record pending damage for every living unit in the area.
fn collect_victims<S: EventSink>(
    battle: &Battle<S>,
    area: &[Coord],
    attack_value: u32,
    attack: &Attack,
) -> Vec<Hit> {
    area.iter()
        .filter_map(|&coord| battle.grid.occupant(coord))
        .filter_map(|id| battle.units.get(id))
        .filter(|unit| unit.is_alive())
        .map(|unit| {
            let modifier = attack
                .element
                .modifier_against(unit.element, &battle.rules.balance);
            Hit {
                unit: unit.id,
                damage: calculate_damage(attack_value, attack.damage, modifier),
                effectiveness: Effectiveness::from_modifier(modifier),
            }
        })
        .collect()
}

/// Schedule every topping linked to the area, then trigger each one whose
/// tile still holds the same instance.
fn trigger_toppings<S: EventSink>(battle: &mut Battle<S>, area: &[Coord], attack: &Attack) -> Vec<Coord> {
    let element = attack.element.element;
    let mut visited = HashSet::new();
    let mut scheduled = Vec::new();
    for &coord in area {
        collect_linked(&battle.grid, coord, element, &mut visited, &mut scheduled);
    }

    let mut triggered = Vec::with_capacity(scheduled.len());
    for pending in scheduled {
        let Some(placed) = battle.grid.topping_at(pending.coord) else {
            continue;
        };
        if placed.id != pending.id {
            debug!(coord = %pending.coord, "topping changed before its turn, skipped");
            continue;
        }

        let reaction = placed.topping.on_attack_effect(attack);
        debug!(coord = %pending.coord, ?reaction, "topping triggered");
        match reaction {
            AttackReaction::Keep => {}
            AttackReaction::Remove => {
                battle.grid.remove_topping(pending.coord);
            }
            AttackReaction::Replace(replacement) => {
                if let Err(err) = battle.grid.place_topping(pending.coord, replacement) {
                    panic!("scheduled topping tile became invalid: {err}");
                }
            }
        }
        triggered.push(pending.coord);
    }
    triggered
}
