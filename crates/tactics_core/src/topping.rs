//! Terrain effects ("toppings") and their propagation across linked tiles.
//!
//! Every variant is a flat data struct implementing [`ToppingBehavior`];
//! [`Topping`] is the closed set the grid stores. Variants never mutate the
//! grid themselves. They describe what should happen and the caller applies
//! it, so a variant cannot alias the tile that owns it.

use std::collections::HashSet;
use std::mem;

use serde::{Deserialize, Serialize};

use crate::combat::Attack;
use crate::coord::Coord;
use crate::element::Element;
use crate::grid::Grid;
use crate::unit::Unit;

/// Identity of one placed effect instance. Replacing an effect yields a new ID.
pub type ToppingId = u64;

/// Result of a unit ending its turn on a topping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StayEffect {
    /// Damage dealt to the standing unit.
    pub damage: u32,
}

/// What an attack does to the topping it hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackReaction {
    /// The effect is unaffected.
    Keep,
    /// The effect is destroyed and the tile left bare.
    Remove,
    /// The effect turns into a different one.
    Replace(Topping),
}

/// Capabilities every terrain effect provides.
pub trait ToppingBehavior {
    /// Whether units are stopped from entering the tile.
    fn is_blocking(&self) -> bool;

    /// Effect on a unit that ends its turn on the tile.
    fn on_stay_effect(&self, unit: &Unit) -> StayEffect;

    /// Reaction to being hit by an attack.
    fn on_attack_effect(&self, attack: &Attack) -> AttackReaction;

    /// Whether ordinary attacks spread into same-variant neighbours.
    fn is_linked(&self) -> bool;

    /// Whether fire attacks spread into same-variant neighbours.
    fn is_linked_for_fire(&self) -> bool;
}

/// Breakable obstacle. Blocks movement; any attack destroys it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Obstacle;

impl ToppingBehavior for Obstacle {
    fn is_blocking(&self) -> bool {
        true
    }

    // Nothing can stand here.
    fn on_stay_effect(&self, _unit: &Unit) -> StayEffect {
        StayEffect::default()
    }

    fn on_attack_effect(&self, _attack: &Attack) -> AttackReaction {
        AttackReaction::Remove
    }

    fn is_linked(&self) -> bool {
        false
    }

    fn is_linked_for_fire(&self) -> bool {
        false
    }
}

/// Burning field. Passable, but hurts whoever stays on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardField {
    /// Damage dealt to a unit ending its turn on the field.
    pub damage_per_turn: u32,
    /// Linkage for ordinary attacks.
    pub linked: bool,
    /// Linkage for fire attacks.
    pub linked_for_fire: bool,
}

impl Default for HazardField {
    fn default() -> Self {
        Self {
            damage_per_turn: 1,
            linked: true,
            linked_for_fire: true,
        }
    }
}

impl ToppingBehavior for HazardField {
    fn is_blocking(&self) -> bool {
        false
    }

    fn on_stay_effect(&self, _unit: &Unit) -> StayEffect {
        StayEffect {
            damage: self.damage_per_turn,
        }
    }

    fn on_attack_effect(&self, _attack: &Attack) -> AttackReaction {
        AttackReaction::Keep
    }

    fn is_linked(&self) -> bool {
        self.linked
    }

    fn is_linked_for_fire(&self) -> bool {
        self.linked_for_fire
    }
}

/// Unlit oil. Harmless until a fire attack ignites it into a [`HazardField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct OilSlick {
    /// Hazard the oil turns into once ignited.
    pub ignites_into: HazardField,
}

impl Default for OilSlick {
    fn default() -> Self {
        Self {
            ignites_into: HazardField::default(),
        }
    }
}

impl ToppingBehavior for OilSlick {
    fn is_blocking(&self) -> bool {
        false
    }

    fn on_stay_effect(&self, _unit: &Unit) -> StayEffect {
        StayEffect::default()
    }

    fn on_attack_effect(&self, attack: &Attack) -> AttackReaction {
        if attack.element.element.is_fire() {
            AttackReaction::Replace(Topping::HazardField(self.ignites_into))
        } else {
            AttackReaction::Keep
        }
    }

    fn is_linked(&self) -> bool {
        false
    }

    fn is_linked_for_fire(&self) -> bool {
        true
    }
}

/// Every terrain effect a tile can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topping {
    /// See [`Obstacle`].
    Obstacle(Obstacle),
    /// See [`HazardField`].
    HazardField(HazardField),
    /// See [`OilSlick`].
    OilSlick(OilSlick),
}

impl Topping {
    fn behavior(&self) -> &dyn ToppingBehavior {
        match self {
            Self::Obstacle(inner) => inner,
            Self::HazardField(inner) => inner,
            Self::OilSlick(inner) => inner,
        }
    }

    /// Whether both effects are the same concrete variant, ignoring their data.
    #[must_use]
    pub fn same_variant(&self, other: &Topping) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    /// Linkage flag that applies to an attack of the given element.
    #[must_use]
    pub fn linked_for(&self, element: Element) -> bool {
        if element.is_fire() {
            self.is_linked_for_fire()
        } else {
            self.is_linked()
        }
    }
}

impl ToppingBehavior for Topping {
    fn is_blocking(&self) -> bool {
        self.behavior().is_blocking()
    }

    fn on_stay_effect(&self, unit: &Unit) -> StayEffect {
        self.behavior().on_stay_effect(unit)
    }

    fn on_attack_effect(&self, attack: &Attack) -> AttackReaction {
        self.behavior().on_attack_effect(attack)
    }

    fn is_linked(&self) -> bool {
        self.behavior().is_linked()
    }

    fn is_linked_for_fire(&self) -> bool {
        self.behavior().is_linked_for_fire()
    }
}

impl From<Obstacle> for Topping {
    fn from(value: Obstacle) -> Self {
        Self::Obstacle(value)
    }
}

impl From<HazardField> for Topping {
    fn from(value: HazardField) -> Self {
        Self::HazardField(value)
    }
}

impl From<OilSlick> for Topping {
    fn from(value: OilSlick) -> Self {
        Self::OilSlick(value)
    }
}

/// A topping instance as stored on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlacedTopping {
    /// Instance identity.
    pub id: ToppingId,
    /// The effect itself.
    pub topping: Topping,
}

/// A tile scheduled to react to an attack, remembered with the exact effect
/// instance that was there when it was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggeredTopping {
    /// Tile position.
    pub coord: Coord,
    /// Effect instance found on the tile.
    pub id: ToppingId,
}

/// Collect every topping connected to `origin` through same-variant,
/// link-enabled neighbours.
///
/// `visited` is shared across calls so that one attack never schedules a
/// tile twice even when its area touches the same region from several
/// tiles. Each coordinate is visited at most once, so the walk takes at
/// most `width * height` steps.
pub fn collect_linked(
    grid: &Grid,
    origin: Coord,
    element: Element,
    visited: &mut HashSet<Coord>,
    out: &mut Vec<TriggeredTopping>,
) {
    let mut stack = vec![origin];

    while let Some(coord) = stack.pop() {
        let Some(placed) = grid.topping_at(coord) else {
            continue;
        };
        if !visited.insert(coord) {
            continue;
        }

        out.push(TriggeredTopping {
            coord,
            id: placed.id,
        });

        if !placed.topping.linked_for(element) {
            continue;
        }

        // Reverse so the first neighbour is expanded first.
        for neighbor in coord.cardinal_neighbors().into_iter().rev() {
            if visited.contains(&neighbor) {
                continue;
            }
            let same = grid
                .topping_at(neighbor)
                .is_some_and(|other| other.topping.same_variant(&placed.topping));
            if same {
                stack.push(neighbor);
            }
        }
    }
}

/// Convenience wrapper around [`collect_linked`] with a fresh visited set.
#[must_use]
pub fn linked_toppings(grid: &Grid, origin: Coord, element: Element) -> Vec<TriggeredTopping> {
    let mut visited = HashSet::new();
    let mut out = Vec::new();
    collect_linked(grid, origin, element, &mut visited, &mut out);
    out
}
