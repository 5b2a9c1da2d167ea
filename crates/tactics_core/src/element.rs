//! Elemental affiliations and type effectiveness.

use serde::{Deserialize, Serialize};

use crate::config::BalanceConfig;
use crate::math::{percent, Fixed};

/// Elemental affiliation of a unit or an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Element {
    /// No affiliation.
    #[default]
    Neutral,
    /// Fire. Spreads through toppings that are linked for fire.
    Fire,
    /// Water.
    Water,
    /// Earth.
    Earth,
    /// Air.
    Air,
}

impl Element {
    /// Whether this element uses the fire linkage rules for topping propagation.
    #[must_use]
    pub const fn is_fire(self) -> bool {
        matches!(self, Self::Fire)
    }
}

/// Element of an attack together with what it is strong and weak against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ElementProfile {
    /// The attack's own element.
    pub element: Element,
    /// Unit elements that take increased damage.
    #[serde(default)]
    pub strengths: Vec<Element>,
    /// Unit elements that take reduced damage.
    #[serde(default)]
    pub weaknesses: Vec<Element>,
}

impl ElementProfile {
    /// Profile with no strengths or weaknesses.
    #[must_use]
    pub const fn plain(element: Element) -> Self {
        Self {
            element,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
        }
    }

    /// Builder method to add an element this profile is strong against.
    #[must_use]
    pub fn strong_against(mut self, element: Element) -> Self {
        self.strengths.push(element);
        self
    }

    /// Builder method to add an element this profile is weak against.
    #[must_use]
    pub fn weak_against(mut self, element: Element) -> Self {
        self.weaknesses.push(element);
        self
    }

    /// Damage multiplier against a unit of the given element.
    ///
    /// Strong and weak matches apply multiplicatively, so an element listed
    /// in both lists ends up with the product of both factors.
    #[must_use]
    pub fn modifier_against(&self, target: Element, balance: &BalanceConfig) -> Fixed {
        let mut modifier = Fixed::ONE;
        if self.strengths.contains(&target) {
            modifier = modifier.saturating_mul(percent(balance.strong_percent));
        }
        if self.weaknesses.contains(&target) {
            modifier = modifier.saturating_mul(percent(balance.weak_percent));
        }
        modifier
    }
}

/// Coarse classification of a damage multiplier, reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effectiveness {
    /// Multiplier below one.
    Weak,
    /// Multiplier of exactly one.
    Neutral,
    /// Multiplier above one.
    Strong,
}

impl Effectiveness {
    /// Classify a damage multiplier.
    #[must_use]
    pub fn from_modifier(modifier: Fixed) -> Self {
        match modifier.cmp(&Fixed::ONE) {
            std::cmp::Ordering::Less => Self::Weak,
            std::cmp::Ordering::Equal => Self::Neutral,
            std::cmp::Ordering::Greater => Self::Strong,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_modifier() {
        let profile = ElementProfile::plain(Element::Water);
        let balance = BalanceConfig::default();
        assert_eq!(profile.modifier_against(Element::Earth, &balance), Fixed::ONE);
    }

    #[test]
    fn test_strong_and_weak_modifiers() {
        let balance = BalanceConfig::default();
        let water = ElementProfile::plain(Element::Water)
            .strong_against(Element::Fire)
            .weak_against(Element::Earth);

        assert_eq!(water.modifier_against(Element::Fire, &balance), Fixed::from_num(1.5));
        assert_eq!(water.modifier_against(Element::Earth, &balance), Fixed::from_num(0.5));
    }

    #[test]
    fn test_listed_in_both_multiplies() {
        let balance = BalanceConfig::default();
        let odd = ElementProfile::plain(Element::Air)
            .strong_against(Element::Earth)
            .weak_against(Element::Earth);
        assert_eq!(odd.modifier_against(Element::Earth, &balance), Fixed::from_num(0.75));
    }

    #[test]
    fn test_effectiveness_classification() {
        assert_eq!(Effectiveness::from_modifier(Fixed::from_num(1.5)), Effectiveness::Strong);
        assert_eq!(Effectiveness::from_modifier(Fixed::ONE), Effectiveness::Neutral);
        assert_eq!(Effectiveness::from_modifier(Fixed::from_num(0.75)), Effectiveness::Weak);
    }
}
