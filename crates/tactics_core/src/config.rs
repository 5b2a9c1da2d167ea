//! Tunable rules configuration.
//!
//! All structs are plain serde data with defaults, so a RON document only
//! needs to list the values it overrides:
//!
//! ```ron
//! RulesConfig(
//!     pathfinder: PathfinderConfig(
//!         movement: EightWay,
//!         heuristic: DiagonalShortcut,
//!         search_limit: 500,
//!     ),
//!     balance: BalanceConfig(strong_percent: 200),
//! )
//! ```
//!
//! **Note:** This module contains no IO - callers read the text themselves.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::pathfinding::PathfinderConfig;

/// Largest accepted damage multiplier, in percent.
pub const MAX_BALANCE_PERCENT: u32 = 1000;

/// Game-balance parameters for damage resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    /// Damage multiplier, in percent, when the attack is strong against the target.
    pub strong_percent: u32,
    /// Damage multiplier, in percent, when the attack is weak against the target.
    pub weak_percent: u32,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            strong_percent: 150,
            weak_percent: 50,
        }
    }
}

/// Every tunable the rules engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Search behaviour for paths and movement ranges.
    pub pathfinder: PathfinderConfig,
    /// Damage multipliers.
    pub balance: BalanceConfig,
}

impl RulesConfig {
    /// Parse a configuration from RON text and validate it.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|err| GameError::DataParseError {
            source_name: "rules".into(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is in the range the engine can compute with.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("strong_percent", self.balance.strong_percent),
            ("weak_percent", self.balance.weak_percent),
        ] {
            if value > MAX_BALANCE_PERCENT {
                return Err(GameError::InvalidConfig(format!(
                    "{name} is {value}, the maximum is {MAX_BALANCE_PERCENT}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinding::{Heuristic, MovementModel};

    #[test]
    fn test_defaults() {
        let config = RulesConfig::default();
        assert_eq!(config.balance.strong_percent, 150);
        assert_eq!(config.balance.weak_percent, 50);
        assert_eq!(config.pathfinder.search_limit, 2000);
    }

    #[test]
    fn test_partial_ron_overrides() {
        let config = RulesConfig::from_ron_str(
            "RulesConfig(pathfinder: PathfinderConfig(movement: EightWay, heuristic: DiagonalShortcut, search_limit: 500), balance: BalanceConfig(strong_percent: 200))",
        )
        .unwrap();

        assert_eq!(config.pathfinder.movement, MovementModel::EightWay);
        assert_eq!(config.pathfinder.heuristic, Heuristic::DiagonalShortcut);
        assert_eq!(config.pathfinder.search_limit, 500);
        assert_eq!(config.balance.strong_percent, 200);
        // Untouched fields keep their defaults
        assert_eq!(config.balance.weak_percent, 50);
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = RulesConfig::from_ron_str("()").unwrap();
        assert_eq!(config, RulesConfig::default());
    }

    #[test]
    fn test_oversized_balance_percent_is_rejected() {
        let result =
            RulesConfig::from_ron_str("RulesConfig(balance: BalanceConfig(strong_percent: 4000000000))");
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));

        let result = RulesConfig::from_ron_str("(balance: (weak_percent: 1001))");
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));

        let config = RulesConfig::from_ron_str("(balance: (strong_percent: 1000))").unwrap();
        assert_eq!(config.balance.strong_percent, MAX_BALANCE_PERCENT);
    }

    #[test]
    fn test_parse_error() {
        let result = RulesConfig::from_ron_str("RulesConfig(balance: 12");
        assert!(matches!(result, Err(GameError::DataParseError { .. })));
    }
}
