//! Fixed-point math utilities for deterministic rules resolution.
//!
//! Damage multipliers, hit chances and heuristic estimates are all
//! fractional. They use fixed-point arithmetic so that the same inputs
//! produce the same outcome on every platform.

use fixed::types::I32F32;

/// Fixed-point number type for all fractional rules math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for probabilities stored as fixed-point numbers.
///
/// Data files write a probability as a decimal in `[0, 1]` (`0.125`). It is
/// converted to [`Fixed`] once at load time, so every later comparison is
/// exact.
pub mod probability_serde {
    use super::Fixed;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a probability as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a decimal probability, rejecting values outside `[0, 1]`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(D::Error::custom(format!(
                "probability {value} is outside [0, 1]"
            )));
        }
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("probability {value} is not representable")))
    }
}

/// Convert an integer percentage into a fixed-point fraction (`150` -> `1.5`).
#[must_use]
pub fn percent(value: u32) -> Fixed {
    Fixed::saturating_from_num(value) / Fixed::from_num(100)
}

/// Interpret 32 random bits as a uniform sample in `[0, 1)`.
///
/// `I32F32` has exactly 32 fractional bits, so every `u32` maps to a
/// distinct value below one.
#[must_use]
pub fn unit_sample(bits: u32) -> Fixed {
    Fixed::from_bits(i64::from(bits))
}

/// Round to the nearest integer (halves away from zero) and clamp at zero.
#[must_use]
pub fn round_to_u32(value: Fixed) -> u32 {
    let rounded = value.round().to_num::<i64>();
    u32::try_from(rounded.max(0)).unwrap_or(u32::MAX)
}

/// Computes the square root of a fixed-point number using binary search.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}
