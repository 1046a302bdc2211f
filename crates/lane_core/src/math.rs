//! Fixed-point math utilities for deterministic simulation.
//!
//! The battle lane is one-dimensional, so every positional quantity is a
//! single [`Fixed`] scalar. Floating-point operations can produce different
//! results on different CPUs; fixed-point keeps replays bit-identical.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Clamp a frame delta to the non-negative range.
///
/// Frame drivers occasionally report a negative delta after a clock
/// adjustment; the simulation treats that as a zero-length frame.
#[must_use]
pub fn frame_delta(delta: Fixed) -> Fixed {
    if delta < Fixed::ZERO {
        Fixed::ZERO
    } else {
        delta
    }
}

/// Move `value` toward zero by `step`, never overshooting.
#[must_use]
pub fn decay_toward_zero(value: Fixed, step: Fixed) -> Fixed {
    if value <= step {
        Fixed::ZERO
    } else {
        value - step
    }
}
