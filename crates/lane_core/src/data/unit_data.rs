//! Unit master records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::math::{fixed_serde, Fixed};

/// Largest `max_health` a record may carry. Health converts to [`Fixed`],
/// which has 31 integer bits.
pub const MAX_HEALTH: u32 = i32::MAX as u32;

/// Identifier of a unit type in the master data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitTypeId(pub u32);

impl fmt::Display for UnitTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Knockback behaviour of a unit type.
///
/// A knockback is triggered when a hit moves health across a multiple of
/// `health_interval × max_health` without killing the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnockBackStats {
    /// Fraction of max health between knockback thresholds, in `(0, 1)`.
    #[serde(with = "fixed_serde")]
    pub health_interval: Fixed,

    /// Length of the knockback window in frames.
    #[serde(with = "fixed_serde")]
    pub frames: Fixed,

    /// Push-back speed at full knockback rate, in lane units per frame.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
}

impl KnockBackStats {
    /// Check whether health going from `from` to `to` crosses a threshold.
    #[must_use]
    pub fn crosses_threshold(&self, from: u32, to: u32, max_health: u32) -> bool {
        if to >= from || to == 0 {
            return false;
        }
        let (Some(max), Some(from), Some(to)) = (
            Fixed::checked_from_num(max_health),
            Fixed::checked_from_num(from),
            Fixed::checked_from_num(to),
        ) else {
            return false;
        };
        let step = self.health_interval.saturating_mul(max);
        if step <= Fixed::ZERO {
            return false;
        }
        let band = |health: Fixed| health.saturating_div(step).saturating_ceil();
        band(to) < band(from)
    }

    /// Amount the knockback rate decays over `delta` frames.
    #[must_use]
    pub fn decay_step(&self, delta: Fixed) -> Fixed {
        delta.saturating_div(self.frames)
    }
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitMaster(
///     id: 1,
///     name: "unit.swordsman.name",
///     cost: 214748364800,       // Fixed-point for 50.0
///     max_health: 100,
///     power: 20,
///     speed: 4294967296,        // Fixed-point for 1.0
///     range: 42949672960,       // Fixed-point for 10.0
///     attack_interval: 128849018880, // Fixed-point for 30.0
///     knock_back: Some(KnockBackStats(
///         health_interval: 2147483648, // Fixed-point for 0.5
///         frames: 85899345920,         // Fixed-point for 20.0
///         speed: 8589934592,           // Fixed-point for 2.0
///     )),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMaster {
    /// Unique identifier for this unit type.
    pub id: UnitTypeId,

    /// Localization key for the unit's display name.
    pub name: String,

    /// Cost to deploy this unit.
    #[serde(with = "fixed_serde")]
    pub cost: Fixed,

    /// Maximum health points.
    pub max_health: u32,

    /// Damage dealt per hit.
    pub power: u32,

    /// Walking speed in lane units per frame.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,

    /// Engagement range in lane units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,

    /// Frames between two hits. Zero means a hit every frame.
    #[serde(with = "fixed_serde")]
    pub attack_interval: Fixed,

    /// Knockback behaviour (None for units that are never knocked back).
    #[serde(default)]
    pub knock_back: Option<KnockBackStats>,
}

impl UnitMaster {
    /// Check the record for values the simulation cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidMasterData`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(BattleError::InvalidMasterData {
                record: self.id.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.max_health == 0 {
            return fail("max_health must be positive");
        }
        if self.max_health > MAX_HEALTH {
            return fail("max_health must not exceed i32::MAX");
        }
        if self.cost < Fixed::ZERO {
            return fail("cost must not be negative");
        }
        if self.speed < Fixed::ZERO {
            return fail("speed must not be negative");
        }
        if self.range < Fixed::ZERO {
            return fail("range must not be negative");
        }
        if self.attack_interval < Fixed::ZERO {
            return fail("attack_interval must not be negative");
        }
        if let Some(knock_back) = &self.knock_back {
            if knock_back.health_interval <= Fixed::ZERO || knock_back.health_interval >= Fixed::ONE
            {
                return fail("knock_back.health_interval must be within (0, 1)");
            }
            if knock_back.frames <= Fixed::ZERO {
                return fail("knock_back.frames must be positive");
            }
            if knock_back.speed < Fixed::ZERO {
                return fail("knock_back.speed must not be negative");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_unit() -> UnitMaster {
        UnitMaster {
            id: UnitTypeId(1),
            name: "unit.test.name".to_string(),
            cost: Fixed::from_num(50),
            max_health: 100,
            power: 10,
            speed: Fixed::from_num(2),
            range: Fixed::from_num(5),
            attack_interval: Fixed::from_num(30),
            knock_back: Some(KnockBackStats {
                health_interval: Fixed::from_num(0.5),
                frames: Fixed::from_num(10),
                speed: Fixed::from_num(3),
            }),
        }
    }

    #[test]
    fn test_valid_unit_passes() {
        assert!(create_test_unit().validate().is_ok());
    }

    #[test]
    fn test_zero_health_rejected() {
        let mut unit = create_test_unit();
        unit.max_health = 0;
        assert!(matches!(
            unit.validate(),
            Err(BattleError::InvalidMasterData { .. })
        ));
    }

    #[test]
    fn test_oversized_health_rejected() {
        let mut unit = create_test_unit();
        unit.max_health = MAX_HEALTH;
        assert!(unit.validate().is_ok());

        unit.max_health = 3_000_000_000;
        assert!(matches!(
            unit.validate(),
            Err(BattleError::InvalidMasterData { .. })
        ));
    }

    #[test]
    fn test_knock_back_interval_bounds() {
        let mut unit = create_test_unit();
        if let Some(kb) = unit.knock_back.as_mut() {
            kb.health_interval = Fixed::ONE;
        }
        assert!(unit.validate().is_err());
    }

    #[test]
    fn test_threshold_crossing() {
        let kb = create_test_unit().knock_back.unwrap();
        // 100 -> 50 crosses the 50% line
        assert!(kb.crosses_threshold(100, 50, 100));
        // 60 -> 55 stays above it
        assert!(!kb.crosses_threshold(60, 55, 100));
        // 50 -> 40 is already below it
        assert!(!kb.crosses_threshold(50, 40, 100));
        // Lethal hits never knock back
        assert!(!kb.crosses_threshold(30, 0, 100));
        // Healing never knocks back
        assert!(!kb.crosses_threshold(40, 60, 100));
    }

    #[test]
    fn test_threshold_crossing_at_health_limits() {
        let kb = create_test_unit().knock_back.unwrap();
        assert!(kb.crosses_threshold(MAX_HEALTH, MAX_HEALTH / 2, MAX_HEALTH));
        assert!(!kb.crosses_threshold(MAX_HEALTH, MAX_HEALTH - 1000, MAX_HEALTH));
        // Out of range values never cross instead of overflowing
        assert!(!kb.crosses_threshold(3_000_000_000, 2_999_999_000, 3_000_000_000));
        assert!(!kb.crosses_threshold(3_000_000_000, 1, 3_000_000_000));
    }

    #[test]
    fn test_decay_step_saturates() {
        let kb = KnockBackStats {
            health_interval: Fixed::from_num(0.5),
            frames: Fixed::DELTA,
            speed: Fixed::ONE,
        };
        assert_eq!(kb.decay_step(Fixed::from_num(1_000_000)), Fixed::MAX);
    }

    #[test]
    fn test_ron_roundtrip_keeps_fixed_bits() {
        let unit = create_test_unit();
        let text = ron::to_string(&unit).unwrap();
        let parsed: UnitMaster = ron::from_str(&text).unwrap();
        assert_eq!(parsed, unit);
    }
}
