//! Castle master records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};

use super::unit_data::MAX_HEALTH;

/// Identifier of a castle type in the master data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CastleTypeId(pub u32);

impl fmt::Display for CastleTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "castle#{}", self.0)
    }
}

/// Data-driven castle definition.
///
/// Castles are stationary and never attack; they only need health.
///
/// # Example RON
///
/// ```ron
/// CastleMaster(
///     id: 1,
///     name: "castle.keep.name",
///     max_health: 1000,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastleMaster {
    /// Unique identifier for this castle type.
    pub id: CastleTypeId,

    /// Localization key for the castle's display name.
    pub name: String,

    /// Maximum health points.
    pub max_health: u32,
}

impl CastleMaster {
    /// Check the record for values the simulation cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidMasterData`] for a castle without health.
    pub fn validate(&self) -> Result<()> {
        if self.max_health == 0 {
            return Err(BattleError::InvalidMasterData {
                record: self.id.to_string(),
                reason: "max_health must be positive".to_string(),
            });
        }
        if self.max_health > MAX_HEALTH {
            return Err(BattleError::InvalidMasterData {
                record: self.id.to_string(),
                reason: "max_health must not exceed i32::MAX".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_castle(max_health: u32) -> CastleMaster {
        CastleMaster {
            id: CastleTypeId(1),
            name: "castle.test.name".to_string(),
            max_health,
        }
    }

    #[test]
    fn test_valid_castle_passes() {
        assert!(create_test_castle(1000).validate().is_ok());
        assert!(create_test_castle(MAX_HEALTH).validate().is_ok());
    }

    #[test]
    fn test_zero_health_rejected() {
        assert!(create_test_castle(0).validate().is_err());
    }

    #[test]
    fn test_oversized_health_rejected() {
        let err = create_test_castle(MAX_HEALTH + 1).validate().unwrap_err();
        assert!(err.to_string().contains("castle#1"));
    }
}
