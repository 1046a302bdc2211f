//! Data structures for battle configuration.
//!
//! This module contains pure data structures that define unit and castle
//! master records and the battle setup. All structs are designed to be
//! deserialized from RON.
//!
//! **Note:** This module contains no IO - it only parses text it is handed.
//! File loading is handled by `lane_tools` or the embedding game.

mod battle_config;
mod castle_data;
mod unit_data;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use battle_config::{BattleConfig, EconomyConfig, SideConfig, WaveEntry};
pub use castle_data::{CastleMaster, CastleTypeId};
pub use unit_data::{KnockBackStats, UnitMaster, UnitTypeId, MAX_HEALTH};

use crate::error::{BattleError, Result};

/// Raw master data as authored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterData {
    /// All unit types.
    pub units: Vec<UnitMaster>,

    /// All castle types.
    pub castles: Vec<CastleMaster>,
}

impl MasterData {
    /// Parse master data from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] if the text is not valid RON
    /// or misses a required attribute.
    pub fn from_ron(text: &str, label: &str) -> Result<Self> {
        parse_ron(text, label)
    }
}

impl BattleConfig {
    /// Parse a battle configuration from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParseError`] on malformed input.
    pub fn from_ron(text: &str, label: &str) -> Result<Self> {
        parse_ron(text, label)
    }
}

fn parse_ron<T: serde::de::DeserializeOwned>(text: &str, label: &str) -> Result<T> {
    ron::from_str(text).map_err(|e| BattleError::DataParseError {
        path: label.to_string(),
        message: e.to_string(),
    })
}

/// Validated, indexed master data.
///
/// A catalog can only be built from records that passed validation, so the
/// simulation never starts with an incomplete entity catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    units: BTreeMap<UnitTypeId, UnitMaster>,
    castles: BTreeMap<CastleTypeId, CastleMaster>,
}

impl Catalog {
    /// Build a catalog from raw master data.
    ///
    /// # Errors
    ///
    /// Returns an error if any record is invalid or two records share an id.
    pub fn new(master: MasterData) -> Result<Self> {
        let mut units = BTreeMap::new();
        for unit in master.units {
            unit.validate()?;
            let id = unit.id;
            if units.insert(id, unit).is_some() {
                return Err(BattleError::DuplicateMaster(id.to_string()));
            }
        }

        let mut castles = BTreeMap::new();
        for castle in master.castles {
            castle.validate()?;
            let id = castle.id;
            if castles.insert(id, castle).is_some() {
                return Err(BattleError::DuplicateMaster(id.to_string()));
            }
        }

        Ok(Self { units, castles })
    }

    /// Look up a unit master record.
    #[must_use]
    pub fn unit(&self, id: UnitTypeId) -> Option<&UnitMaster> {
        self.units.get(&id)
    }

    /// Look up a castle master record.
    #[must_use]
    pub fn castle(&self, id: CastleTypeId) -> Option<&CastleMaster> {
        self.castles.get(&id)
    }

    /// Iterate unit records in id order.
    pub fn units(&self) -> impl Iterator<Item = &UnitMaster> {
        self.units.values()
    }

    /// Validate a battle configuration against this catalog.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidConfig`] listing every problem found.
    pub fn check_config(&self, config: &BattleConfig) -> Result<()> {
        let errors = config.validate(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BattleError::InvalidConfig(errors.join("; ")))
        }
    }
}
