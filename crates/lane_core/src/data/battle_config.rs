//! Battle configuration: lane geometry, per-side rosters and economies,
//! and the opponent wave schedule.

use serde::{Deserialize, Serialize};

use super::castle_data::CastleTypeId;
use super::unit_data::UnitTypeId;
use super::Catalog;
use crate::math::{fixed_serde, Fixed};

/// Cost economy settings for one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Cost available when the battle starts (clamped to `max_cost`).
    #[serde(with = "fixed_serde")]
    pub initial_cost: Fixed,

    /// Ceiling of the cost pool.
    #[serde(with = "fixed_serde")]
    pub max_cost: Fixed,

    /// Cost regenerated per frame.
    #[serde(with = "fixed_serde")]
    pub recovery_per_frame: Fixed,
}

/// Everything one side brings to the battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideConfig {
    /// Castle type defended by this side.
    pub castle: CastleTypeId,

    /// Unit types this side fields, in button order.
    pub roster: Vec<UnitTypeId>,

    /// Cost economy settings.
    pub economy: EconomyConfig,
}

/// A scheduled opponent spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveEntry {
    /// Frame index at which the spawn request is queued.
    pub frame: u64,

    /// Unit type to spawn.
    pub unit: UnitTypeId,
}

/// Complete battle configuration.
///
/// # Example RON
///
/// ```ron
/// BattleConfig(
///     lane_length: 1288490188800, // Fixed-point for 300.0
///     player: SideConfig(
///         castle: 1,
///         roster: [1, 2],
///         economy: EconomyConfig(
///             initial_cost: 0,
///             max_cost: 429496729600,       // 100.0
///             recovery_per_frame: 429496729, // ~0.1
///         ),
///     ),
///     opponent: SideConfig(...),
///     waves: [WaveEntry(frame: 60, unit: 1)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleConfig {
    /// Distance between the two castles.
    #[serde(with = "fixed_serde")]
    pub lane_length: Fixed,

    /// The human player's side.
    pub player: SideConfig,

    /// The opponent's side.
    pub opponent: SideConfig,

    /// Opponent wave schedule.
    #[serde(default)]
    pub waves: Vec<WaveEntry>,
}

impl BattleConfig {
    /// Validate the configuration against a catalog.
    ///
    /// Checks for:
    /// - Positive lane length
    /// - Castle and roster references resolve in the catalog
    /// - No duplicate roster entries
    /// - Non-negative economy settings
    /// - Wave units are part of the opponent roster
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self, catalog: &Catalog) -> Vec<String> {
        let mut errors = Vec::new();

        if self.lane_length <= Fixed::ZERO {
            errors.push("lane_length must be positive".to_string());
        }

        for (label, side) in [("player", &self.player), ("opponent", &self.opponent)] {
            if catalog.castle(side.castle).is_none() {
                errors.push(format!("{label} castle {} not found", side.castle));
            }

            for (index, unit) in side.roster.iter().enumerate() {
                if catalog.unit(*unit).is_none() {
                    errors.push(format!("{label} roster references unknown {unit}"));
                }
                if side.roster[..index].contains(unit) {
                    errors.push(format!("{label} roster lists {unit} twice"));
                }
            }

            let economy = &side.economy;
            if economy.max_cost < Fixed::ZERO {
                errors.push(format!("{label} max_cost must not be negative"));
            }
            if economy.initial_cost < Fixed::ZERO {
                errors.push(format!("{label} initial_cost must not be negative"));
            }
            if economy.recovery_per_frame < Fixed::ZERO {
                errors.push(format!("{label} recovery_per_frame must not be negative"));
            }
        }

        for wave in &self.waves {
            if !self.opponent.roster.contains(&wave.unit) {
                errors.push(format!(
                    "wave at frame {} spawns {} outside the opponent roster",
                    wave.frame, wave.unit
                ));
            }
        }

        errors
    }
}
