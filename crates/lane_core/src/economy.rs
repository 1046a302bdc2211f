//! Cost economy.
//!
//! Each side owns a regenerating cost pool. Deploying a unit spends its cost;
//! the pool refills by a fixed amount per frame up to a ceiling. The economy
//! also tracks which roster entries are currently affordable so the
//! presentation layer can enable or grey out unit buttons.
//!
//! All calculations use fixed-point math for deterministic simulation.

use serde::{Deserialize, Serialize};

use crate::data::{EconomyConfig, UnitTypeId};
use crate::math::{fixed_serde, Fixed};

/// A roster entry and its deployment cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Unit type.
    pub unit: UnitTypeId,
    /// Cost to deploy one unit of this type.
    #[serde(with = "fixed_serde")]
    pub cost: Fixed,
}

/// Regenerating cost pool of one side.
///
/// Invariant: `0 <= available_cost <= max_cost`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEconomy {
    #[serde(with = "fixed_serde")]
    available_cost: Fixed,
    #[serde(with = "fixed_serde")]
    max_cost: Fixed,
    #[serde(with = "fixed_serde")]
    recovery_per_frame: Fixed,
    roster: Vec<RosterEntry>,
    available_unit_ids: Vec<UnitTypeId>,
    /// Set until the first tick has reported the initial values.
    unannounced: bool,
}

impl CostEconomy {
    /// Create an economy from its settings and the side's roster.
    ///
    /// The initial cost is clamped into `[0, max_cost]`.
    #[must_use]
    pub fn new(config: &EconomyConfig, roster: Vec<RosterEntry>) -> Self {
        let max_cost = config.max_cost.max(Fixed::ZERO);
        let mut economy = Self {
            available_cost: config.initial_cost.clamp(Fixed::ZERO, max_cost),
            max_cost,
            recovery_per_frame: config.recovery_per_frame.max(Fixed::ZERO),
            roster,
            available_unit_ids: Vec::new(),
            unannounced: true,
        };
        economy.refresh_available_units();
        economy
    }

    /// Cost currently available.
    #[must_use]
    pub const fn available_cost(&self) -> Fixed {
        self.available_cost
    }

    /// Ceiling of the pool.
    #[must_use]
    pub const fn max_cost(&self) -> Fixed {
        self.max_cost
    }

    /// Roster entries currently affordable, in roster order.
    #[must_use]
    pub fn available_unit_ids(&self) -> &[UnitTypeId] {
        &self.available_unit_ids
    }

    /// Cost of a roster entry, or `None` if the unit is not in the roster.
    #[must_use]
    pub fn cost_of(&self, unit: UnitTypeId) -> Option<Fixed> {
        self.roster
            .iter()
            .find(|entry| entry.unit == unit)
            .map(|entry| entry.cost)
    }

    /// Check if the pool covers `cost`.
    #[must_use]
    pub fn can_afford(&self, cost: Fixed) -> bool {
        self.available_cost >= cost
    }

    /// Regenerate for `delta` frames.
    ///
    /// Returns true if the available cost or the affordable set changed
    /// (always true on the first call, so the initial values get announced).
    pub fn tick(&mut self, delta: Fixed) -> bool {
        let before = self.available_cost;
        let recovered = self.recovery_per_frame.saturating_mul(delta);
        self.available_cost = before.saturating_add(recovered).min(self.max_cost);
        let units_changed = self.refresh_available_units();
        let changed = self.unannounced || units_changed || self.available_cost != before;
        self.unannounced = false;
        changed
    }

    /// Deduct `cost` if the pool covers it.
    ///
    /// Returns true if the transaction succeeded. On failure nothing changes.
    pub fn try_spend(&mut self, cost: Fixed) -> bool {
        if cost < Fixed::ZERO || !self.can_afford(cost) {
            return false;
        }
        self.available_cost -= cost;
        self.refresh_available_units();
        true
    }

    /// Recompute the affordable set. Returns true if it changed.
    fn refresh_available_units(&mut self) -> bool {
        let available = self.available_cost;
        let next: Vec<UnitTypeId> = self
            .roster
            .iter()
            .filter(|entry| entry.cost <= available)
            .map(|entry| entry.unit)
            .collect();
        if next == self.available_unit_ids {
            false
        } else {
            self.available_unit_ids = next;
            true
        }
    }
}
