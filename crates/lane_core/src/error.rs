//! Error types for the battle simulation.

use thiserror::Error;

use crate::data::{CastleTypeId, UnitTypeId};
use crate::math::Fixed;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for battle setup and persistence.
///
/// Nothing in here is raised mid-tick: expected runtime conditions such as a
/// failed spawn or a stale transition are modelled as [`SpawnRejected`] and
/// [`crate::state::Transition`] values instead.
#[derive(Debug, Error)]
pub enum BattleError {
    /// A roster, wave or side references a unit type that has no master record.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(UnitTypeId),

    /// A side references a castle type that has no master record.
    #[error("Unknown castle type: {0}")]
    UnknownCastleType(CastleTypeId),

    /// Two master records share the same identifier.
    #[error("Duplicate master record: {0}")]
    DuplicateMaster(String),

    /// A master record carries values the simulation cannot run with.
    #[error("Invalid master data for '{record}': {reason}")]
    InvalidMasterData {
        /// Identifier of the offending record.
        record: String,
        /// Human readable description of the problem.
        reason: String,
    },

    /// The battle configuration itself is inconsistent.
    #[error("Invalid battle configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{path}': {message}")]
    DataParseError {
        /// Path or label of the data that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Battle state could not be encoded or decoded.
    #[error("State serialization failed: {0}")]
    Serialization(String),

    /// Replay verification or loading failed.
    #[error("Replay error: {0}")]
    Replay(String),
}

/// Reason a spawn request was turned down.
///
/// Spawn failures are ordinary gameplay outcomes, never fatal. The boolean
/// [`crate::battle::BattleLogic::request_spawn_unit`] collapses this to
/// `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpawnRejected {
    /// The battle already has a winner.
    #[error("Battle is already over")]
    BattleOver,

    /// No master record exists for the requested unit type.
    #[error("Unknown unit type: {0}")]
    UnknownUnitType(UnitTypeId),

    /// The unit type exists but the side did not field it.
    #[error("Unit type {0} is not in the roster")]
    NotInRoster(UnitTypeId),

    /// Not enough cost available.
    #[error("Insufficient cost: need {required}, have {available}")]
    InsufficientCost {
        /// Cost of the unit.
        required: Fixed,
        /// Cost available when the request was made.
        available: Fixed,
    },
}
