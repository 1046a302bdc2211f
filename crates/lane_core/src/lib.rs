//! # Lane Core
//!
//! Deterministic battle logic for a lane-battle game.
//!
//! This crate contains **only** the simulation:
//! - No rendering
//! - No input handling or audio
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! The presentation layer plugs in through [`delegate::BattleLogicDelegate`]:
//! it receives notifications of everything that happens and answers a few
//! yes/no policy questions, but never mutates battle state itself.
//!
//! ## Crate Structure
//!
//! - [`battle`] - The per-frame orchestrator and spawn requests
//! - [`combat`] - Engagement pairing and damage exchange
//! - [`model`] - Entity operations (spawn, damage, knockback, walk)
//! - [`economy`] - Regenerating cost pools
//! - [`state`] - Entity state machine
//! - [`data`] - Master data and battle configuration
//! - [`replay`] - Recording and verifying battles
//! - [`hash`] - Portable state hashing
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod battle;
pub mod combat;
pub mod data;
pub mod delegate;
pub mod economy;
pub mod entity;
pub mod error;
pub mod hash;
pub mod math;
pub mod model;
pub mod registry;
pub mod replay;
pub mod state;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::battle::{BattleLogic, SpawnRequest, TickEvents};
    pub use crate::combat::{CombatReport, Engagement, Hit};
    pub use crate::data::{
        BattleConfig, CastleMaster, CastleTypeId, Catalog, EconomyConfig, KnockBackStats,
        MasterData, SideConfig, UnitMaster, UnitTypeId, WaveEntry,
    };
    pub use crate::delegate::{BattleLogicDelegate, NoopDelegate};
    pub use crate::economy::CostEconomy;
    pub use crate::entity::{AttackableEntity, EntityId, EntityKind, Side, UnitBody};
    pub use crate::error::{BattleError, Result, SpawnRejected};
    pub use crate::math::Fixed;
    pub use crate::replay::{Replay, ReplayRecorder};
    pub use crate::state::EntityState;
}
