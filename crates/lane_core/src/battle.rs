//! The battle orchestrator.
//!
//! [`BattleLogic`] owns every piece of mutable battle state: the entity
//! model, both cost economies, the spawn queue and the delegate. The
//! presentation layer drives it with [`BattleLogic::update`] once per frame
//! and asks for units through [`BattleLogic::request_spawn_unit`].
//!
//! # Frame order
//!
//! 1. Remove units that died during the previous frame.
//! 2. Regenerate both economies (the player's change is announced).
//! 3. Queue opponent waves due this frame and process the spawn queue.
//! 4. Advance knockbacks (WAIT) and walks (IDLE) in ascending id order.
//! 5. Resolve combat.
//! 6. Check the win condition.
//!
//! # Determinism
//!
//! Every sweep iterates in ascending entity id order and all quantities are
//! fixed-point, so identical inputs always produce identical notifications
//! and an identical [`BattleLogic::state_hash`].
//!
//! # Example
//!
//! ```no_run
//! use lane_core::prelude::*;
//!
//! fn run(master: MasterData, config: BattleConfig) -> lane_core::error::Result<u64> {
//!     let catalog = Catalog::new(master)?;
//!     let mut battle = BattleLogic::new(catalog, config, NoopDelegate)?;
//!     battle.request_spawn_unit(UnitTypeId(1), Side::Player);
//!     while !battle.is_game_over() {
//!         battle.update(Fixed::ONE);
//!     }
//!     Ok(battle.state_hash())
//! }
//! ```

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::combat::{self, CombatReport};
use crate::data::{BattleConfig, Catalog, SideConfig, UnitTypeId};
use crate::delegate::BattleLogicDelegate;
use crate::economy::{CostEconomy, RosterEntry};
use crate::entity::{AttackableEntity, EntityId, EntityKind, Side};
use crate::error::{BattleError, Result, SpawnRejected};
use crate::hash::StateHasher;
use crate::math::{frame_delta, Fixed};
use crate::model::EntityModel;
use crate::state::EntityState;

/// A deferred spawn request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpawnRequest {
    /// Unit type to spawn.
    pub unit: UnitTypeId,
    /// Side the unit fights for.
    pub side: Side,
}

/// Events produced by a single frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Frame index this update processed.
    pub frame: u64,
    /// Units spawned from the queue this frame.
    pub spawned: Vec<EntityId>,
    /// Queued requests that were turned down.
    pub rejected: Vec<(SpawnRequest, SpawnRejected)>,
    /// Combat resolution results.
    pub combat: CombatReport,
    /// Dead units removed from the registry at the start of the frame.
    pub removed: Vec<EntityId>,
    /// Set on the frame the battle ended: whether the player won.
    pub game_over: Option<bool>,
}

/// Serializable battle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BattleState {
    frame: u64,
    model: EntityModel,
    player_economy: CostEconomy,
    opponent_economy: CostEconomy,
    spawn_queue: VecDeque<SpawnRequest>,
    next_wave: usize,
    player_castle: EntityId,
    opponent_castle: EntityId,
    outcome: Option<bool>,
}

impl BattleState {
    fn economy(&self, side: Side) -> &CostEconomy {
        match side {
            Side::Player => &self.player_economy,
            Side::Opponent => &self.opponent_economy,
        }
    }

    fn economy_mut(&mut self, side: Side) -> &mut CostEconomy {
        match side {
            Side::Player => &mut self.player_economy,
            Side::Opponent => &mut self.opponent_economy,
        }
    }

    fn castle_id(&self, side: Side) -> EntityId {
        match side {
            Side::Player => self.player_castle,
            Side::Opponent => self.opponent_castle,
        }
    }
}

/// The battle simulation.
pub struct BattleLogic<D: BattleLogicDelegate> {
    catalog: Catalog,
    config: BattleConfig,
    delegate: D,
    state: BattleState,
}

impl<D: BattleLogicDelegate> BattleLogic<D> {
    /// Validate the configuration, place both castles and announce them.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration references unknown master
    /// records or carries values the simulation cannot run with. No
    /// notification is sent in that case.
    pub fn new(catalog: Catalog, mut config: BattleConfig, mut delegate: D) -> Result<Self> {
        catalog.check_config(&config)?;
        config.waves.sort_by_key(|wave| wave.frame);

        let player_economy = CostEconomy::new(
            &config.player.economy,
            roster_entries(&catalog, &config.player)?,
        );
        let opponent_economy = CostEconomy::new(
            &config.opponent.economy,
            roster_entries(&catalog, &config.opponent)?,
        );

        let player_master = catalog
            .castle(config.player.castle)
            .ok_or(BattleError::UnknownCastleType(config.player.castle))?;
        let opponent_master = catalog
            .castle(config.opponent.castle)
            .ok_or(BattleError::UnknownCastleType(config.opponent.castle))?;

        let mut model = EntityModel::new(config.lane_length);
        let player_castle = model.spawn_castle(player_master, Side::Player, &mut delegate);
        let opponent_castle = model.spawn_castle(opponent_master, Side::Opponent, &mut delegate);

        tracing::debug!(
            lane_length = %config.lane_length,
            waves = config.waves.len(),
            "Battle created"
        );

        Ok(Self {
            catalog,
            config,
            delegate,
            state: BattleState {
                frame: 0,
                model,
                player_economy,
                opponent_economy,
                spawn_queue: VecDeque::new(),
                next_wave: 0,
                player_castle,
                opponent_castle,
                outcome: None,
            },
        })
    }

    /// Advance the battle by `delta` frames.
    ///
    /// Negative deltas are treated as zero. Once the battle is over this is
    /// a no-op that returns empty events.
    pub fn update(&mut self, delta: Fixed) -> TickEvents {
        let mut events = TickEvents {
            frame: self.state.frame,
            ..TickEvents::default()
        };
        if self.is_game_over() {
            return events;
        }
        let delta = frame_delta(delta);

        events.removed = self.state.model.sweep_dead_units();

        if self.state.player_economy.tick(delta) {
            self.announce_player_cost();
        }
        self.state.opponent_economy.tick(delta);

        self.queue_due_waves();
        self.process_spawn_queue(&mut events);

        for id in self.state.model.registry().sorted_ids() {
            match self.state.model.get(id).map(|entity| entity.state) {
                Some(EntityState::Wait) => {
                    self.state
                        .model
                        .advance_knockback(id, delta, &mut self.delegate);
                }
                Some(EntityState::Idle) => {
                    self.state.model.advance_walk(id, delta, &mut self.delegate);
                }
                _ => {}
            }
        }

        events.combat = combat::resolve(&mut self.state.model, delta, &mut self.delegate);

        self.state.frame += 1;
        events.game_over = self.check_game_over();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(frame = self.state.frame, state_hash = hash, "Battle state hash");
        }

        #[cfg(feature = "debug-validation")]
        self.validate_invariants();

        events
    }

    /// Spawn a unit now if the side can afford it.
    ///
    /// Returns whether the unit was spawned. See [`Self::try_spawn_unit`] for
    /// the reason of a refusal.
    pub fn request_spawn_unit(&mut self, unit: UnitTypeId, side: Side) -> bool {
        self.try_spawn_unit(unit, side).is_ok()
    }

    /// Spawn a unit now, reporting why a refused request failed.
    ///
    /// The checks run in order: battle over, unknown unit type, not in the
    /// side's roster, insufficient cost. A refused request mutates nothing
    /// and sends no notification.
    ///
    /// # Errors
    ///
    /// Returns the [`SpawnRejected`] reason when the unit was not spawned.
    pub fn try_spawn_unit(
        &mut self,
        unit: UnitTypeId,
        side: Side,
    ) -> std::result::Result<EntityId, SpawnRejected> {
        if self.is_game_over() {
            return Err(SpawnRejected::BattleOver);
        }
        let master = self
            .catalog
            .unit(unit)
            .ok_or(SpawnRejected::UnknownUnitType(unit))?;

        let economy = self.state.economy_mut(side);
        let cost = economy
            .cost_of(unit)
            .ok_or(SpawnRejected::NotInRoster(unit))?;
        if !economy.try_spend(cost) {
            return Err(SpawnRejected::InsufficientCost {
                required: cost,
                available: economy.available_cost(),
            });
        }

        let id = self
            .state
            .model
            .spawn_unit(master, side, &mut self.delegate);
        if side.is_player() {
            self.announce_player_cost();
        }
        Ok(id)
    }

    /// Defer a spawn request to the start of the next frame.
    ///
    /// This is how a delegate asks for a unit in response to a notification,
    /// since it cannot reach the battle while being called by it.
    pub fn queue_spawn_unit(&mut self, unit: UnitTypeId, side: Side) {
        self.state.spawn_queue.push_back(SpawnRequest { unit, side });
    }

    /// Spawn requests waiting for the next frame.
    pub fn pending_spawns(&self) -> impl Iterator<Item = &SpawnRequest> {
        self.state.spawn_queue.iter()
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&AttackableEntity> {
        self.state.model.get(id)
    }

    /// Iterate over all entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = &AttackableEntity> {
        self.state.model.registry().iter_sorted()
    }

    /// The castle of a side.
    #[must_use]
    pub fn castle(&self, side: Side) -> Option<&AttackableEntity> {
        self.state.model.get(self.state.castle_id(side))
    }

    /// The cost economy of a side.
    #[must_use]
    pub fn economy(&self, side: Side) -> &CostEconomy {
        self.state.economy(side)
    }

    /// Number of frames processed so far.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.state.frame
    }

    /// Check if the battle has ended.
    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.state.outcome.is_some()
    }

    /// Whether the player won, once the battle has ended.
    #[must_use]
    pub const fn outcome(&self) -> Option<bool> {
        self.state.outcome
    }

    /// The configuration this battle runs with (waves sorted by frame).
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// The master data catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The delegate.
    #[must_use]
    pub const fn delegate(&self) -> &D {
        &self.delegate
    }

    /// Mutable access to the delegate between frames.
    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    /// Consume the battle and return its delegate.
    pub fn into_delegate(self) -> D {
        self.delegate
    }

    /// Calculate a hash of the current battle state.
    ///
    /// Two battles with identical state produce identical hashes, on any
    /// platform and toolchain. Used by replays and determinism tests.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = StateHasher::new();
        let state = &self.state;

        state.frame.hash(&mut hasher);
        state.outcome.hash(&mut hasher);
        state.next_wave.hash(&mut hasher);
        state.spawn_queue.hash(&mut hasher);
        for economy in [&state.player_economy, &state.opponent_economy] {
            economy.available_cost().to_bits().hash(&mut hasher);
            economy.available_unit_ids().hash(&mut hasher);
        }

        let registry = state.model.registry();
        registry.len().hash(&mut hasher);
        for entity in registry.iter_sorted() {
            entity.id.hash(&mut hasher);
            entity.side.hash(&mut hasher);
            entity.state.hash(&mut hasher);
            entity.health.hash(&mut hasher);
            entity.distance.to_bits().hash(&mut hasher);
            entity.knock_back_rate.to_bits().hash(&mut hasher);
            entity.engaged_with.hash(&mut hasher);
            if let EntityKind::Unit(body) = &entity.kind {
                body.unit_type.hash(&mut hasher);
                body.cooldown_remaining.to_bits().hash(&mut hasher);
            }
        }

        hasher.finish()
    }

    /// Serialize the battle state.
    ///
    /// The catalog, configuration and delegate are not part of the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn save_state(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.state)
            .map_err(|e| BattleError::Serialization(format!("Failed to serialize battle: {e}")))
    }

    /// Replace the battle state with a snapshot taken by [`Self::save_state`].
    ///
    /// No notification is sent; the presentation layer is expected to
    /// rebuild its view from the read-only queries.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes do not decode to a battle state.
    pub fn restore_state(&mut self, bytes: &[u8]) -> Result<()> {
        let state: BattleState = bincode::deserialize(bytes)
            .map_err(|e| BattleError::Serialization(format!("Failed to deserialize battle: {e}")))?;
        self.state = state;
        Ok(())
    }

    fn announce_player_cost(&mut self) {
        let economy = &self.state.player_economy;
        self.delegate.on_available_cost_updated(
            economy.available_cost(),
            economy.max_cost(),
            economy.available_unit_ids(),
        );
    }

    fn queue_due_waves(&mut self) {
        while let Some(wave) = self.config.waves.get(self.state.next_wave) {
            if wave.frame > self.state.frame {
                break;
            }
            self.state.spawn_queue.push_back(SpawnRequest {
                unit: wave.unit,
                side: Side::Opponent,
            });
            self.state.next_wave += 1;
        }
    }

    fn process_spawn_queue(&mut self, events: &mut TickEvents) {
        while let Some(request) = self.state.spawn_queue.pop_front() {
            match self.try_spawn_unit(request.unit, request.side) {
                Ok(id) => events.spawned.push(id),
                Err(reason) => {
                    tracing::warn!(
                        frame = self.state.frame,
                        unit = %request.unit,
                        side = ?request.side,
                        %reason,
                        "Queued spawn dropped"
                    );
                    events.rejected.push((request, reason));
                }
            }
        }
    }

    fn check_game_over(&mut self) -> Option<bool> {
        let castle_dead = |side| self.castle(side).map_or(true, AttackableEntity::is_dead);
        let player_dead = castle_dead(Side::Player);
        let opponent_dead = castle_dead(Side::Opponent);
        if !player_dead && !opponent_dead {
            return None;
        }

        let is_player_won = opponent_dead && !player_dead;
        self.state.outcome = Some(is_player_won);
        tracing::debug!(frame = self.state.frame, is_player_won, "Battle over");
        self.delegate.on_game_over(is_player_won);
        Some(is_player_won)
    }

    #[cfg(feature = "debug-validation")]
    fn validate_invariants(&self) {
        for entity in self.entities() {
            assert_eq!(
                entity.health == 0,
                entity.is_dead(),
                "entity {} has health {} in state {:?}",
                entity.id,
                entity.health,
                entity.state
            );
            assert!(entity.health <= entity.max_health);
            assert!(entity.distance >= Fixed::ZERO);
            assert!(entity.distance <= self.state.model.lane_length());
        }
        for side in [Side::Player, Side::Opponent] {
            let economy = self.economy(side);
            assert!(economy.available_cost() >= Fixed::ZERO);
            assert!(economy.available_cost() <= economy.max_cost());
        }
    }
}

impl<D: BattleLogicDelegate> std::fmt::Debug for BattleLogic<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleLogic")
            .field("frame", &self.state.frame)
            .field("entities", &self.state.model.registry().len())
            .field("outcome", &self.state.outcome)
            .finish_non_exhaustive()
    }
}

fn roster_entries(catalog: &Catalog, side: &SideConfig) -> Result<Vec<RosterEntry>> {
    side.roster
        .iter()
        .map(|&unit| {
            catalog
                .unit(unit)
                .map(|master| RosterEntry {
                    unit,
                    cost: master.cost,
                })
                .ok_or(BattleError::UnknownUnitType(unit))
        })
        .collect()
}
