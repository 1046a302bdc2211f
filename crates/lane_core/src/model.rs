//! Entity model: spawning, damage, knockback and walking.
//!
//! [`EntityModel`] wraps the [`EntityRegistry`] with the lane geometry and is
//! the only place that mutates entity attributes. Each operation reports what
//! it did to the delegate it is handed, so callers never need to remember
//! which notification belongs to which mutation.

use serde::{Deserialize, Serialize};

use crate::data::{CastleMaster, UnitMaster};
use crate::delegate::BattleLogicDelegate;
use crate::entity::{AttackableEntity, EntityId, Side};
use crate::math::{decay_toward_zero, fixed_serde, Fixed};
use crate::registry::EntityRegistry;
use crate::state::{transition, EntityState, Transition};

/// What a call to [`EntityModel::apply_damage`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Health before the hit.
    pub from_health: u32,
    /// Health after the hit.
    pub to_health: u32,
    /// The hit killed the target.
    pub died: bool,
    /// The hit started a knockback.
    pub knocked_back: bool,
}

/// Registry plus lane geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityModel {
    registry: EntityRegistry,
    #[serde(with = "fixed_serde")]
    lane_length: Fixed,
}

impl EntityModel {
    /// Create an empty model for a lane of the given length.
    #[must_use]
    pub fn new(lane_length: Fixed) -> Self {
        Self {
            registry: EntityRegistry::new(),
            lane_length,
        }
    }

    /// Read-only access to the registry.
    #[must_use]
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Distance between the two castles.
    #[must_use]
    pub const fn lane_length(&self) -> Fixed {
        self.lane_length
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&AttackableEntity> {
        self.registry.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut AttackableEntity> {
        self.registry.get_mut(id)
    }

    /// Place a castle and announce it.
    pub fn spawn_castle<D>(&mut self, master: &CastleMaster, side: Side, delegate: &mut D) -> EntityId
    where
        D: BattleLogicDelegate + ?Sized,
    {
        let id = self.registry.insert(AttackableEntity::castle(master, side));
        if let Some(entity) = self.registry.get(id) {
            delegate.on_castle_entity_spawned(entity, side.is_player());
        }
        tracing::debug!(entity = id, castle = %master.id, ?side, "Castle spawned");
        id
    }

    /// Spawn a unit in IDLE at the start of the lane and announce it.
    ///
    /// Affordability is the caller's concern; see
    /// [`crate::battle::BattleLogic::request_spawn_unit`].
    pub fn spawn_unit<D>(&mut self, master: &UnitMaster, side: Side, delegate: &mut D) -> EntityId
    where
        D: BattleLogicDelegate + ?Sized,
    {
        let unit = AttackableEntity::unit(master, side, self.lane_length);
        let id = self.registry.insert(unit);
        if let Some(entity) = self.registry.get(id) {
            delegate.on_unit_entity_spawned(entity);
        }
        tracing::debug!(entity = id, unit = %master.id, ?side, "Unit spawned");
        id
    }

    /// Request a state transition, notifying the delegate on change.
    ///
    /// Leaving LOCKED clears the engagement partner; entering DEAD clears any
    /// knockback.
    pub fn set_state<D>(&mut self, id: EntityId, next: EntityState, delegate: &mut D) -> Transition
    where
        D: BattleLogicDelegate + ?Sized,
    {
        let Some(entity) = self.registry.get_mut(id) else {
            return Transition::Rejected;
        };

        let outcome = transition(&mut entity.state, next);
        if let Transition::Changed { previous } = outcome {
            if next != EntityState::Locked {
                entity.engaged_with = None;
            }
            if next == EntityState::Dead {
                entity.knock_back_rate = Fixed::ZERO;
            }
            delegate.on_attackable_entity_state_changed(entity, previous);
        }
        outcome
    }

    /// Lock an entity into an engagement with `partner`.
    ///
    /// Idempotent: locking an already locked entity only updates the partner
    /// and raises no notification.
    pub fn lock<D>(&mut self, id: EntityId, partner: EntityId, delegate: &mut D) -> Transition
    where
        D: BattleLogicDelegate + ?Sized,
    {
        let Some(entity) = self.registry.get_mut(id) else {
            return Transition::Rejected;
        };
        if !entity.state.is_engageable() {
            return Transition::Rejected;
        }
        entity.engaged_with = Some(partner);
        self.set_state(id, EntityState::Locked, delegate)
    }

    /// Apply damage to `target`, clamping health to `[0, max_health]`.
    ///
    /// Notifies the health change (if any), moves a target at zero health to
    /// DEAD, and starts a knockback when the hit crosses one of the unit's
    /// knockback thresholds. Dead targets are left untouched.
    pub fn apply_damage<D>(
        &mut self,
        target: EntityId,
        amount: u32,
        attacker: EntityId,
        delegate: &mut D,
    ) -> DamageOutcome
    where
        D: BattleLogicDelegate + ?Sized,
    {
        let Some(entity) = self.registry.get_mut(target) else {
            return DamageOutcome::default();
        };
        if entity.is_dead() {
            return DamageOutcome::default();
        }

        let from_health = entity.health;
        let max_health = entity.max_health;
        let to_health = from_health.saturating_sub(amount).min(max_health);
        let mut outcome = DamageOutcome {
            from_health,
            to_health,
            ..DamageOutcome::default()
        };
        if to_health == from_health {
            return outcome;
        }

        entity.health = to_health;
        let crosses_threshold = entity
            .as_unit()
            .and_then(|body| body.knock_back)
            .is_some_and(|kb| kb.crosses_threshold(from_health, to_health, max_health));

        if let Some(entity) = self.registry.get(target) {
            delegate.on_attackable_entity_health_updated(
                self.registry.get(attacker),
                entity,
                from_health,
                to_health,
                max_health,
            );
        }

        if to_health == 0 {
            outcome.died = self.set_state(target, EntityState::Dead, delegate).changed();
            tracing::debug!(entity = target, attacker, "Entity died");
        } else if crosses_threshold {
            outcome.knocked_back = self.apply_knockback(target, Fixed::ONE, delegate);
        }
        outcome
    }

    /// Start a knockback window on a unit.
    ///
    /// A locked unit first drops its engagement (LOCKED → IDLE) and then
    /// enters WAIT. Castles, dead entities and units without knockback stats
    /// cannot be knocked back. A unit already in WAIT has its rate refreshed.
    pub fn apply_knockback<D>(&mut self, target: EntityId, rate: Fixed, delegate: &mut D) -> bool
    where
        D: BattleLogicDelegate + ?Sized,
    {
        let Some(entity) = self.registry.get_mut(target) else {
            return false;
        };
        let can_knock_back = entity.as_unit().is_some_and(|body| body.knock_back.is_some());
        if entity.is_dead() || !can_knock_back {
            return false;
        }

        entity.knock_back_rate = rate.clamp(Fixed::ZERO, Fixed::ONE);
        let state = entity.state;
        if state == EntityState::Locked {
            self.set_state(target, EntityState::Idle, delegate);
        }
        if state != EntityState::Wait {
            self.set_state(target, EntityState::Wait, delegate);
        }
        true
    }

    /// Advance an active knockback by `delta` frames.
    ///
    /// Pushes the unit back toward its own castle, decays the rate and
    /// returns the unit to IDLE once the rate reaches zero.
    pub fn advance_knockback<D>(&mut self, id: EntityId, delta: Fixed, delegate: &mut D)
    where
        D: BattleLogicDelegate + ?Sized,
    {
        let lane_length = self.lane_length;
        let Some(entity) = self.registry.get_mut(id) else {
            return;
        };
        if entity.state != EntityState::Wait {
            return;
        }
        let Some(knock_back) = entity.as_unit().and_then(|body| body.knock_back) else {
            self.set_state(id, EntityState::Idle, delegate);
            return;
        };

        let rate = entity.knock_back_rate;
        if rate > Fixed::ZERO {
            let push = knock_back.speed.saturating_mul(rate).saturating_mul(delta);
            entity.distance = entity.distance.saturating_add(push).min(lane_length);
            entity.knock_back_rate = decay_toward_zero(rate, knock_back.decay_step(delta));
            delegate.on_attackable_entity_knocking_back(entity, entity.knock_back_rate);
        }

        if entity.knock_back_rate == Fixed::ZERO {
            self.set_state(id, EntityState::Idle, delegate);
        }
    }

    /// Walk an idle unit toward the enemy castle.
    ///
    /// Asks the delegate first; a vetoed unit stays where it is this tick.
    /// Returns whether the unit moved.
    pub fn advance_walk<D>(&mut self, id: EntityId, delta: Fixed, delegate: &mut D) -> bool
    where
        D: BattleLogicDelegate + ?Sized,
    {
        let Some(entity) = self.registry.get(id) else {
            return false;
        };
        if entity.state != EntityState::Idle || !entity.is_mobile() {
            return false;
        }
        if !delegate.should_attackable_walk(entity) {
            tracing::trace!(entity = id, "Walk vetoed by delegate");
            return false;
        }

        let Some(entity) = self.registry.get_mut(id) else {
            return false;
        };
        let speed = entity.as_unit().map_or(Fixed::ZERO, |body| body.speed);
        let distance = decay_toward_zero(entity.distance, speed.saturating_mul(delta));
        if distance == entity.distance {
            return false;
        }
        entity.distance = distance;
        delegate.on_attackable_entity_walked(entity);
        true
    }

    /// Remove dead units from the registry.
    ///
    /// Castles stay so the outcome remains queryable.
    pub fn sweep_dead_units(&mut self) -> Vec<EntityId> {
        let dead: Vec<EntityId> = self
            .registry
            .iter_sorted()
            .filter(|entity| entity.is_dead() && entity.is_mobile())
            .map(|entity| entity.id)
            .collect();
        for id in &dead {
            self.registry.remove(*id);
            tracing::debug!(entity = id, "Dead unit removed");
        }
        dead
    }
}
