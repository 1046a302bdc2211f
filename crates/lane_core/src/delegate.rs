//! The delegate protocol between the battle logic and its presentation layer.
//!
//! A delegate plays two roles through one trait:
//!
//! - **Notifications** (`on_*`): fire-and-forget reports of what happened.
//!   They return nothing, so a delegate cannot block or fail the simulation.
//! - **Policy questions** (`should_*`): synchronous yes/no answers consumed
//!   in the same tick. They take `&self` and must not have side effects
//!   visible to the core.
//!
//! Entities are handed out by shared reference only. A delegate that wants to
//! mirror entities (sprites, health bars) keys its own map by [`EntityId`]
//! and looks state up again through the battle's read-only queries.
//!
//! [`EntityId`]: crate::entity::EntityId

use crate::data::UnitTypeId;
use crate::entity::AttackableEntity;
use crate::math::Fixed;
use crate::state::EntityState;

/// Receives battle notifications and answers policy questions.
///
/// Every method has a default: notifications do nothing and policies allow.
#[allow(unused_variables)]
pub trait BattleLogicDelegate {
    /// A castle was placed at battle start.
    fn on_castle_entity_spawned(&mut self, entity: &AttackableEntity, is_player: bool) {}

    /// A unit was spawned. Fired before the unit takes part in any tick.
    fn on_unit_entity_spawned(&mut self, entity: &AttackableEntity) {}

    /// An entity's visible state changed.
    fn on_attackable_entity_state_changed(
        &mut self,
        entity: &AttackableEntity,
        previous: EntityState,
    ) {
    }

    /// An entity's health changed.
    fn on_attackable_entity_health_updated(
        &mut self,
        attacker: Option<&AttackableEntity>,
        target: &AttackableEntity,
        from_health: u32,
        to_health: u32,
        max_health: u32,
    ) {
    }

    /// A unit moved along the lane.
    fn on_attackable_entity_walked(&mut self, entity: &AttackableEntity) {}

    /// A unit is being knocked back. Fired every tick of the knockback window.
    fn on_attackable_entity_knocking_back(
        &mut self,
        entity: &AttackableEntity,
        knock_back_rate: Fixed,
    ) {
    }

    /// The player's available cost or affordable unit set changed.
    fn on_available_cost_updated(
        &mut self,
        cost: Fixed,
        max_cost: Fixed,
        available_unit_ids: &[UnitTypeId],
    ) {
    }

    /// The battle ended. Fired exactly once.
    fn on_game_over(&mut self, is_player_won: bool) {}

    /// May `attacker` engage `target` this tick?
    fn should_engage_attackable_entity(
        &self,
        attacker: &AttackableEntity,
        target: &AttackableEntity,
    ) -> bool {
        true
    }

    /// May `attacker` deal damage to `target` this tick?
    fn should_damage(&self, attacker: &AttackableEntity, target: &AttackableEntity) -> bool {
        true
    }

    /// May `entity` walk this tick?
    fn should_attackable_walk(&self, entity: &AttackableEntity) -> bool {
        true
    }
}

/// A delegate that ignores every notification and allows every policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopDelegate;

impl BattleLogicDelegate for NoopDelegate {}

impl<D: BattleLogicDelegate + ?Sized> BattleLogicDelegate for &mut D {
    fn on_castle_entity_spawned(&mut self, entity: &AttackableEntity, is_player: bool) {
        (**self).on_castle_entity_spawned(entity, is_player);
    }

    fn on_unit_entity_spawned(&mut self, entity: &AttackableEntity) {
        (**self).on_unit_entity_spawned(entity);
    }

    fn on_attackable_entity_state_changed(
        &mut self,
        entity: &AttackableEntity,
        previous: EntityState,
    ) {
        (**self).on_attackable_entity_state_changed(entity, previous);
    }

    fn on_attackable_entity_health_updated(
        &mut self,
        attacker: Option<&AttackableEntity>,
        target: &AttackableEntity,
        from_health: u32,
        to_health: u32,
        max_health: u32,
    ) {
        (**self).on_attackable_entity_health_updated(
            attacker,
            target,
            from_health,
            to_health,
            max_health,
        );
    }

    fn on_attackable_entity_walked(&mut self, entity: &AttackableEntity) {
        (**self).on_attackable_entity_walked(entity);
    }

    fn on_attackable_entity_knocking_back(
        &mut self,
        entity: &AttackableEntity,
        knock_back_rate: Fixed,
    ) {
        (**self).on_attackable_entity_knocking_back(entity, knock_back_rate);
    }

    fn on_available_cost_updated(
        &mut self,
        cost: Fixed,
        max_cost: Fixed,
        available_unit_ids: &[UnitTypeId],
    ) {
        (**self).on_available_cost_updated(cost, max_cost, available_unit_ids);
    }

    fn on_game_over(&mut self, is_player_won: bool) {
        (**self).on_game_over(is_player_won);
    }

    fn should_engage_attackable_entity(
        &self,
        attacker: &AttackableEntity,
        target: &AttackableEntity,
    ) -> bool {
        (**self).should_engage_attackable_entity(attacker, target)
    }

    fn should_damage(&self, attacker: &AttackableEntity, target: &AttackableEntity) -> bool {
        (**self).should_damage(attacker, target)
    }

    fn should_attackable_walk(&self, entity: &AttackableEntity) -> bool {
        (**self).should_attackable_walk(entity)
    }
}
