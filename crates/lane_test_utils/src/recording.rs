//! A delegate that records every notification.
//!
//! [`RecordingDelegate`] stores notifications as [`BattleEvent`] values in the
//! order they arrive, and answers policy questions with closures the test
//! installs. Without closures every policy allows.

use std::fmt;

use lane_core::data::UnitTypeId;
use lane_core::delegate::BattleLogicDelegate;
use lane_core::entity::{AttackableEntity, EntityId, Side};
use lane_core::math::Fixed;
use lane_core::state::EntityState;
use serde::Serialize;

/// A recorded notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BattleEvent {
    /// `on_castle_entity_spawned`.
    CastleSpawned {
        /// Entity id.
        id: EntityId,
        /// Whether it is the player's castle.
        is_player: bool,
    },
    /// `on_unit_entity_spawned`.
    UnitSpawned {
        /// Entity id.
        id: EntityId,
        /// Unit type.
        unit: UnitTypeId,
        /// Owning side.
        side: Side,
    },
    /// `on_attackable_entity_state_changed`.
    StateChanged {
        /// Entity id.
        id: EntityId,
        /// State left.
        from: EntityState,
        /// State entered.
        to: EntityState,
    },
    /// `on_attackable_entity_health_updated`.
    HealthUpdated {
        /// Attacking entity, if known.
        attacker: Option<EntityId>,
        /// Damaged entity.
        target: EntityId,
        /// Health before.
        from: u32,
        /// Health after.
        to: u32,
        /// Maximum health.
        max: u32,
    },
    /// `on_attackable_entity_walked`.
    Walked {
        /// Entity id.
        id: EntityId,
        /// Distance after the step, as raw fixed-point bits.
        distance: i64,
    },
    /// `on_attackable_entity_knocking_back`.
    KnockingBack {
        /// Entity id.
        id: EntityId,
        /// Knockback rate after this frame, as raw fixed-point bits.
        rate: i64,
    },
    /// `on_available_cost_updated`.
    CostUpdated {
        /// Available cost, as raw fixed-point bits.
        cost: i64,
        /// Maximum cost, as raw fixed-point bits.
        max_cost: i64,
        /// Affordable unit types.
        available: Vec<UnitTypeId>,
    },
    /// `on_game_over`.
    GameOver {
        /// Whether the player won.
        is_player_won: bool,
    },
}

type PairPolicy = Box<dyn Fn(&AttackableEntity, &AttackableEntity) -> bool>;
type EntityPolicy = Box<dyn Fn(&AttackableEntity) -> bool>;

/// Records notifications and answers policies with installed closures.
#[derive(Default)]
pub struct RecordingDelegate {
    events: Vec<BattleEvent>,
    engage_policy: Option<PairPolicy>,
    damage_policy: Option<PairPolicy>,
    walk_policy: Option<EntityPolicy>,
}

impl RecordingDelegate {
    /// Create a delegate that allows everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `should_engage_attackable_entity` with `policy`.
    #[must_use]
    pub fn with_engage_policy(
        mut self,
        policy: impl Fn(&AttackableEntity, &AttackableEntity) -> bool + 'static,
    ) -> Self {
        self.engage_policy = Some(Box::new(policy));
        self
    }

    /// Answer `should_damage` with `policy`.
    #[must_use]
    pub fn with_damage_policy(
        mut self,
        policy: impl Fn(&AttackableEntity, &AttackableEntity) -> bool + 'static,
    ) -> Self {
        self.damage_policy = Some(Box::new(policy));
        self
    }

    /// Answer `should_attackable_walk` with `policy`.
    #[must_use]
    pub fn with_walk_policy(mut self, policy: impl Fn(&AttackableEntity) -> bool + 'static) -> Self {
        self.walk_policy = Some(Box::new(policy));
        self
    }

    /// All events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Drain the recorded events.
    pub fn take_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Count events matching a predicate.
    pub fn count(&self, predicate: impl Fn(&BattleEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }

    /// State changes of one entity as `(from, to)` pairs.
    #[must_use]
    pub fn state_changes_of(&self, id: EntityId) -> Vec<(EntityState, EntityState)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                BattleEvent::StateChanged {
                    id: changed,
                    from,
                    to,
                } if *changed == id => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    /// Number of `on_game_over` notifications.
    #[must_use]
    pub fn game_over_count(&self) -> usize {
        self.count(|event| matches!(event, BattleEvent::GameOver { .. }))
    }

    /// Number of spawn notifications (units and castles).
    #[must_use]
    pub fn spawn_count(&self) -> usize {
        self.count(|event| {
            matches!(
                event,
                BattleEvent::UnitSpawned { .. } | BattleEvent::CastleSpawned { .. }
            )
        })
    }
}

impl fmt::Debug for RecordingDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingDelegate")
            .field("events", &self.events.len())
            .field("engage_policy", &self.engage_policy.is_some())
            .field("damage_policy", &self.damage_policy.is_some())
            .field("walk_policy", &self.walk_policy.is_some())
            .finish()
    }
}

impl BattleLogicDelegate for RecordingDelegate {
    fn on_castle_entity_spawned(&mut self, entity: &AttackableEntity, is_player: bool) {
        self.events.push(BattleEvent::CastleSpawned {
            id: entity.id,
            is_player,
        });
    }

    fn on_unit_entity_spawned(&mut self, entity: &AttackableEntity) {
        if let Some(unit) = entity.unit_type() {
            self.events.push(BattleEvent::UnitSpawned {
                id: entity.id,
                unit,
                side: entity.side,
            });
        }
    }

    fn on_attackable_entity_state_changed(
        &mut self,
        entity: &AttackableEntity,
        previous: EntityState,
    ) {
        self.events.push(BattleEvent::StateChanged {
            id: entity.id,
            from: previous,
            to: entity.state,
        });
    }

    fn on_attackable_entity_health_updated(
        &mut self,
        attacker: Option<&AttackableEntity>,
        target: &AttackableEntity,
        from_health: u32,
        to_health: u32,
        max_health: u32,
    ) {
        self.events.push(BattleEvent::HealthUpdated {
            attacker: attacker.map(|a| a.id),
            target: target.id,
            from: from_health,
            to: to_health,
            max: max_health,
        });
    }

    fn on_attackable_entity_walked(&mut self, entity: &AttackableEntity) {
        self.events.push(BattleEvent::Walked {
            id: entity.id,
            distance: entity.distance.to_bits(),
        });
    }

    fn on_attackable_entity_knocking_back(
        &mut self,
        entity: &AttackableEntity,
        knock_back_rate: Fixed,
    ) {
        self.events.push(BattleEvent::KnockingBack {
            id: entity.id,
            rate: knock_back_rate.to_bits(),
        });
    }

    fn on_available_cost_updated(
        &mut self,
        cost: Fixed,
        max_cost: Fixed,
        available_unit_ids: &[UnitTypeId],
    ) {
        self.events.push(BattleEvent::CostUpdated {
            cost: cost.to_bits(),
            max_cost: max_cost.to_bits(),
            available: available_unit_ids.to_vec(),
        });
    }

    fn on_game_over(&mut self, is_player_won: bool) {
        self.events.push(BattleEvent::GameOver { is_player_won });
    }

    fn should_engage_attackable_entity(
        &self,
        attacker: &AttackableEntity,
        target: &AttackableEntity,
    ) -> bool {
        self.engage_policy
            .as_ref()
            .map_or(true, |policy| policy(attacker, target))
    }

    fn should_damage(&self, attacker: &AttackableEntity, target: &AttackableEntity) -> bool {
        self.damage_policy
            .as_ref()
            .map_or(true, |policy| policy(attacker, target))
    }

    fn should_attackable_walk(&self, entity: &AttackableEntity) -> bool {
        self.walk_policy.as_ref().map_or(true, |policy| policy(entity))
    }
}
