//! Attackable entities: units and castles.
//!
//! Both variants share one attribute set ([`AttackableEntity`]) and differ
//! only in their [`EntityKind`] payload. Behaviour is dispatched by
//! capability (mobile vs. stationary) rather than by type hierarchy.
//!
//! # Lane geometry
//!
//! `distance` is the remaining distance to the enemy castle. A unit spawns at
//! `lane_length` and walks toward zero. Castles are stationary and keep a
//! distance of zero. Two opposing units at `d1` and `d2` are separated by
//! `d1 + d2 - lane_length`; a castle is reached once the attacker's own
//! distance is within its range.

use serde::{Deserialize, Serialize};

use crate::data::{CastleMaster, CastleTypeId, KnockBackStats, UnitMaster, UnitTypeId};
use crate::math::{fixed_serde, Fixed};
use crate::state::EntityState;

/// Unique identifier for entities.
pub type EntityId = u64;

/// Which side of the lane an entity fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    /// The human player.
    Player,
    /// The opponent (AI wave schedule or second player).
    Opponent,
}

impl Side {
    /// Check if this is the player side.
    #[must_use]
    pub const fn is_player(self) -> bool {
        matches!(self, Self::Player)
    }

    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Opponent,
            Self::Opponent => Self::Player,
        }
    }
}

/// Combat attributes of a unit, copied from its master record at spawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBody {
    /// Master record this unit was spawned from.
    pub unit_type: UnitTypeId,
    /// Damage per hit.
    pub power: u32,
    /// Walking speed per frame.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Engagement range.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Frames between hits.
    #[serde(with = "fixed_serde")]
    pub attack_interval: Fixed,
    /// Frames until the next hit is allowed.
    #[serde(with = "fixed_serde")]
    pub cooldown_remaining: Fixed,
    /// Knockback behaviour, if any.
    pub knock_back: Option<KnockBackStats>,
}

impl UnitBody {
    /// Check if the attack cooldown has elapsed.
    #[must_use]
    pub fn is_attack_ready(&self) -> bool {
        self.cooldown_remaining == Fixed::ZERO
    }
}

/// Variant payload of an attackable entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A mobile combat unit.
    Unit(UnitBody),
    /// A stationary castle, the objective of one side.
    Castle {
        /// Master record this castle was spawned from.
        castle_type: CastleTypeId,
    },
}

/// A unit or castle taking part in the battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackableEntity {
    /// Unique identifier, never reused during a battle.
    pub id: EntityId,
    /// Owning side.
    pub side: Side,
    /// Current state.
    pub state: EntityState,
    /// Current health points.
    pub health: u32,
    /// Maximum health points.
    pub max_health: u32,
    /// Remaining distance to the enemy castle.
    #[serde(with = "fixed_serde")]
    pub distance: Fixed,
    /// Knockback rate in `[0, 1]`; zero when not knocked back.
    #[serde(with = "fixed_serde")]
    pub knock_back_rate: Fixed,
    /// Partner of the current engagement, validated every tick.
    pub engaged_with: Option<EntityId>,
    /// Unit or castle payload.
    pub kind: EntityKind,
}

impl AttackableEntity {
    /// Build a unit from its master record. The id is assigned on insert.
    #[must_use]
    pub fn unit(master: &UnitMaster, side: Side, lane_length: Fixed) -> Self {
        Self {
            id: 0,
            side,
            state: EntityState::Idle,
            health: master.max_health,
            max_health: master.max_health,
            distance: lane_length,
            knock_back_rate: Fixed::ZERO,
            engaged_with: None,
            kind: EntityKind::Unit(UnitBody {
                unit_type: master.id,
                power: master.power,
                speed: master.speed,
                range: master.range,
                attack_interval: master.attack_interval,
                cooldown_remaining: Fixed::ZERO,
                knock_back: master.knock_back,
            }),
        }
    }

    /// Build a castle from its master record. The id is assigned on insert.
    #[must_use]
    pub fn castle(master: &CastleMaster, side: Side) -> Self {
        Self {
            id: 0,
            side,
            state: EntityState::Idle,
            health: master.max_health,
            max_health: master.max_health,
            distance: Fixed::ZERO,
            knock_back_rate: Fixed::ZERO,
            engaged_with: None,
            kind: EntityKind::Castle {
                castle_type: master.id,
            },
        }
    }

    /// Check if this entity belongs to the player.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        self.side.is_player()
    }

    /// Check if this entity is dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.state.is_dead()
    }

    /// Check if this entity can move.
    #[must_use]
    pub const fn is_mobile(&self) -> bool {
        matches!(self.kind, EntityKind::Unit(_))
    }

    /// Check if this entity is a castle.
    #[must_use]
    pub const fn is_castle(&self) -> bool {
        matches!(self.kind, EntityKind::Castle { .. })
    }

    /// Unit payload, if this is a unit.
    #[must_use]
    pub const fn as_unit(&self) -> Option<&UnitBody> {
        match &self.kind {
            EntityKind::Unit(body) => Some(body),
            EntityKind::Castle { .. } => None,
        }
    }

    /// Mutable unit payload, if this is a unit.
    pub fn as_unit_mut(&mut self) -> Option<&mut UnitBody> {
        match &mut self.kind {
            EntityKind::Unit(body) => Some(body),
            EntityKind::Castle { .. } => None,
        }
    }

    /// Unit type, if this is a unit.
    #[must_use]
    pub fn unit_type(&self) -> Option<UnitTypeId> {
        self.as_unit().map(|body| body.unit_type)
    }

    /// Gap between this entity and an opposing `target`.
    ///
    /// Negative when two units have walked past each other.
    #[must_use]
    pub fn gap_to(&self, target: &Self, lane_length: Fixed) -> Fixed {
        if target.is_castle() {
            self.distance
        } else {
            self.distance - (lane_length - target.distance)
        }
    }

    /// Check whether `target` is within this entity's engagement range.
    ///
    /// Castles never initiate engagements, so they have no range.
    #[must_use]
    pub fn is_in_range(&self, target: &Self, lane_length: Fixed) -> bool {
        match self.as_unit() {
            Some(body) => self.gap_to(target, lane_length) <= body.range,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn master() -> UnitMaster {
        UnitMaster {
            id: UnitTypeId(7),
            name: "unit.test".to_string(),
            cost: Fixed::from_num(10),
            max_health: 80,
            power: 12,
            speed: Fixed::from_num(2),
            range: Fixed::from_num(5),
            attack_interval: Fixed::from_num(10),
            knock_back: None,
        }
    }

    fn castle_master() -> CastleMaster {
        CastleMaster {
            id: CastleTypeId(1),
            name: "castle.test".to_string(),
            max_health: 300,
        }
    }

    #[test]
    fn test_unit_spawns_idle_at_lane_start() {
        let unit = AttackableEntity::unit(&master(), Side::Player, Fixed::from_num(100));
        assert_eq!(unit.state, EntityState::Idle);
        assert_eq!(unit.health, 80);
        assert_eq!(unit.distance, Fixed::from_num(100));
        assert!(unit.is_mobile());
        assert_eq!(unit.unit_type(), Some(UnitTypeId(7)));
    }

    #[test]
    fn test_castle_is_stationary() {
        let castle = AttackableEntity::castle(&castle_master(), Side::Opponent);
        assert!(castle.is_castle());
        assert!(!castle.is_mobile());
        assert!(!castle.is_player());
        assert!(castle.as_unit().is_none());
    }

    #[test]
    fn test_unit_gap_and_range() {
        let lane = Fixed::from_num(100);
        let mut a = AttackableEntity::unit(&master(), Side::Player, lane);
        let mut b = AttackableEntity::unit(&master(), Side::Opponent, lane);
        a.distance = Fixed::from_num(55);
        b.distance = Fixed::from_num(50);

        assert_eq!(a.gap_to(&b, lane), Fixed::from_num(5));
        assert!(a.is_in_range(&b, lane));

        a.distance = Fixed::from_num(56);
        assert!(!a.is_in_range(&b, lane));
    }

    #[test]
    fn test_castle_in_range_at_zero_distance() {
        let lane = Fixed::from_num(100);
        let mut unit = AttackableEntity::unit(&master(), Side::Player, lane);
        let castle = AttackableEntity::castle(&castle_master(), Side::Opponent);

        unit.distance = Fixed::from_num(6);
        assert!(!unit.is_in_range(&castle, lane));
        unit.distance = Fixed::ZERO;
        assert!(unit.is_in_range(&castle, lane));
        assert!(!castle.is_in_range(&unit, lane));
    }

    #[test]
    fn test_side_opponent() {
        assert_eq!(Side::Player.opponent(), Side::Opponent);
        assert_eq!(Side::Opponent.opponent(), Side::Player);
    }
}
