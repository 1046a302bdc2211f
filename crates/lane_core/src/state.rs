//! Entity state machine.
//!
//! Every attackable entity is in exactly one [`EntityState`]. The legal
//! transitions are:
//!
//! ```text
//!   IDLE ──► LOCKED ──► IDLE
//!    │         │
//!    ▼         ▼
//!   WAIT ──► IDLE     any non-DEAD ──► DEAD
//! ```
//!
//! DEAD is absorbing. Anything else is rejected without effect; a frame's
//! worth of stale combat output touching a dead entity is normal churn, so
//! rejection is reported as a value rather than an error.

use serde::{Deserialize, Serialize};

/// State of an attackable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EntityState {
    /// Exists and is not acting; may walk or be engaged.
    #[default]
    Idle,
    /// Engaged in combat. Movement is suspended.
    Locked,
    /// Terminal. Health has reached zero.
    Dead,
    /// Temporarily inert (knockback window). Cannot be engaged.
    Wait,
}

impl EntityState {
    /// Check whether the table allows moving from `self` to `next`.
    ///
    /// A transition into the current state is not a transition and
    /// returns `false`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        use EntityState::*;
        matches!(
            (self, next),
            (Idle, Locked)
                | (Idle, Wait)
                | (Locked, Idle)
                | (Wait, Idle)
                | (Idle, Dead)
                | (Locked, Dead)
                | (Wait, Dead)
        )
    }

    /// Check if this state is terminal.
    #[must_use]
    pub const fn is_dead(self) -> bool {
        matches!(self, Self::Dead)
    }

    /// Check if an entity in this state may take part in an engagement.
    #[must_use]
    pub const fn is_engageable(self) -> bool {
        matches!(self, Self::Idle | Self::Locked)
    }
}

/// Outcome of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The state changed. Carries the state that was left.
    Changed {
        /// State before the transition.
        previous: EntityState,
    },
    /// The entity was already in the requested state.
    Unchanged,
    /// The table does not allow this transition.
    Rejected,
}

impl Transition {
    /// Check whether the visible state changed.
    #[must_use]
    pub const fn changed(self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Apply a transition to `current` if the table allows it.
pub fn transition(current: &mut EntityState, next: EntityState) -> Transition {
    if *current == next {
        return Transition::Unchanged;
    }
    if !current.can_transition_to(next) {
        tracing::trace!(from = ?*current, to = ?next, "Rejected state transition");
        return Transition::Rejected;
    }
    let previous = *current;
    *current = next;
    Transition::Changed { previous }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EntityState; 4] = [
        EntityState::Idle,
        EntityState::Locked,
        EntityState::Dead,
        EntityState::Wait,
    ];

    #[test]
    fn test_default_is_idle() {
        assert_eq!(EntityState::default(), EntityState::Idle);
    }

    #[test]
    fn test_dead_is_absorbing() {
        for next in ALL {
            let mut state = EntityState::Dead;
            let outcome = transition(&mut state, next);
            assert_eq!(state, EntityState::Dead);
            assert!(!outcome.changed());
        }
    }

    #[test]
    fn test_every_live_state_can_die() {
        for from in [EntityState::Idle, EntityState::Locked, EntityState::Wait] {
            let mut state = from;
            assert_eq!(
                transition(&mut state, EntityState::Dead),
                Transition::Changed { previous: from }
            );
        }
    }

    #[test]
    fn test_locked_cannot_enter_wait_directly() {
        let mut state = EntityState::Locked;
        assert_eq!(
            transition(&mut state, EntityState::Wait),
            Transition::Rejected
        );
        assert_eq!(state, EntityState::Locked);
    }

    #[test]
    fn test_wait_cannot_lock() {
        let mut state = EntityState::Wait;
        assert_eq!(
            transition(&mut state, EntityState::Locked),
            Transition::Rejected
        );
    }

    #[test]
    fn test_same_state_is_unchanged() {
        for s in ALL {
            let mut state = s;
            assert_eq!(transition(&mut state, s), Transition::Unchanged);
        }
    }

    #[test]
    fn test_engageable_states() {
        assert!(EntityState::Idle.is_engageable());
        assert!(EntityState::Locked.is_engageable());
        assert!(!EntityState::Wait.is_engageable());
        assert!(!EntityState::Dead.is_engageable());
    }
}
