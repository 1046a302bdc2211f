//! Per-tick combat resolution.
//!
//! Engagements are recomputed from scratch every tick over a snapshot of the
//! live entities. Pairings refer to snapshot indices, never to entities, so a
//! partner dying mid-tick cannot leave a dangling reference behind.
//!
//! One resolution pass runs in five steps:
//!
//! 1. Snapshot the live entities in ascending id order and decay attack
//!    cooldowns.
//! 2. Pair every IDLE or LOCKED unit with its preferred opposing target in
//!    range, consulting the delegate for unit targets. Castles are always
//!    engaged once reached.
//! 3. Collect the hits of attackers whose cooldown has elapsed and whose hit
//!    the delegate authorizes.
//! 4. Apply all hits together, so an exchange within one tick is
//!    simultaneous.
//! 5. Release every LOCKED entity that is no longer part of a standing
//!    engagement back to IDLE.

use serde::{Deserialize, Serialize};

use crate::delegate::BattleLogicDelegate;
use crate::entity::{AttackableEntity, EntityId};
use crate::math::{decay_toward_zero, Fixed};
use crate::model::EntityModel;
use crate::state::EntityState;

/// An accepted attacker → target pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    /// Entity that chose the target.
    pub attacker: EntityId,
    /// Entity being attacked.
    pub target: EntityId,
}

/// A hit authorized during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    /// Entity dealing the damage.
    pub attacker: EntityId,
    /// Entity receiving the damage.
    pub target: EntityId,
    /// Damage dealt (attack power).
    pub damage: u32,
}

/// What one resolution pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombatReport {
    /// Pairings accepted this tick, in attacker id order.
    pub engagements: Vec<Engagement>,
    /// Hits applied this tick.
    pub hits: Vec<Hit>,
    /// Entities killed this tick.
    pub deaths: Vec<EntityId>,
}

/// Pairing of two snapshot indices.
#[derive(Debug, Clone, Copy)]
struct Pairing {
    attacker: usize,
    target: usize,
}

/// Run one combat resolution pass over `model`.
pub fn resolve<D>(model: &mut EntityModel, delta: Fixed, delegate: &mut D) -> CombatReport
where
    D: BattleLogicDelegate + ?Sized,
{
    let live: Vec<EntityId> = model
        .registry()
        .iter_sorted()
        .filter(|entity| !entity.is_dead())
        .map(|entity| entity.id)
        .collect();

    decay_cooldowns(model, &live, delta);
    let pairings = pair_entities(model, &live, delegate);
    let hits = collect_hits(model, &live, &pairings, delegate);

    let mut deaths = Vec::new();
    for hit in &hits {
        if model
            .apply_damage(hit.target, hit.damage, hit.attacker, delegate)
            .died
        {
            deaths.push(hit.target);
        }
    }

    release_engagements(model, &live, &pairings, delegate);

    CombatReport {
        engagements: pairings
            .iter()
            .map(|pairing| Engagement {
                attacker: live[pairing.attacker],
                target: live[pairing.target],
            })
            .collect(),
        hits,
        deaths,
    }
}

fn decay_cooldowns(model: &mut EntityModel, live: &[EntityId], delta: Fixed) {
    for &id in live {
        if let Some(body) = model.get_mut(id).and_then(AttackableEntity::as_unit_mut) {
            body.cooldown_remaining = decay_toward_zero(body.cooldown_remaining, delta);
        }
    }
}

/// Choose at most one target per attacker and lock the pair.
///
/// Candidates are ordered by: current partner first, then targets nobody has
/// paired with yet this tick, then smallest gap, then lowest id.
fn pair_entities<D>(model: &mut EntityModel, live: &[EntityId], delegate: &mut D) -> Vec<Pairing>
where
    D: BattleLogicDelegate + ?Sized,
{
    let lane_length = model.lane_length();
    let mut paired = vec![false; live.len()];
    let mut pairings = Vec::new();

    for (a, &attacker_id) in live.iter().enumerate() {
        let Some(attacker) = model.get(attacker_id) else {
            continue;
        };
        if !attacker.is_mobile() || !attacker.state.is_engageable() {
            continue;
        }

        let mut candidates: Vec<_> = live
            .iter()
            .enumerate()
            .filter_map(|(t, &target_id)| {
                let target = model.get(target_id)?;
                let eligible = target.side != attacker.side
                    && target.state.is_engageable()
                    && attacker.is_in_range(target, lane_length);
                eligible.then(|| {
                    let key = (
                        attacker.engaged_with != Some(target_id),
                        paired[t],
                        attacker.gap_to(target, lane_length),
                        target_id,
                    );
                    (key, t)
                })
            })
            .collect();
        candidates.sort_unstable_by_key(|(key, _)| *key);

        let accepted = candidates.into_iter().map(|(_, t)| t).find(|&t| {
            let Some(target) = model.get(live[t]) else {
                return false;
            };
            if target.is_castle() {
                return true;
            }
            let allowed = delegate.should_engage_attackable_entity(attacker, target);
            if !allowed {
                tracing::trace!(attacker = attacker_id, target = target.id, "Engagement vetoed");
            }
            allowed
        });
        let Some(t) = accepted else {
            continue;
        };

        let target_id = live[t];
        model.lock(attacker_id, target_id, delegate);
        if reciprocates(model, target_id, attacker_id) {
            model.lock(target_id, attacker_id, delegate);
        }
        paired[a] = true;
        paired[t] = true;
        pairings.push(Pairing {
            attacker: a,
            target: t,
        });
    }

    pairings
}

/// Whether an idle target should lock back onto its attacker.
///
/// A castle always does. A unit does only if the attacker is inside its own
/// range; otherwise it keeps walking until it is.
fn reciprocates(model: &EntityModel, target_id: EntityId, attacker_id: EntityId) -> bool {
    match (model.get(target_id), model.get(attacker_id)) {
        (Some(target), Some(attacker)) => {
            target.state == EntityState::Idle
                && (target.is_castle() || target.is_in_range(attacker, model.lane_length()))
        }
        _ => false,
    }
}

fn collect_hits<D>(
    model: &mut EntityModel,
    live: &[EntityId],
    pairings: &[Pairing],
    delegate: &mut D,
) -> Vec<Hit>
where
    D: BattleLogicDelegate + ?Sized,
{
    let mut hits = Vec::new();
    for pairing in pairings {
        let (attacker_id, target_id) = (live[pairing.attacker], live[pairing.target]);
        let (Some(attacker), Some(target)) = (model.get(attacker_id), model.get(target_id)) else {
            continue;
        };
        let Some(body) = attacker.as_unit() else {
            continue;
        };
        if attacker.state != EntityState::Locked || !body.is_attack_ready() {
            continue;
        }
        if !delegate.should_damage(attacker, target) {
            tracing::trace!(attacker = attacker_id, target = target_id, "Hit vetoed");
            continue;
        }

        let damage = body.power;
        let interval = body.attack_interval;
        if let Some(body) = model.get_mut(attacker_id).and_then(AttackableEntity::as_unit_mut) {
            body.cooldown_remaining = interval;
        }
        hits.push(Hit {
            attacker: attacker_id,
            target: target_id,
            damage,
        });
    }
    hits
}

/// Return LOCKED entities without a standing engagement to IDLE.
///
/// An engagement stands while its attacker is still LOCKED and its target is
/// still alive and not knocked back.
fn release_engagements<D>(
    model: &mut EntityModel,
    live: &[EntityId],
    pairings: &[Pairing],
    delegate: &mut D,
) where
    D: BattleLogicDelegate + ?Sized,
{
    let standing: Vec<(EntityId, EntityId)> = pairings
        .iter()
        .map(|pairing| (live[pairing.attacker], live[pairing.target]))
        .filter(|&(attacker, target)| {
            model
                .get(attacker)
                .is_some_and(|entity| entity.state == EntityState::Locked)
                && model
                    .get(target)
                    .is_some_and(|entity| entity.state.is_engageable())
        })
        .collect();

    for &id in live {
        if model.get(id).map(|entity| entity.state) != Some(EntityState::Locked) {
            continue;
        }
        let partner = standing
            .iter()
            .find(|(attacker, _)| *attacker == id)
            .map(|&(_, target)| target)
            .or_else(|| {
                standing
                    .iter()
                    .find(|(_, target)| *target == id)
                    .map(|&(attacker, _)| attacker)
            });

        match partner {
            Some(partner) => {
                if let Some(entity) = model.get_mut(id) {
                    entity.engaged_with = Some(partner);
                }
            }
            None => {
                model.set_state(id, EntityState::Idle, delegate);
            }
        }
    }
}
