//! End-to-end battle scenarios.
//!
//! Each test drives a full `BattleLogic` through its public surface and
//! checks the notifications a presentation layer would see.

use lane_core::prelude::*;
use lane_test_utils::fixtures::{economy, fixed, BattleFixture, BRUISER, SOLDIER};
use lane_test_utils::recording::{BattleEvent, RecordingDelegate};

// =============================================================================
// Helpers
// =============================================================================

/// Update until `done` holds or `limit` frames have run. Returns the events
/// of the last update.
fn run_until<D: BattleLogicDelegate>(
    battle: &mut BattleLogic<D>,
    limit: u32,
    done: impl Fn(&TickEvents) -> bool,
) -> TickEvents {
    for _ in 0..limit {
        let events = battle.update(Fixed::ONE);
        if done(&events) {
            return events;
        }
    }
    panic!("condition not reached within {limit} frames");
}

fn unit_ids(battle: &BattleLogic<RecordingDelegate>) -> Vec<EntityId> {
    battle
        .entities()
        .filter(|e| e.is_mobile())
        .map(|e| e.id)
        .collect()
}

// =============================================================================
// Scenario A: simultaneous exchange
// =============================================================================

#[test]
fn equal_units_trade_blows_and_die_together() {
    let mut battle = BattleFixture::duel()
        .with_lane_length(20)
        .build(RecordingDelegate::new());
    assert!(battle.request_spawn_unit(SOLDIER, Side::Player));
    assert!(battle.request_spawn_unit(SOLDIER, Side::Opponent));
    let ids = unit_ids(&battle);
    let (a, b) = (ids[0], ids[1]);

    let first = run_until(&mut battle, 50, |events| !events.combat.hits.is_empty());
    assert_eq!(first.combat.hits.len(), 2);
    for id in [a, b] {
        let entity = battle.entity(id).unwrap();
        assert_eq!(entity.health, 50);
        assert_eq!(entity.state, EntityState::Locked);
    }

    let second = battle.update(Fixed::ONE);
    assert_eq!(second.combat.deaths.len(), 2);
    for id in [a, b] {
        let entity = battle.entity(id).unwrap();
        assert_eq!(entity.health, 0);
        assert_eq!(entity.state, EntityState::Dead);
    }

    // Dead units are removed at the start of the next frame
    let third = battle.update(Fixed::ONE);
    assert_eq!(third.removed, vec![a, b]);
    assert!(battle.entity(a).is_none());
}

// =============================================================================
// Scenario B: insufficient cost
// =============================================================================

#[test]
fn spawn_fails_when_cost_is_short() {
    let mut battle = BattleFixture::duel()
        .with_player_economy(economy(40, 100, 0.0))
        .build(RecordingDelegate::new());
    let events_before = battle.delegate().events().len();
    let hash_before = battle.state_hash();

    assert!(!battle.request_spawn_unit(SOLDIER, Side::Player));
    assert_eq!(
        battle.try_spawn_unit(SOLDIER, Side::Player),
        Err(SpawnRejected::InsufficientCost {
            required: fixed(50),
            available: fixed(40),
        })
    );

    assert_eq!(battle.entities().count(), 2);
    assert_eq!(battle.delegate().events().len(), events_before);
    assert_eq!(battle.state_hash(), hash_before);
    assert_eq!(battle.economy(Side::Player).available_cost(), fixed(40));
}

// =============================================================================
// Scenario C: every engagement vetoed
// =============================================================================

#[test]
fn vetoed_unit_walks_to_the_castle_and_attacks_it() {
    let delegate = RecordingDelegate::new().with_engage_policy(|_, _| false);
    let mut battle = BattleFixture::duel()
        .with_lane_length(20)
        .build(delegate);
    assert!(battle.request_spawn_unit(SOLDIER, Side::Player));
    assert!(battle.request_spawn_unit(BRUISER, Side::Opponent));
    let ids = unit_ids(&battle);
    let (runner, bystander) = (ids[0], ids[1]);
    let enemy_castle = battle.castle(Side::Opponent).unwrap().id;

    let mut passed_in_range = false;
    while battle.entity(runner).unwrap().state == EntityState::Idle {
        let runner_entity = battle.entity(runner).unwrap();
        let other = battle.entity(bystander).unwrap();
        passed_in_range |= runner_entity.is_in_range(other, fixed(20));
        battle.update(Fixed::ONE);
        assert!(battle.frame() < 50, "runner never engaged");
    }

    // The two units crossed within range of each other and ignored it
    assert!(passed_in_range);
    let runner_entity = battle.entity(runner).unwrap();
    assert_eq!(runner_entity.engaged_with, Some(enemy_castle));
    assert!(runner_entity.distance <= fixed(5));
    assert_eq!(
        battle.delegate().state_changes_of(bystander),
        Vec::<(EntityState, EntityState)>::new()
    );

    run_until(&mut battle, 50, |events| events.game_over.is_some());
    assert_eq!(battle.outcome(), Some(true));

    // Locked once for the whole siege, released when the castle fell
    assert_eq!(
        battle.delegate().state_changes_of(runner),
        vec![
            (EntityState::Idle, EntityState::Locked),
            (EntityState::Locked, EntityState::Idle),
        ]
    );
}

// =============================================================================
// Scenario D: castle destroyed
// =============================================================================

#[test]
fn castle_destruction_ends_the_battle_once() {
    let mut battle = BattleFixture::duel()
        .with_lane_length(20)
        .with_castle_health(100)
        .build(RecordingDelegate::new());
    assert!(battle.request_spawn_unit(SOLDIER, Side::Opponent));

    let events = run_until(&mut battle, 50, |events| events.game_over.is_some());
    assert_eq!(events.game_over, Some(false));
    assert!(battle.is_game_over());
    assert_eq!(battle.outcome(), Some(false));
    assert!(battle.castle(Side::Player).unwrap().is_dead());
    assert_eq!(battle.castle(Side::Player).unwrap().health, 0);
    assert_eq!(battle.delegate().game_over_count(), 1);
    assert_eq!(
        battle.delegate().events().last(),
        Some(&BattleEvent::GameOver {
            is_player_won: false
        })
    );

    // Frozen: nothing changes, nothing is announced, spawns fail
    let hash = battle.state_hash();
    let event_count = battle.delegate().events().len();
    for _ in 0..10 {
        let events = battle.update(Fixed::ONE);
        assert!(events.combat.hits.is_empty());
        assert!(events.game_over.is_none());
    }
    assert_eq!(battle.state_hash(), hash);
    battle.queue_spawn_unit(SOLDIER, Side::Player);
    battle.update(Fixed::ONE);
    assert_eq!(
        battle.try_spawn_unit(SOLDIER, Side::Player),
        Err(SpawnRejected::BattleOver)
    );
    assert_eq!(battle.delegate().events().len(), event_count);
    assert_eq!(battle.delegate().game_over_count(), 1);

    // The queued request is never acted on
    assert_eq!(battle.pending_spawns().count(), 1);
    assert_eq!(battle.entities().filter(|e| e.is_mobile()).count(), 1);
}

#[test]
fn castles_dying_together_is_not_a_player_win() {
    let mut battle = BattleFixture::duel()
        .with_lane_length(20)
        .with_castle_health(100)
        .build(RecordingDelegate::new());
    assert!(battle.request_spawn_unit(SOLDIER, Side::Player));
    assert!(battle.request_spawn_unit(SOLDIER, Side::Opponent));
    let delegate = RecordingDelegate::new().with_engage_policy(|_, _| false);
    let mut vetoed = BattleFixture::duel()
        .with_lane_length(20)
        .with_castle_health(100)
        .build(delegate);
    assert!(vetoed.request_spawn_unit(SOLDIER, Side::Player));
    assert!(vetoed.request_spawn_unit(SOLDIER, Side::Opponent));

    let events = run_until(&mut vetoed, 50, |events| events.game_over.is_some());
    assert_eq!(events.game_over, Some(false));
    assert!(vetoed.castle(Side::Player).unwrap().is_dead());
    assert!(vetoed.castle(Side::Opponent).unwrap().is_dead());

    // Without the veto the units fight each other instead
    run_until(&mut battle, 50, |events| !events.combat.deaths.is_empty());
    assert!(!battle.is_game_over());
}

// =============================================================================
// Waves
// =============================================================================

#[test]
fn opponent_waves_spawn_on_schedule_and_spend_cost() {
    let mut battle = BattleFixture::duel()
        .with_opponent_economy(economy(60, 100, 0.0))
        .with_wave(0, SOLDIER)
        .with_wave(1, SOLDIER)
        .build(RecordingDelegate::new());

    let first = battle.update(Fixed::ONE);
    assert_eq!(first.spawned.len(), 1);
    assert_eq!(battle.economy(Side::Opponent).available_cost(), fixed(10));

    let second = battle.update(Fixed::ONE);
    assert!(second.spawned.is_empty());
    assert_eq!(second.rejected.len(), 1);
    assert!(matches!(
        second.rejected[0].1,
        SpawnRejected::InsufficientCost { .. }
    ));
}
