//! Determinism testing utilities.
//!
//! Replays and regression tests depend on a battle reaching the same state
//! hash, frame after frame, whenever it is fed the same inputs. The harness
//! here runs a battle several times, records the hash after every frame and
//! reports the first frame where two runs disagree.
//!
//! Sources of non-determinism guarded against elsewhere:
//!
//! - **Floating-point math**: all quantities use [`lane_core::math::Fixed`].
//! - **HashMap iteration order**: sweeps iterate in sorted entity id order.
//! - **Delegate side effects**: policies take `&self`, so a delegate cannot
//!   change its answers based on how often it was asked.

use std::thread;

use lane_core::battle::BattleLogic;
use lane_core::data::UnitTypeId;
use lane_core::delegate::BattleLogicDelegate;
use lane_core::entity::Side;
use lane_core::math::Fixed;

/// A spawn request scheduled for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledSpawn {
    /// Frame before which the request is made.
    pub frame: u64,
    /// Unit type.
    pub unit: UnitTypeId,
    /// Side.
    pub side: Side,
}

/// Per-frame hash traces of repeated runs of one battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismReport {
    /// One trace per run: the state hash before the first frame followed by
    /// the hash after every frame.
    pub traces: Vec<Vec<u64>>,
}

impl DeterminismReport {
    /// Final hash of every run.
    #[must_use]
    pub fn final_hashes(&self) -> Vec<u64> {
        self.traces
            .iter()
            .filter_map(|trace| trace.last().copied())
            .collect()
    }

    /// First frame at which any run disagrees with the first one.
    ///
    /// Frame 0 is the state right after construction.
    #[must_use]
    pub fn first_divergence(&self) -> Option<u64> {
        let (reference, others) = self.traces.split_first()?;
        others
            .iter()
            .filter_map(|trace| {
                let shorter = reference.len().min(trace.len());
                reference
                    .iter()
                    .zip(trace)
                    .position(|(a, b)| a != b)
                    .or_else(|| (reference.len() != trace.len()).then_some(shorter))
            })
            .min()
            .map(|frame| frame as u64)
    }

    /// Whether every run produced the same trace.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.first_divergence().is_none()
    }

    /// Assert that all runs matched, naming the first divergent frame.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if let Some(frame) = self.first_divergence() {
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 First divergent frame: {frame}\n\
                 Final hashes: {:?}",
                self.traces.len(),
                self.final_hashes()
            );
        }
    }
}

/// Drive a battle for `frames` frames of length one, issuing the scheduled
/// spawn requests before the matching update.
pub fn run_schedule<D: BattleLogicDelegate>(
    battle: &mut BattleLogic<D>,
    schedule: &[ScheduledSpawn],
    frames: u64,
) {
    drive(battle, schedule, frames, |_| {});
}

fn drive<D: BattleLogicDelegate>(
    battle: &mut BattleLogic<D>,
    schedule: &[ScheduledSpawn],
    frames: u64,
    mut after_frame: impl FnMut(&BattleLogic<D>),
) {
    for frame in 0..frames {
        for spawn in schedule.iter().filter(|spawn| spawn.frame == frame) {
            battle.request_spawn_unit(spawn.unit, spawn.side);
        }
        battle.update(Fixed::ONE);
        after_frame(battle);
    }
}

fn trace_schedule<D: BattleLogicDelegate>(
    battle: &mut BattleLogic<D>,
    schedule: &[ScheduledSpawn],
    frames: u64,
) -> Vec<u64> {
    let mut trace = vec![battle.state_hash()];
    drive(battle, schedule, frames, |battle| trace.push(battle.state_hash()));
    trace
}

/// Run a battle `runs` times with the same schedule and trace every frame.
///
/// # Example
///
/// ```no_run
/// use lane_core::prelude::*;
/// use lane_test_utils::determinism::{check_battle, ScheduledSpawn};
/// use lane_test_utils::fixtures::{BattleFixture, SOLDIER};
///
/// let schedule = [ScheduledSpawn { frame: 0, unit: SOLDIER, side: Side::Player }];
/// let report = check_battle(|| BattleFixture::duel().build(NoopDelegate), &schedule, 200, 3);
/// report.assert_deterministic();
/// ```
pub fn check_battle<D, F>(
    setup_fn: F,
    schedule: &[ScheduledSpawn],
    frames: u64,
    runs: usize,
) -> DeterminismReport
where
    D: BattleLogicDelegate,
    F: Fn() -> BattleLogic<D>,
{
    let traces = (0..runs)
        .map(|_| trace_schedule(&mut setup_fn(), schedule, frames))
        .collect();
    DeterminismReport { traces }
}

/// Run the same battle and schedule twice and compare every frame.
pub fn verify_battle_determinism<D, F>(setup_fn: F, schedule: &[ScheduledSpawn], frames: u64) -> bool
where
    D: BattleLogicDelegate,
    F: Fn() -> BattleLogic<D>,
{
    check_battle(setup_fn, schedule, frames, 2).is_deterministic()
}

/// Compare two unscripted runs frame by frame, finding the first divergence.
///
/// Useful for debugging non-determinism by finding exactly when battles
/// start to differ.
pub fn find_first_divergence<D, F>(setup_fn: F, frames: u64) -> Option<u64>
where
    D: BattleLogicDelegate,
    F: Fn() -> BattleLogic<D>,
{
    let frame = check_battle(setup_fn, &[], frames, 2).first_divergence();
    if let Some(frame) = frame {
        tracing::debug!(frame, "Battles diverged");
    }
    frame
}

/// Run N battles on scoped threads and collect the final hashes.
///
/// The setup function runs on each thread, so delegates need not be `Send`.
pub fn run_parallel_battles<D, F>(setup_fn: F, num_battles: usize, frames: u64) -> Vec<u64>
where
    D: BattleLogicDelegate,
    F: Fn() -> BattleLogic<D> + Sync,
{
    thread::scope(|s| {
        let handles: Vec<_> = (0..num_battles)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup_fn();
                    for _ in 0..frames {
                        battle.update(Fixed::ONE);
                    }
                    battle.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    })
}

/// Verify that a save/restore round trip preserves the battle exactly,
/// including every frame that follows.
pub fn verify_save_restore<D, F>(setup_fn: F, frames_before: u64, frames_after: u64) -> bool
where
    D: BattleLogicDelegate,
    F: Fn() -> BattleLogic<D>,
{
    let mut original = setup_fn();
    for _ in 0..frames_before {
        original.update(Fixed::ONE);
    }

    let Ok(bytes) = original.save_state() else {
        return false;
    };
    let mut restored = setup_fn();
    if restored.restore_state(&bytes).is_err() || restored.state_hash() != original.state_hash() {
        return false;
    }

    for _ in 0..frames_after {
        original.update(Fixed::ONE);
        restored.update(Fixed::ONE);
    }
    original.state_hash() == restored.state_hash()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of battles.
pub mod strategies {
    use lane_core::data::UnitTypeId;
    use lane_core::entity::Side;
    use lane_core::math::Fixed;
    use proptest::prelude::*;

    use super::ScheduledSpawn;

    /// Generate a side.
    pub fn arb_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Player), Just(Side::Opponent)]
    }

    /// Generate a frame delta between 0 and 4 in quarter steps.
    pub fn arb_delta() -> impl Strategy<Value = Fixed> {
        (0i32..=16).prop_map(|quarters| Fixed::from_num(quarters) / Fixed::from_num(4))
    }

    /// Generate a spawn request for one of `units` before a frame below
    /// `max_frame`.
    pub fn arb_spawn(units: Vec<UnitTypeId>, max_frame: u64) -> impl Strategy<Value = ScheduledSpawn> {
        (0..max_frame, proptest::sample::select(units), arb_side())
            .prop_map(|(frame, unit, side)| ScheduledSpawn { frame, unit, side })
    }

    /// Generate a spawn schedule of up to `max_len` requests.
    pub fn arb_schedule(
        units: Vec<UnitTypeId>,
        max_frame: u64,
        max_len: usize,
    ) -> impl Strategy<Value = Vec<ScheduledSpawn>> {
        proptest::collection::vec(arb_spawn(units, max_frame), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{BattleFixture, BRUISER, SOLDIER};
    use lane_core::delegate::NoopDelegate;

    fn schedule() -> Vec<ScheduledSpawn> {
        vec![
            ScheduledSpawn {
                frame: 0,
                unit: SOLDIER,
                side: Side::Player,
            },
            ScheduledSpawn {
                frame: 3,
                unit: BRUISER,
                side: Side::Opponent,
            },
            ScheduledSpawn {
                frame: 20,
                unit: BRUISER,
                side: Side::Player,
            },
        ]
    }

    #[test]
    fn test_report_finds_first_divergence() {
        let report = DeterminismReport {
            traces: vec![vec![1, 2, 3, 4], vec![1, 2, 3, 4], vec![1, 2, 9, 9]],
        };
        assert_eq!(report.first_divergence(), Some(2));
        assert!(!report.is_deterministic());
        assert_eq!(report.final_hashes(), vec![4, 4, 9]);

        let short = DeterminismReport {
            traces: vec![vec![1, 2, 3], vec![1, 2]],
        };
        assert_eq!(short.first_divergence(), Some(2));
    }

    #[test]
    fn test_report_traces_every_frame() {
        let report = check_battle(|| BattleFixture::duel().build(NoopDelegate), &schedule(), 40, 3);
        report.assert_deterministic();
        assert_eq!(report.traces.len(), 3);
        assert_eq!(report.traces[0].len(), 41);
    }

    #[test]
    fn test_battle_is_deterministic() {
        assert!(verify_battle_determinism(
            || BattleFixture::duel().build(NoopDelegate),
            &schedule(),
            150,
        ));
    }

    #[test]
    fn test_no_divergence() {
        let fixture = BattleFixture::duel().with_wave(0, SOLDIER).with_wave(5, BRUISER);
        assert_eq!(find_first_divergence(|| fixture.build(NoopDelegate), 100), None);
    }

    #[test]
    fn test_parallel_battles_match() {
        let fixture = BattleFixture::duel().with_wave(0, SOLDIER).with_wave(2, SOLDIER);
        let hashes = run_parallel_battles(|| fixture.build(NoopDelegate), 4, 120);
        assert!(hashes.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_save_restore_is_exact() {
        let fixture = BattleFixture::duel().with_wave(0, BRUISER).with_wave(1, SOLDIER);
        assert!(verify_save_restore(|| fixture.build(NoopDelegate), 30, 60));
    }
}
