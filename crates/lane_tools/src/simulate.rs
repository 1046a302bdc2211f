//! Headless battle runner.
//!
//! Runs a battle from data files without any presentation layer. Every
//! notification is logged through `tracing` and counted, and the run ends
//! with a [`SimulationSummary`] that the CLI prints as JSON.

use std::path::PathBuf;
use std::str::FromStr;

use lane_core::battle::BattleLogic;
use lane_core::data::{BattleConfig, MasterData, UnitTypeId};
use lane_core::delegate::BattleLogicDelegate;
use lane_core::entity::{AttackableEntity, Side};
use lane_core::math::Fixed;
use lane_core::replay::{Replay, ReplayRecorder};
use lane_core::state::EntityState;
use serde::Serialize;

use crate::validate::DataLoadResult;

/// How many notifications of each kind a battle sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NotificationCounts {
    /// Castle and unit spawns.
    pub spawned: u32,
    /// State changes.
    pub state_changed: u32,
    /// Health updates.
    pub health_updated: u32,
    /// Walk steps.
    pub walked: u32,
    /// Knockback frames.
    pub knocking_back: u32,
    /// Player cost updates.
    pub cost_updated: u32,
    /// Game over.
    pub game_over: u32,
}

/// Delegate that logs every notification and allows every policy.
#[derive(Debug, Default)]
pub struct LoggingDelegate {
    counts: NotificationCounts,
}

impl LoggingDelegate {
    /// Create a new logging delegate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far.
    #[must_use]
    pub const fn counts(&self) -> NotificationCounts {
        self.counts
    }
}

impl BattleLogicDelegate for LoggingDelegate {
    fn on_castle_entity_spawned(&mut self, entity: &AttackableEntity, is_player: bool) {
        self.counts.spawned += 1;
        tracing::info!(entity = entity.id, is_player, health = entity.health, "Castle placed");
    }

    fn on_unit_entity_spawned(&mut self, entity: &AttackableEntity) {
        self.counts.spawned += 1;
        tracing::info!(
            entity = entity.id,
            side = ?entity.side,
            unit = ?entity.unit_type(),
            "Unit spawned"
        );
    }

    fn on_attackable_entity_state_changed(
        &mut self,
        entity: &AttackableEntity,
        previous: EntityState,
    ) {
        self.counts.state_changed += 1;
        tracing::debug!(entity = entity.id, from = ?previous, to = ?entity.state, "State changed");
    }

    fn on_attackable_entity_health_updated(
        &mut self,
        attacker: Option<&AttackableEntity>,
        target: &AttackableEntity,
        from_health: u32,
        to_health: u32,
        max_health: u32,
    ) {
        self.counts.health_updated += 1;
        tracing::debug!(
            attacker = attacker.map(|a| a.id),
            target = target.id,
            from_health,
            to_health,
            max_health,
            "Health updated"
        );
    }

    fn on_attackable_entity_walked(&mut self, entity: &AttackableEntity) {
        self.counts.walked += 1;
        tracing::trace!(entity = entity.id, distance = %entity.distance, "Walked");
    }

    fn on_attackable_entity_knocking_back(
        &mut self,
        entity: &AttackableEntity,
        knock_back_rate: Fixed,
    ) {
        self.counts.knocking_back += 1;
        tracing::debug!(entity = entity.id, rate = %knock_back_rate, "Knocking back");
    }

    fn on_available_cost_updated(
        &mut self,
        cost: Fixed,
        max_cost: Fixed,
        available_unit_ids: &[UnitTypeId],
    ) {
        self.counts.cost_updated += 1;
        tracing::trace!(%cost, %max_cost, available = ?available_unit_ids, "Cost updated");
    }

    fn on_game_over(&mut self, is_player_won: bool) {
        self.counts.game_over += 1;
        tracing::info!(is_player_won, "Game over");
    }
}

/// A spawn request given on the command line as `FRAME:UNIT[:SIDE]`.
///
/// The side is `player` (default) or `opponent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnArg {
    /// Frame before which the request is made.
    pub frame: u64,
    /// Unit type id.
    pub unit: UnitTypeId,
    /// Requesting side.
    pub side: Side,
}

impl FromStr for SpawnArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let (Some(frame), Some(unit)) = (parts.next(), parts.next()) else {
            return Err(format!("expected FRAME:UNIT[:SIDE], got '{s}'"));
        };
        let frame = frame
            .trim()
            .parse()
            .map_err(|e| format!("invalid frame '{frame}': {e}"))?;
        let unit = unit
            .trim()
            .parse()
            .map(UnitTypeId)
            .map_err(|e| format!("invalid unit id '{unit}': {e}"))?;
        let side = match parts.next().map(str::trim) {
            None | Some("player") => Side::Player,
            Some("opponent") => Side::Opponent,
            Some(other) => return Err(format!("invalid side '{other}'")),
        };
        if parts.next().is_some() {
            return Err(format!("expected FRAME:UNIT[:SIDE], got '{s}'"));
        }
        Ok(Self { frame, unit, side })
    }
}

/// Options for a headless run.
#[derive(Debug, Clone, Default)]
pub struct SimulationOptions {
    /// Maximum number of frames to run.
    pub frames: u64,
    /// Spawn requests to issue.
    pub spawns: Vec<SpawnArg>,
    /// Where to write a replay of the run, if anywhere.
    pub replay: Option<PathBuf>,
}

/// Result of a headless run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    /// Frames processed.
    pub frames: u64,
    /// `"player"`, `"opponent"` or `None` while the battle is undecided.
    pub winner: Option<&'static str>,
    /// Remaining health of the player castle.
    pub player_castle_health: u32,
    /// Remaining health of the opponent castle.
    pub opponent_castle_health: u32,
    /// Units still on the lane.
    pub units_on_lane: usize,
    /// Spawn requests that were refused.
    pub refused_spawns: usize,
    /// Notifications sent to the delegate.
    pub notifications: NotificationCounts,
    /// Final state hash, as hex.
    pub final_hash: String,
}

impl SimulationSummary {
    /// Summarize a battle driven by a [`LoggingDelegate`].
    #[must_use]
    pub fn from_battle(battle: &BattleLogic<LoggingDelegate>, refused_spawns: usize) -> Self {
        let castle_health = |side| battle.castle(side).map_or(0, |castle| castle.health);
        Self {
            frames: battle.frame(),
            winner: battle
                .outcome()
                .map(|won| if won { "player" } else { "opponent" }),
            player_castle_health: castle_health(Side::Player),
            opponent_castle_health: castle_health(Side::Opponent),
            units_on_lane: battle
                .entities()
                .filter(|entity| entity.is_mobile() && !entity.is_dead())
                .count(),
            refused_spawns,
            notifications: battle.delegate().counts(),
            final_hash: format!("{:#018x}", battle.state_hash()),
        }
    }
}

/// Run a battle headless, optionally recording a replay.
///
/// The run stops early once the battle is decided.
///
/// # Errors
///
/// Returns an error if the data does not build a battle or the replay cannot
/// be written.
pub fn run_simulation(
    master: MasterData,
    config: BattleConfig,
    options: &SimulationOptions,
) -> DataLoadResult<SimulationSummary> {
    let mut recorder = ReplayRecorder::new(master, config, LoggingDelegate::new())?;
    let mut refused = 0;

    for frame in 0..options.frames {
        for spawn in options.spawns.iter().filter(|spawn| spawn.frame == frame) {
            if !recorder.request_spawn_unit(spawn.unit, spawn.side) {
                tracing::warn!(frame, unit = %spawn.unit, side = ?spawn.side, "Spawn refused");
                refused += 1;
            }
        }
        let events = recorder.update(Fixed::ONE);
        refused += events.rejected.len();
        if recorder.battle().is_game_over() {
            break;
        }
    }

    let (replay, battle) = recorder.finish();
    if let Some(path) = &options.replay {
        replay.save(path)?;
        tracing::info!(path = %path.display(), frames = replay.frame_count(), "Replay written");
    }
    Ok(SimulationSummary::from_battle(&battle, refused))
}

/// Load a replay, re-run it and check it ends in the recorded state.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the re-run diverges.
pub fn verify_replay(path: &std::path::Path) -> DataLoadResult<SimulationSummary> {
    let replay = Replay::load(path)?;
    let battle = replay.verify(LoggingDelegate::new())?;
    tracing::info!(frames = battle.frame(), "Replay verified");
    Ok(SimulationSummary::from_battle(&battle, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_test_utils::fixtures::{BattleFixture, BRUISER, SOLDIER};
    use tempfile::TempDir;

    fn options(frames: u64, spawns: Vec<SpawnArg>) -> SimulationOptions {
        SimulationOptions {
            frames,
            spawns,
            replay: None,
        }
    }

    #[test]
    fn test_spawn_arg_parsing() {
        assert_eq!(
            "12:1".parse::<SpawnArg>(),
            Ok(SpawnArg {
                frame: 12,
                unit: SOLDIER,
                side: Side::Player
            })
        );
        assert_eq!(
            "0:2:opponent".parse::<SpawnArg>(),
            Ok(SpawnArg {
                frame: 0,
                unit: BRUISER,
                side: Side::Opponent
            })
        );
        assert!("12".parse::<SpawnArg>().is_err());
        assert!("x:1".parse::<SpawnArg>().is_err());
        assert!("1:2:left".parse::<SpawnArg>().is_err());
        assert!("1:2:player:extra".parse::<SpawnArg>().is_err());
    }

    #[test]
    fn test_run_until_castle_falls() {
        let fixture = BattleFixture::duel()
            .with_lane_length(10)
            .with_castle_health(100);
        let spawns = vec![SpawnArg {
            frame: 0,
            unit: SOLDIER,
            side: Side::Player,
        }];

        let summary =
            run_simulation(fixture.master, fixture.config, &options(100, spawns)).unwrap();
        assert_eq!(summary.winner, Some("player"));
        assert_eq!(summary.opponent_castle_health, 0);
        assert_eq!(summary.player_castle_health, 100);
        assert!(summary.frames < 100);
        assert_eq!(summary.notifications.game_over, 1);
        assert_eq!(summary.notifications.spawned, 3);
    }

    #[test]
    fn test_refused_spawns_are_counted() {
        let fixture = BattleFixture::duel();
        let spawns = (0..4)
            .map(|_| SpawnArg {
                frame: 0,
                unit: SOLDIER,
                side: Side::Player,
            })
            .collect();

        let summary = run_simulation(fixture.master, fixture.config, &options(1, spawns)).unwrap();
        // 100 starting cost covers two soldiers
        assert_eq!(summary.refused_spawns, 2);
        assert_eq!(summary.units_on_lane, 2);
        assert_eq!(summary.winner, None);
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let fixture = BattleFixture::duel();
        let summary = run_simulation(fixture.master, fixture.config, &options(3, Vec::new())).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["frames"], 3);
        assert!(json["winner"].is_null());
        assert_eq!(json["notifications"]["spawned"], 2);
    }

    #[test]
    fn test_recorded_replay_verifies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("battle.replay");
        let fixture = BattleFixture::duel().with_wave(3, BRUISER);
        let spawns = vec![
            SpawnArg {
                frame: 0,
                unit: SOLDIER,
                side: Side::Player,
            },
            SpawnArg {
                frame: 10,
                unit: BRUISER,
                side: Side::Player,
            },
        ];
        let options = SimulationOptions {
            frames: 120,
            spawns,
            replay: Some(path.clone()),
        };

        let recorded = run_simulation(fixture.master, fixture.config, &options).unwrap();
        let verified = verify_replay(&path).unwrap();
        assert_eq!(verified.final_hash, recorded.final_hash);
        assert_eq!(verified.frames, recorded.frames);
        assert_eq!(verified.notifications, recorded.notifications);
    }
}
