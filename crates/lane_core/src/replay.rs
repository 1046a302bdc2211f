//! Replay system for recording and playing back battles.
//!
//! A replay stores the master data, the battle configuration, every frame
//! delta and every spawn request together with the number of frames that had
//! run when it was made. Because the simulation is deterministic this is
//! enough to recreate the battle bit for bit; the final state hash verifies
//! it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::battle::{BattleLogic, SpawnRequest, TickEvents};
use crate::data::{BattleConfig, Catalog, MasterData, UnitTypeId};
use crate::delegate::BattleLogicDelegate;
use crate::entity::Side;
use crate::error::{BattleError, Result};
use crate::math::{fixed_serde, Fixed};

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// How a spawn request reached the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    /// [`BattleLogic::request_spawn_unit`]: spawned immediately.
    Spawn,
    /// [`BattleLogic::queue_spawn_unit`]: deferred to the next frame.
    Queue,
}

/// A single recorded input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayInput {
    /// Number of updates recorded before this input was made.
    pub frame: u64,
    /// How the request was made.
    pub kind: InputKind,
    /// The request itself.
    pub request: SpawnRequest,
}

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Master data the battle ran with.
    pub master: MasterData,
    /// Battle configuration.
    pub config: BattleConfig,
    /// Delta passed to every update, in order.
    #[serde(with = "fixed_vec_serde")]
    pub deltas: Vec<Fixed>,
    /// Spawn requests in the order they were made.
    pub inputs: Vec<ReplayInput>,
    /// Battle frame when recording stopped.
    pub final_frame: u64,
    /// Final state hash for verification.
    pub final_hash: u64,
}

mod fixed_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::math::Fixed;

    pub fn serialize<S: Serializer>(values: &[Fixed], serializer: S) -> Result<S::Ok, S::Error> {
        let bits: Vec<i64> = values.iter().map(|value| value.to_bits()).collect();
        bits.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Fixed>, D::Error> {
        let bits = Vec::<i64>::deserialize(deserializer)?;
        Ok(bits.into_iter().map(Fixed::from_bits).collect())
    }
}

impl Replay {
    /// Create an empty replay for a battle setup.
    #[must_use]
    pub const fn new(master: MasterData, config: BattleConfig) -> Self {
        Self {
            version: REPLAY_VERSION,
            master,
            config,
            deltas: Vec::new(),
            inputs: Vec::new(),
            final_frame: 0,
            final_hash: 0,
        }
    }

    /// Record a spawn request made before the next update.
    pub fn record_input(&mut self, kind: InputKind, unit: UnitTypeId, side: Side) {
        self.inputs.push(ReplayInput {
            frame: self.deltas.len() as u64,
            kind,
            request: SpawnRequest { unit, side },
        });
    }

    /// Record an update.
    pub fn record_frame(&mut self, delta: Fixed) {
        self.deltas.push(delta);
    }

    /// Finalize the replay with end-of-battle state.
    pub fn finalize(&mut self, final_frame: u64, final_hash: u64) {
        self.final_frame = final_frame;
        self.final_hash = final_hash;
    }

    /// Number of recorded updates.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.deltas.len()
    }

    /// Encode the replay.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| BattleError::Serialization(format!("Failed to serialize replay: {e}")))
    }

    /// Decode a replay, checking its format version.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a replay of the current version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| BattleError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(BattleError::Replay(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }
        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| BattleError::Replay(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or decoding fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| BattleError::Replay(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Re-run the recorded battle with a fresh delegate.
    ///
    /// # Errors
    /// Returns an error if the stored setup no longer builds a battle.
    pub fn play<D: BattleLogicDelegate>(&self, delegate: D) -> Result<BattleLogic<D>> {
        let catalog = Catalog::new(self.master.clone())?;
        let mut battle = BattleLogic::new(catalog, self.config.clone(), delegate)?;

        let mut inputs = self.inputs.iter().peekable();
        for frame in 0..=self.deltas.len() {
            while let Some(input) = inputs.next_if(|input| input.frame == frame as u64) {
                let SpawnRequest { unit, side } = input.request;
                match input.kind {
                    InputKind::Spawn => {
                        battle.request_spawn_unit(unit, side);
                    }
                    InputKind::Queue => battle.queue_spawn_unit(unit, side),
                }
            }
            if let Some(&delta) = self.deltas.get(frame) {
                battle.update(delta);
            }
        }
        Ok(battle)
    }

    /// Re-run the battle and check that it ends in the recorded state.
    ///
    /// # Errors
    /// Returns [`BattleError::Replay`] on a frame or hash mismatch.
    pub fn verify<D: BattleLogicDelegate>(&self, delegate: D) -> Result<BattleLogic<D>> {
        let battle = self.play(delegate)?;
        if battle.frame() != self.final_frame {
            return Err(BattleError::Replay(format!(
                "Final frame mismatch: expected {}, got {}",
                self.final_frame,
                battle.frame()
            )));
        }
        let hash = battle.state_hash();
        if hash != self.final_hash {
            return Err(BattleError::Replay(format!(
                "Final hash mismatch: expected {:#018x}, got {hash:#018x}",
                self.final_hash
            )));
        }
        Ok(battle)
    }
}

/// Runs a battle while recording every input into a [`Replay`].
#[derive(Debug)]
pub struct ReplayRecorder<D: BattleLogicDelegate> {
    battle: BattleLogic<D>,
    replay: Replay,
}

impl<D: BattleLogicDelegate> ReplayRecorder<D> {
    /// Build the battle and start recording.
    ///
    /// # Errors
    /// Returns an error if the setup does not build a battle.
    pub fn new(master: MasterData, config: BattleConfig, delegate: D) -> Result<Self> {
        let catalog = Catalog::new(master.clone())?;
        let battle = BattleLogic::new(catalog, config.clone(), delegate)?;
        Ok(Self {
            battle,
            replay: Replay::new(master, config),
        })
    }

    /// The battle being recorded.
    #[must_use]
    pub const fn battle(&self) -> &BattleLogic<D> {
        &self.battle
    }

    /// Mutable access to the delegate between frames.
    pub fn delegate_mut(&mut self) -> &mut D {
        self.battle.delegate_mut()
    }

    /// Record and forward [`BattleLogic::request_spawn_unit`].
    pub fn request_spawn_unit(&mut self, unit: UnitTypeId, side: Side) -> bool {
        self.replay.record_input(InputKind::Spawn, unit, side);
        self.battle.request_spawn_unit(unit, side)
    }

    /// Record and forward [`BattleLogic::queue_spawn_unit`].
    pub fn queue_spawn_unit(&mut self, unit: UnitTypeId, side: Side) {
        self.replay.record_input(InputKind::Queue, unit, side);
        self.battle.queue_spawn_unit(unit, side);
    }

    /// Record and forward [`BattleLogic::update`].
    pub fn update(&mut self, delta: Fixed) -> TickEvents {
        self.replay.record_frame(delta);
        self.battle.update(delta)
    }

    /// Stop recording and return the finalized replay and the battle.
    pub fn finish(mut self) -> (Replay, BattleLogic<D>) {
        self.replay
            .finalize(self.battle.frame(), self.battle.state_hash());
        (self.replay, self.battle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CastleMaster, CastleTypeId, EconomyConfig, SideConfig, UnitMaster};
    use crate::delegate::NoopDelegate;

    fn master() -> MasterData {
        MasterData {
            units: vec![UnitMaster {
                id: UnitTypeId(1),
                name: "unit".to_string(),
                cost: Fixed::from_num(5),
                max_health: 40,
                power: 7,
                speed: Fixed::from_num(1.5),
                range: Fixed::from_num(3),
                attack_interval: Fixed::from_num(2),
                knock_back: None,
            }],
            castles: vec![CastleMaster {
                id: CastleTypeId(1),
                name: "castle".to_string(),
                max_health: 60,
            }],
        }
    }

    fn config() -> BattleConfig {
        let side = SideConfig {
            castle: CastleTypeId(1),
            roster: vec![UnitTypeId(1)],
            economy: EconomyConfig {
                initial_cost: Fixed::from_num(10),
                max_cost: Fixed::from_num(50),
                recovery_per_frame: Fixed::from_num(0.5),
            },
        };
        BattleConfig {
            lane_length: Fixed::from_num(30),
            player: side.clone(),
            opponent: side,
            waves: Vec::new(),
        }
    }

    fn record() -> Replay {
        let mut recorder = ReplayRecorder::new(master(), config(), NoopDelegate).unwrap();
        recorder.request_spawn_unit(UnitTypeId(1), Side::Player);
        for frame in 0..40 {
            if frame % 10 == 0 {
                recorder.queue_spawn_unit(UnitTypeId(1), Side::Opponent);
            }
            recorder.update(Fixed::ONE);
        }
        recorder.request_spawn_unit(UnitTypeId(1), Side::Player);
        recorder.finish().0
    }

    #[test]
    fn test_replay_verifies() {
        let replay = record();
        assert_eq!(replay.frame_count(), 40);
        assert_eq!(replay.inputs.len(), 6);
        assert!(replay.verify(NoopDelegate).is_ok());
    }

    #[test]
    fn test_tampered_replay_fails() {
        let mut replay = record();
        replay.deltas[5] = Fixed::from_num(3);
        assert!(matches!(
            replay.verify(NoopDelegate),
            Err(BattleError::Replay(_))
        ));
    }

    #[test]
    fn test_bytes_roundtrip_and_version_check() {
        let replay = record();
        let bytes = replay.to_bytes().unwrap();
        assert_eq!(Replay::from_bytes(&bytes).unwrap(), replay);

        let mut old = replay;
        old.version = 0;
        let bytes = old.to_bytes().unwrap();
        assert!(matches!(
            Replay::from_bytes(&bytes),
            Err(BattleError::Replay(_))
        ));
    }
}
