//! Test fixtures and helpers.
//!
//! Builders for master records and battle configurations so tests can
//! state only the attributes they care about.

use fixed::types::I32F32;
use lane_core::battle::BattleLogic;
use lane_core::data::{
    BattleConfig, CastleMaster, CastleTypeId, Catalog, EconomyConfig, KnockBackStats, MasterData,
    SideConfig, UnitMaster, UnitTypeId, WaveEntry,
};
use lane_core::delegate::BattleLogicDelegate;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Unit type used by [`BattleFixture::duel`].
pub const SOLDIER: UnitTypeId = UnitTypeId(1);

/// Second unit type, with knockback.
pub const BRUISER: UnitTypeId = UnitTypeId(2);

/// Castle type used by the fixtures.
pub const KEEP: CastleTypeId = CastleTypeId(1);

/// A plain melee unit: 100 health, 50 power, speed 1, range 5, cost 50,
/// hitting every frame.
#[must_use]
pub fn soldier(id: UnitTypeId) -> UnitMaster {
    UnitMaster {
        id,
        name: format!("unit.{}.name", id.0),
        cost: fixed(50),
        max_health: 100,
        power: 50,
        speed: fixed(1),
        range: fixed(5),
        attack_interval: I32F32::ZERO,
        knock_back: None,
    }
}

/// A slow, tough unit that is knocked back at every quarter of its health.
#[must_use]
pub fn bruiser(id: UnitTypeId) -> UnitMaster {
    UnitMaster {
        id,
        name: format!("unit.{}.name", id.0),
        cost: fixed(30),
        max_health: 200,
        power: 20,
        speed: fixed_f(0.5),
        range: fixed(4),
        attack_interval: fixed(3),
        knock_back: Some(KnockBackStats {
            health_interval: fixed_f(0.25),
            frames: fixed(4),
            speed: fixed(2),
        }),
    }
}

/// A castle record.
#[must_use]
pub fn castle(id: CastleTypeId, max_health: u32) -> CastleMaster {
    CastleMaster {
        id,
        name: format!("castle.{}.name", id.0),
        max_health,
    }
}

/// Economy settings.
#[must_use]
pub fn economy(initial: i32, max: i32, recovery: f64) -> EconomyConfig {
    EconomyConfig {
        initial_cost: fixed(initial),
        max_cost: fixed(max),
        recovery_per_frame: fixed_f(recovery),
    }
}

/// Master data plus battle configuration, ready to build a battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleFixture {
    /// Unit and castle records.
    pub master: MasterData,
    /// Battle setup.
    pub config: BattleConfig,
}

impl BattleFixture {
    /// Two identical sides fielding [`SOLDIER`] and [`BRUISER`] on a lane of
    /// length 100, each with a 500 health castle and 100 starting cost.
    #[must_use]
    pub fn duel() -> Self {
        let side = SideConfig {
            castle: KEEP,
            roster: vec![SOLDIER, BRUISER],
            economy: economy(100, 200, 1.0),
        };
        Self {
            master: MasterData {
                units: vec![soldier(SOLDIER), bruiser(BRUISER)],
                castles: vec![castle(KEEP, 500)],
            },
            config: BattleConfig {
                lane_length: fixed(100),
                player: side.clone(),
                opponent: side,
                waves: Vec::new(),
            },
        }
    }

    /// Set the lane length.
    #[must_use]
    pub fn with_lane_length(mut self, lane_length: i32) -> Self {
        self.config.lane_length = fixed(lane_length);
        self
    }

    /// Set the health of the castle record.
    #[must_use]
    pub fn with_castle_health(mut self, max_health: u32) -> Self {
        self.master.castles = vec![castle(KEEP, max_health)];
        self
    }

    /// Replace the player's economy settings.
    #[must_use]
    pub fn with_player_economy(mut self, economy: EconomyConfig) -> Self {
        self.config.player.economy = economy;
        self
    }

    /// Replace the opponent's economy settings.
    #[must_use]
    pub fn with_opponent_economy(mut self, economy: EconomyConfig) -> Self {
        self.config.opponent.economy = economy;
        self
    }

    /// Replace a unit record (matched by id), or add it.
    #[must_use]
    pub fn with_unit(mut self, unit: UnitMaster) -> Self {
        match self.master.units.iter_mut().find(|u| u.id == unit.id) {
            Some(existing) => *existing = unit,
            None => self.master.units.push(unit),
        }
        self
    }

    /// Add an opponent wave entry.
    #[must_use]
    pub fn with_wave(mut self, frame: u64, unit: UnitTypeId) -> Self {
        self.config.waves.push(WaveEntry { frame, unit });
        self
    }

    /// Build the battle.
    ///
    /// # Panics
    ///
    /// Panics if the fixture does not describe a valid battle.
    pub fn build<D: BattleLogicDelegate>(&self, delegate: D) -> BattleLogic<D> {
        let catalog = Catalog::new(self.master.clone()).expect("fixture master data is valid");
        BattleLogic::new(catalog, self.config.clone(), delegate).expect("fixture config is valid")
    }

    /// Render the master data as RON, as the tools would read it from disk.
    ///
    /// # Panics
    ///
    /// Panics if serialization fails.
    #[must_use]
    pub fn master_ron(&self) -> String {
        ron::ser::to_string_pretty(&self.master, ron::ser::PrettyConfig::default())
            .expect("master data serializes")
    }

    /// Render the battle configuration as RON.
    ///
    /// # Panics
    ///
    /// Panics if serialization fails.
    #[must_use]
    pub fn config_ron(&self) -> String {
        ron::ser::to_string_pretty(&self.config, ron::ser::PrettyConfig::default())
            .expect("battle config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_core::delegate::NoopDelegate;

    #[test]
    fn test_duel_builds() {
        let battle = BattleFixture::duel().build(NoopDelegate);
        assert_eq!(battle.entities().count(), 2);
    }

    #[test]
    fn test_ron_output_parses_back() {
        let fixture = BattleFixture::duel().with_wave(10, SOLDIER);
        let master = MasterData::from_ron(&fixture.master_ron(), "master").unwrap();
        let config = BattleConfig::from_ron(&fixture.config_ron(), "battle").unwrap();
        assert_eq!(master, fixture.master);
        assert_eq!(config, fixture.config);
    }
}
