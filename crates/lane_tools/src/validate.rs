//! Data loading and validation.
//!
//! Reads master data and battle configurations from RON files and checks
//! them the same way [`lane_core::battle::BattleLogic::new`] will, so bad
//! data is caught before a battle is ever started.

use std::fs;
use std::path::Path;

use lane_core::data::{BattleConfig, Catalog, MasterData};
use lane_core::error::BattleError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while loading data files.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Failed to read file.
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON file.
    #[error("Failed to parse RON file '{path}': {source}")]
    ParseError {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Master data or configuration validation failed.
    #[error("Validation failed for '{path}': {source}")]
    ValidationError {
        /// Path to the file.
        path: String,
        /// Underlying battle error.
        #[source]
        source: BattleError,
    },

    /// The battle itself reported an error.
    #[error(transparent)]
    Battle(#[from] BattleError),
}

/// Result type for data loading operations.
pub type DataLoadResult<T> = Result<T, DataLoadError>;

/// What a successful validation found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Number of unit records.
    pub units: usize,
    /// Number of castle records.
    pub castles: usize,
    /// Roster size of the player side.
    pub player_roster: usize,
    /// Roster size of the opponent side.
    pub opponent_roster: usize,
    /// Number of opponent wave entries.
    pub waves: usize,
}

fn read_ron<T: DeserializeOwned>(path: &Path) -> DataLoadResult<T> {
    let text = fs::read_to_string(path).map_err(|source| DataLoadError::IoError {
        path: path.display().to_string(),
        source,
    })?;
    ron::from_str(&text).map_err(|source| DataLoadError::ParseError {
        path: path.display().to_string(),
        source,
    })
}

/// Load master data from a RON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_master(path: &Path) -> DataLoadResult<MasterData> {
    let master = read_ron(path)?;
    tracing::debug!(path = %path.display(), "Loaded master data");
    Ok(master)
}

/// Load a battle configuration from a RON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_battle(path: &Path) -> DataLoadResult<BattleConfig> {
    let config = read_ron(path)?;
    tracing::debug!(path = %path.display(), "Loaded battle configuration");
    Ok(config)
}

/// Load master data and build a validated catalog from it.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or a record is invalid.
pub fn load_catalog(path: &Path) -> DataLoadResult<Catalog> {
    Catalog::new(load_master(path)?).map_err(|source| DataLoadError::ValidationError {
        path: path.display().to_string(),
        source,
    })
}

/// Validate a master data file and a battle configuration against it.
///
/// # Errors
///
/// Returns the first problem found: unreadable or malformed files, invalid
/// master records, or a configuration that references unknown records.
pub fn validate_files(master_path: &Path, battle_path: &Path) -> DataLoadResult<ValidationReport> {
    let master = load_master(master_path)?;
    let report_counts = (master.units.len(), master.castles.len());
    let catalog = Catalog::new(master).map_err(|source| DataLoadError::ValidationError {
        path: master_path.display().to_string(),
        source,
    })?;

    let config = load_battle(battle_path)?;
    catalog
        .check_config(&config)
        .map_err(|source| DataLoadError::ValidationError {
            path: battle_path.display().to_string(),
            source,
        })?;

    Ok(ValidationReport {
        units: report_counts.0,
        castles: report_counts.1,
        player_roster: config.player.roster.len(),
        opponent_roster: config.opponent.roster.len(),
        waves: config.waves.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_core::data::UnitTypeId;
    use lane_test_utils::fixtures::BattleFixture;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_valid_files_pass() {
        let dir = TempDir::new().unwrap();
        let fixture = BattleFixture::duel().with_wave(5, UnitTypeId(1));
        let master = write(&dir, "master.ron", &fixture.master_ron());
        let battle = write(&dir, "battle.ron", &fixture.config_ron());

        let report = validate_files(&master, &battle).unwrap();
        assert_eq!(
            report,
            ValidationReport {
                units: 2,
                castles: 1,
                player_roster: 2,
                opponent_roster: 2,
                waves: 1,
            }
        );
    }

    #[test]
    fn test_shipped_data_is_valid() {
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/data");
        let report = validate_files(&data.join("master.ron"), &data.join("battle.ron")).unwrap();
        assert_eq!(report.units, 3);
        assert_eq!(report.castles, 2);
        assert_eq!(report.waves, 5);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.ron");
        let err = load_master(&missing).unwrap_err();
        assert!(matches!(err, DataLoadError::IoError { .. }));
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "master.ron", "MasterData(units: [");
        let err = load_master(&path).unwrap_err();
        assert!(matches!(err, DataLoadError::ParseError { .. }));
        assert!(err.to_string().contains("master.ron"));
    }

    #[test]
    fn test_unknown_roster_unit_fails_validation() {
        let dir = TempDir::new().unwrap();
        let mut fixture = BattleFixture::duel();
        fixture.config.player.roster.push(UnitTypeId(42));
        let master = write(&dir, "master.ron", &fixture.master_ron());
        let battle = write(&dir, "battle.ron", &fixture.config_ron());

        let err = validate_files(&master, &battle).unwrap_err();
        match err {
            DataLoadError::ValidationError { path, source } => {
                assert!(path.ends_with("battle.ron"));
                assert!(matches!(source, BattleError::InvalidConfig(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_master_record_fails_validation() {
        let dir = TempDir::new().unwrap();
        let mut fixture = BattleFixture::duel();
        fixture.master.units[0].max_health = 0;
        let master = write(&dir, "master.ron", &fixture.master_ron());

        let err = load_catalog(&master).unwrap_err();
        assert!(matches!(err, DataLoadError::ValidationError { .. }));
    }
}
