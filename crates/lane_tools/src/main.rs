//! Lane Battle - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lane_tools::simulate::{run_simulation, verify_replay, SimulationOptions, SpawnArg};
use lane_tools::validate::{load_battle, load_master, validate_files, DataLoadResult};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lane-tools")]
#[command(about = "Development tools for the lane battle core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a master data file and a battle configuration
    Validate {
        /// Path to the master data RON file
        #[arg(default_value = "assets/data/master.ron")]
        master: PathBuf,
        /// Path to the battle configuration RON file
        #[arg(default_value = "assets/data/battle.ron")]
        battle: PathBuf,
    },
    /// Run a battle headless and print a JSON summary
    Simulate {
        /// Path to the master data RON file
        master: PathBuf,
        /// Path to the battle configuration RON file
        battle: PathBuf,
        /// Maximum number of frames to run
        #[arg(long, default_value_t = 600)]
        frames: u64,
        /// Spawn request as FRAME:UNIT[:SIDE] (repeatable)
        #[arg(long = "spawn")]
        spawns: Vec<SpawnArg>,
        /// Write a replay of the run to this file
        #[arg(long)]
        replay: Option<PathBuf>,
    },
    /// Re-run a replay file and check its final state
    Replay {
        /// Path to the replay file
        path: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!("Failed to render summary: {e}"),
    }
}

fn run(command: Commands) -> DataLoadResult<()> {
    match command {
        Commands::Validate { master, battle } => {
            tracing::info!(
                "Validating {} against {}",
                battle.display(),
                master.display()
            );
            let report = validate_files(&master, &battle)?;
            tracing::info!("Validation passed");
            print_json(&report);
        }
        Commands::Simulate {
            master,
            battle,
            frames,
            spawns,
            replay,
        } => {
            let options = SimulationOptions {
                frames,
                spawns,
                replay,
            };
            let summary = run_simulation(load_master(&master)?, load_battle(&battle)?, &options)?;
            print_json(&summary);
        }
        Commands::Replay { path } => {
            let summary = verify_replay(&path)?;
            print_json(&summary);
        }
    }
    Ok(())
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli.command) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
