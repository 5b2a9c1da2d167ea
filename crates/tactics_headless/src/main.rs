//! Headless grid tactics runner.
//!
//! This binary runs a battle without any interface, controlled via JSON on
//! stdin/stdout. Designed for AI agents, CI testing, and determinism checks.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p tactics_headless -- run --scenario scenarios/duel.ron --seed 7
//!
//! # Replay the scenario script under 100 seeds
//! cargo run -p tactics_headless -- batch --scenario scenarios/duel.ron --count 100
//!
//! # Replay the script several times with one seed and compare hashes
//! cargo run -p tactics_headless -- verify --scenario scenarios/duel.ron --seed 12345 --runs 5
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tactics_headless::{
    batch::{run_batch, verify_determinism},
    runner::HeadlessRunner,
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless grid tactics runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive battle over stdin/stdout
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Seed for hit rolls
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Replay the scenario script under consecutive seeds
    Batch {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// First seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Maximum parallel runs (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,
    },

    /// Verify determinism by replaying the script with the same seed
    Verify {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run { scenario, seed } => cmd_run(&scenario, seed),
        Commands::Batch {
            scenario,
            count,
            seed,
            parallel,
        } => cmd_batch(&scenario, count, seed, parallel),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(&scenario, seed, runs),
    }
}

fn load_scenario(path: &Path) -> Scenario {
    match Scenario::load(path) {
        Ok(scenario) => {
            tracing::info!("Loaded scenario: {}", scenario.name);
            scenario
        }
        Err(e) => {
            eprintln!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a single interactive battle
fn cmd_run(path: &Path, seed: u64) {
    let scenario = load_scenario(path);
    tracing::info!("Starting interactive session with seed {}", seed);

    let mut runner = match HeadlessRunner::new(&scenario, seed) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Failed to set up battle: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runner.run_stdio() {
        eprintln!("I/O error: {}", e);
        std::process::exit(1);
    }
}

/// Replay the script under many seeds and print the summary
fn cmd_batch(path: &Path, count: u32, seed: u64, parallel: u32) {
    let scenario = load_scenario(path);

    if parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(parallel as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    match run_batch(&scenario, seed, count) {
        Ok((_, summary)) => match serde_json::to_string(&summary) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Failed to serialize summary: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Batch failed: {}", e);
            std::process::exit(1);
        }
    }
}

/// Verify determinism by running the same seed multiple times
fn cmd_verify(path: &Path, seed: u64, runs: u32) {
    let scenario = load_scenario(path);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    match verify_determinism(&scenario, seed, runs) {
        Ok(report) if report.deterministic => {
            eprintln!("PASS: All {} runs produced identical results", runs);
            eprintln!("  Hash: {:016x}", report.hashes[0]);
        }
        Ok(report) => {
            eprintln!("FAIL: Non-determinism detected!");
            for (i, hash) in report.hashes.iter().enumerate() {
                eprintln!("  Run {}: {:016x}", i, hash);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: Error during verification: {}", e);
            std::process::exit(1);
        }
    }
}
