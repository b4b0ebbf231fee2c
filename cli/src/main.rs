//! `checkin` - command-line front end for Daily Check-In.
//!
//! # Commands
//! - `checkin status` - today's state, progress and the twelve slots
//! - `checkin start <name> --category <c>` - begin a journey today
//! - `checkin check-in` - pay today's fee, mint the badge, record the day
//! - `checkin advance` - move the remaining days so the next one is due today
//! - `checkin reset --yes` - delete the journey
//! - `checkin fees` - the fee schedule
//! - `checkin recover` - settle a check-in interrupted before it was recorded

mod commands;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use checkin_config::CheckinConfig;
use checkin_types::HabitCategory;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "checkin")]
#[command(
    version,
    about = "Twelve-day habit journeys with an on-chain commitment per check-in"
)]
struct Cli {
    /// Config file (default: ~/.dailycheckin/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's state and progress
    Status,

    /// Start a new 12-day journey today
    Start {
        /// Habit name, at most 50 characters
        name: String,

        /// study, workout, running, social, health, creative or other
        #[arg(short, long, default_value = "other")]
        category: HabitCategory,
    },

    /// Check in for today
    CheckIn,

    /// Re-date the remaining days so the next one is due today
    Advance,

    /// Delete the journey
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show the fee for each day
    Fees,

    /// Settle a check-in that was interrupted before it was recorded
    Recover,
}

fn init_tracing(data_dir: &Path) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_path = data_dir.join("logs").join("checkin.log");
    let opened = log_path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(&log_path));

    match opened {
        Ok(file) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter)
                .init();
            tracing::debug!(path = %log_path.display(), "Logging initialized");
        }
        Err(e) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(env_filter)
                .init();
            tracing::warn!("Failed to open log file {}: {e}", log_path.display());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CheckinConfig::load_from(path)?,
        None => CheckinConfig::load()?.unwrap_or_default(),
    };
    let settings = config.resolve().context("Invalid configuration")?;
    init_tracing(&settings.data_dir);

    match cli.command {
        Commands::Status => commands::status(&settings),
        Commands::Start { name, category } => commands::start(&settings, &name, category),
        Commands::CheckIn => commands::check_in(&settings).await,
        Commands::Advance => commands::advance(&settings),
        Commands::Reset { yes } => commands::reset(&settings, yes),
        Commands::Fees => {
            print!("{}", commands::render_fees(&settings.fees));
            Ok(())
        }
        Commands::Recover => commands::recover(&settings).await,
    }
}
