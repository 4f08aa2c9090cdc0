//! citycast - saved locations and current weather from the terminal

mod commands;
mod error_mapping;
mod selection;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use citycast_core::{AppError, Config, ConfigError, UnitSystem};
use citycast_locations::FileStore;
use clap::{Parser, Subcommand};

use crate::commands::Session;

/// Save cities and check their weather
#[derive(Parser, Debug)]
#[command(name = "citycast", version)]
#[command(about = "Saved locations and current weather")]
struct Args {
    /// Directory holding saved locations (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show saved locations in order
    List {
        /// Include current conditions for each location
        #[arg(long, short)]
        weather: bool,

        /// metric, imperial or standard
        #[arg(long, short)]
        units: Option<UnitSystem>,
    },

    /// Search for cities, marking those already saved
    Search { query: String },

    /// Search for a city and save one of the candidates
    Add {
        query: String,

        /// Which candidate to save (1-based)
        #[arg(long, short, default_value = "1")]
        pick: usize,
    },

    /// Remove a saved location by name or id
    Remove { city: String },

    /// Reorder saved locations, e.g. `reorder 2 1 3`
    Reorder {
        /// Current 1-based positions, listed in the new order
        #[arg(required = true)]
        positions: Vec<usize>,
    },

    /// Current weather for a saved location
    Weather {
        city: String,

        #[arg(long, short)]
        units: Option<UnitSystem>,

        /// Also look up a background photo
        #[arg(long)]
        photo: bool,
    },

    /// Clear all saved locations
    Reset,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "warn" };
    if let Err(e) = citycast_core::init_with_default_filter(filter) {
        eprintln!("Warning: {}", e);
    }

    match run(args).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {}", describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<String> {
    let (mut config, _) = Config::load_validated(args.config.as_deref())
        .map_err(|e| AppError::Config(ConfigError::Invalid(format!("{:#}", e))))?;

    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    tracing::debug!("Using data directory {}", config.data_dir.display());

    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    let backend = FileStore::new(config.data_dir.clone());
    let session = Session::new(config, backend);

    match args.command {
        Command::List { weather, units } => session.list(weather, units).await,
        Command::Search { query } => session.search(&query).await,
        Command::Add { query, pick } => session.add(&query, pick).await,
        Command::Remove { city } => session.remove(&city).await,
        Command::Reorder { positions } => session.reorder(&positions).await,
        Command::Weather { city, units, photo } => session.weather(&city, units, photo).await,
        Command::Reset => session.reset().await,
    }
}

/// Message shown to the user; full details go to the log
fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Service(msg)) => msg.clone(),
        Some(e @ AppError::Config(ConfigError::MissingSetting(setting))) => {
            format!("{} ({})", e.user_message(), setting)
        }
        Some(e @ AppError::Config(ConfigError::Invalid(detail))) => {
            format!("{} {}", e.user_message(), detail)
        }
        Some(e) => e.user_message().to_string(),
        None => format!("{:#}", err),
    }
}
