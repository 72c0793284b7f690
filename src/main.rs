mod cli;
mod config;
mod data;
mod error;
mod models;
mod services;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::data::{CsvSeasonSource, SeasonStore};
use crate::models::ComparisonScope;
use crate::services::upset_report::UpsetCategory;

#[derive(Parser)]
#[command(name = "driveforge")]
#[command(about = "NFL drive explorer and spread-upset analysis")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the games of a week
    Games {
        #[arg(short, long)]
        season: u16,
        #[arg(short, long)]
        week: u8,
    },
    /// Summarize every drive of a game
    Drives {
        #[arg(short, long)]
        season: u16,
        #[arg(short, long)]
        game: String,
    },
    /// Show one drive and its plays
    Drive {
        #[arg(short, long)]
        season: u16,
        #[arg(short, long)]
        game: String,
        #[arg(short, long)]
        drive: u32,
    },
    /// Suggest drives where win probability crossed 50%
    Swings {
        #[arg(short, long)]
        season: u16,
        #[arg(short, long)]
        week: Option<u8>,
    },
    /// Fingerprint a drive against the median drive of a scope
    Compare {
        #[arg(short, long)]
        season: u16,
        #[arg(short, long)]
        game: String,
        #[arg(short, long)]
        drive: u32,
        /// game, week, season or all
        #[arg(long, default_value = "season")]
        scope: ComparisonScope,
    },
    /// Classify games against the pregame spread
    Classify {
        /// Single season (defaults to every configured season)
        #[arg(short, long)]
        season: Option<u16>,
        /// Directory to write classified_games.csv and big_upsets.csv
        #[arg(short, long)]
        export: Option<PathBuf>,
    },
    /// Browse upsets and the upset report
    Upsets {
        #[arg(short, long, value_enum, default_value = "all-upsets")]
        category: UpsetCategory,
        #[arg(short, long)]
        season: Option<u16>,
        #[arg(short, long)]
        team: Option<String>,
    },
    /// Drive win probability from the eventual winner's side
    WinnerDrives {
        #[arg(short, long)]
        season: u16,
        #[arg(short, long)]
        game: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    tracing::debug!("Configuration: {:?}", config);

    let source = CsvSeasonSource::new(&config.season_data_dir);
    let store = SeasonStore::new(Arc::new(source));
    let json = cli.json;

    match cli.command {
        Commands::Games { season, week } => {
            cli::show_games(&store, season, week, json).await?;
        }
        Commands::Drives { season, game } => {
            cli::show_drives(&store, season, &game, json).await?;
        }
        Commands::Drive { season, game, drive } => {
            cli::show_drive(&store, season, &game, drive, json).await?;
        }
        Commands::Swings { season, week } => {
            cli::suggest_swings(&store, season, week, json).await?;
        }
        Commands::Compare { season, game, drive, scope } => {
            tracing::info!("Comparing drive {} of {} ({} scope)", drive, game, scope);
            cli::compare_drive(&store, &config, season, &game, drive, scope, json).await?;
        }
        Commands::Classify { season, export } => {
            tracing::info!("Classifying games...");
            cli::classify_games(&store, &config, season, export.as_deref(), json).await?;
        }
        Commands::Upsets { category, season, team } => {
            cli::explore_upsets(&store, &config, category, season, team.as_deref(), json).await?;
        }
        Commands::WinnerDrives { season, game } => {
            cli::show_winner_drives(&store, season, &game, json).await?;
        }
    }

    Ok(())
}
