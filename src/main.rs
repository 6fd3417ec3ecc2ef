use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pelada_ratings::{api, cli, config::Config};

#[derive(Parser)]
#[command(name = "pelada")]
#[command(about = "Player ratings for weekly pickup football")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Overrides the PORT environment variable
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Initialize the database
    InitDb {
        /// Delete all players, matches and history first
        #[arg(long)]
        reset: bool,
        /// Load the demo roster and matches
        #[arg(long)]
        seed: bool,
    },
    /// Recompute and persist every player's rating
    Recalculate,
    /// Import a players/matches JSON export (either match shape)
    Import {
        path: String,
    },
    /// Show a player card
    Player {
        #[arg(short, long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();

    match cli.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.port = port;
            }
            tracing::info!("Starting Pelada API server on port {}", config.port);
            api::serve(&config).await?;
        }
        Some(Commands::InitDb { reset, seed }) => {
            tracing::info!("Initializing database...");
            cli::init_db(&config, reset, seed).await?;
        }
        Some(Commands::Recalculate) => {
            tracing::info!("Recalculating ratings...");
            cli::recalculate(&config).await?;
        }
        Some(Commands::Import { path }) => {
            tracing::info!("Importing snapshot from {}", path);
            cli::import_snapshot(&config, &path).await?;
        }
        Some(Commands::Player { name }) => {
            tracing::info!("Querying player: {}", name);
            cli::show_player(&config, &name).await?;
        }
        None => {
            // Default to serving
            tracing::info!("Starting Pelada API server on port {}", config.port);
            api::serve(&config).await?;
        }
    }

    Ok(())
}
