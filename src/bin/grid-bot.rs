// Martingale Grid Bot - CLI
// Single entry point for configuring and paper-running the grid

use clap::{Parser, Subcommand};
use martingale_grid_bot::{Config, ConfigError};
use tracing::{error, info, Level};

// Load command modules from cli directory
#[path = "../cli/config_commands.rs"]
mod config_commands;
#[path = "../cli/trade_commands.rs"]
mod trade_commands;

#[derive(Parser)]
#[command(name = "grid-bot")]
#[command(version)]
#[command(about = "Martingale grid trading bot", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Check the trading parameters without placing anything
    Validate,

    /// Print the ladder the current configuration would place
    Levels {
        /// Override the seed amount used for sizing
        #[arg(short, long)]
        balance: Option<f64>,
    },

    /// Run the grid against the in-memory paper exchange
    Run {
        /// Number of ticks to drive back to back
        #[arg(short, long)]
        ticks: Option<u32>,

        /// Run on the configured tick interval for this many minutes
        #[arg(short, long, conflicts_with = "ticks")]
        minutes: Option<f64>,

        /// Opening price of the simulated market (defaults to from_price)
        #[arg(long)]
        start_price: Option<f64>,

        /// Max fractional price move per tick
        #[arg(long, default_value = "0.005")]
        volatility: f64,

        /// Random walk seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Print the final snapshot as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging first (before the full load so config errors are visible)
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Config::from_file(&cli.config)
            .ok()
            .and_then(|c| c.logging.level.parse::<Level>().ok())
            .unwrap_or(Level::INFO)
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("🚀 Martingale Grid Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("📁 Config: {}", cli.config);

    match cli.command {
        // Init doesn't require config (it creates it)
        Commands::Init { force } => {
            config_commands::init_config(&cli.config, force)?;
        }

        Commands::Validate => {
            let config = load_config_or_exit(&cli.config);
            config_commands::validate_config(&config)?;
        }

        Commands::Levels { balance } => {
            let config = load_config_or_exit(&cli.config);
            config_commands::show_levels(&config, balance)?;
        }

        Commands::Run { ticks, minutes, start_price, volatility, seed, json } => {
            let config = load_config_or_exit(&cli.config);
            let options = trade_commands::RunOptions {
                ticks,
                minutes,
                start_price,
                volatility,
                seed,
                json,
            };
            trade_commands::run_paper(&config, options).await?;
        }
    }

    Ok(())
}

/// Load config or exit with helpful error message
fn load_config_or_exit(path: &str) -> Config {
    match Config::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Configuration Error");
            error!("{}", e);

            if matches!(e, ConfigError::FileNotFound(_)) {
                error!("");
                error!("💡 Quick fix:");
                error!("   1. Run: grid-bot init");
                error!("   2. Edit {} with your grid parameters", path);
                error!("   3. Try again");
            }

            std::process::exit(1);
        }
    }
}
