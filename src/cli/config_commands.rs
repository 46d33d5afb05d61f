// Config command implementations
use martingale_grid_bot::core::calculations::{grid_levels, grid_quantity};
use martingale_grid_bot::{Config, ConfigValidator, TradingError, TradingResult};
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub fn init_config(config_path: &str, force: bool) -> TradingResult<()> {
    info!("🔧 Initializing configuration...");

    if Path::new(config_path).exists() && !force {
        warn!("⚠️  {} already exists, skipping (use --force to overwrite)", config_path);
        return Ok(());
    }

    let default_config = include_str!("../../config.toml.example");
    fs::write(config_path, default_config)?;
    info!("📝 Created {}", config_path);

    info!("💡 Next steps:");
    info!("   1. Edit {} with your grid parameters", config_path);
    info!("   2. Run: grid-bot validate");
    info!("   3. Run: grid-bot run --ticks 50");

    Ok(())
}

pub fn validate_config(config: &Config) -> TradingResult<()> {
    let validation = ConfigValidator::validate(&config.trading);
    validation.display();

    if !validation.passed {
        error!("❌ Configuration rejected. Cannot trade with these parameters.");
        return Err(TradingError::Configuration(validation.errors()));
    }

    info!("✅ Ready to trade {} ({})", config.trading.symbol, config.trading.strategy);
    Ok(())
}

pub fn show_levels(config: &Config, balance: Option<f64>) -> TradingResult<()> {
    let trading = &config.trading;
    let validation = ConfigValidator::validate(trading);
    if !validation.passed {
        validation.display();
        return Err(TradingError::Configuration(validation.errors()));
    }

    let balance = balance.unwrap_or(trading.seed_amount);
    let levels = grid_levels(trading.from_price, trading.to_price, trading.grid_count, trading.strategy);

    info!("🪜 {} {} ladder | {}x | balance {:.2}", trading.symbol, trading.strategy, trading.leverage, balance);
    println!("{:>5}  {:>4}  {:>14}  {:>14}  {:>14}", "Level", "Side", "Price", "Quantity", "Notional");

    let mut total_quantity = 0.0;
    for level in &levels {
        let quantity = grid_quantity(balance, trading.grid_count, trading.leverage, level.price);
        total_quantity += quantity;
        println!("{:>5}  {:>4}  {:>14.2}  {:>14.6}  {:>14.2}",
                 level.level, level.side, level.price, quantity, quantity * level.price);
    }

    println!("Total quantity if every level fills: {:.6}", total_quantity);
    Ok(())
}
