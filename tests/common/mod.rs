// Common test utilities and helpers
#![allow(dead_code)]

use martingale_grid_bot::{
    EngineSettings, PaperExchange, Strategy, TradingConfig, TradingOrchestrator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const SYMBOL: &str = "BTC";

/// Long ladder 100 -> 90 in five 2.0 steps, 1x, 5% take profit, 100 seed
pub fn create_test_config() -> TradingConfig {
    TradingConfig {
        symbol: SYMBOL.to_string(),
        leverage: 1,
        from_price: 100.0,
        to_price: 90.0,
        grid_count: 5,
        strategy: Strategy::Long,
        take_profit_percent: 5.0,
        seed_amount: 100.0,
    }
}

/// Short ladder selling 110 -> 118, 10% take profit
pub fn create_short_config() -> TradingConfig {
    TradingConfig {
        from_price: 100.0,
        to_price: 110.0,
        strategy: Strategy::Short,
        take_profit_percent: 10.0,
        ..create_test_config()
    }
}

/// Paper venue quoting `price` with no random walk
pub fn paper_exchange(price: f64) -> Arc<PaperExchange> {
    Arc::new(PaperExchange::new().with_price(SYMBOL, price))
}

/// Orchestrator whose ticks are driven by the test
pub fn manual_orchestrator(exchange: Arc<PaperExchange>) -> TradingOrchestrator {
    TradingOrchestrator::new(exchange, EngineSettings::manual())
}

/// Create a temporary directory holding a config path that does not exist yet
pub fn create_temp_config_path() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    (temp_dir, config_path)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {} to be within 1e-6 of {}",
        actual,
        expected
    );
}
