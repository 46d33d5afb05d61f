// Configuration management for the martingale grid bot

use crate::core::types::{
    Strategy, DEFAULT_GRID_COUNT, DEFAULT_LEVERAGE, DEFAULT_TAKE_PROFIT, DEFAULT_TICK_INTERVAL_SECS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Parameters of one trading run. Only the price bounds change after start,
/// and only when the ladder is reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingConfig {
    pub symbol: String,
    pub leverage: u32,
    pub from_price: f64,
    pub to_price: f64,
    pub grid_count: usize,
    pub strategy: Strategy,
    pub take_profit_percent: f64,
    pub seed_amount: f64,       // Investment amount in quote currency
}

impl TradingConfig {
    /// Absolute width of the price range
    pub fn price_range(&self) -> f64 {
        (self.to_price - self.from_price).abs()
    }

    /// Same width, re-anchored at `start_price`: below it for long, above it for short
    pub fn reanchored(&self, start_price: f64) -> Self {
        let width = self.price_range();
        let to_price = match self.strategy {
            Strategy::Long => start_price - width,
            Strategy::Short => start_price + width,
        };
        Self {
            from_price: start_price,
            to_price,
            ..self.clone()
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: "BTC".to_string(),
            leverage: DEFAULT_LEVERAGE,
            from_price: 45000.0,
            to_price: 40500.0,
            grid_count: DEFAULT_GRID_COUNT,
            strategy: Strategy::Long,
            take_profit_percent: DEFAULT_TAKE_PROFIT,
            seed_amount: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub log_fills: bool,
    #[serde(default = "default_true")]
    pub log_ticks: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_fills: true,
            log_ticks: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub trading: TradingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trading: TradingConfig::default(),
            engine: EngineConfig::default(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

// Default value functions
fn default_tick_interval() -> u64 { DEFAULT_TICK_INTERVAL_SECS }
fn default_max_attempts() -> u32 { 3 }
fn default_initial_delay() -> u64 { 1000 }
fn default_max_delay() -> u64 { 10_000 }
fn default_backoff_multiplier() -> f64 { 2.0 }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            tracing::info!("📁 Created default config file: {}", path.as_ref().display());
            Ok(config)
        }
    }

    /// Validate the engine-level sections. Trading parameters are checked by
    /// `ConfigValidator` before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.tick_interval_secs == 0 {
            return Err(ConfigError::Validation("tick_interval_secs must be greater than 0".to_string()));
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Validation("max_attempts must be at least 1".to_string()));
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Validation("backoff_multiplier must be at least 1.0".to_string()));
        }

        if self.retry.max_delay_ms < self.retry.initial_delay_ms {
            return Err(ConfigError::Validation("max_delay_ms must not be below initial_delay_ms".to_string()));
        }

        if !matches!(self.logging.level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            return Err(ConfigError::Validation(format!("unknown log level '{}'", self.logging.level)));
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    FileRead(String),

    #[error("Failed to write config file: {0}")]
    FileWrite(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}
