//! Unified error handling for the martingale grid bot
//!
//! Every fallible operation in the engine returns a `TradingError`. The
//! orchestrator decides which kinds are fatal (configuration at start) and
//! which are logged and absorbed by the tick loop.

use std::fmt;
use std::io;

/// Main error type for the grid bot
#[derive(Debug, Clone, PartialEq)]
pub enum TradingError {
    // Configuration errors
    Configuration(Vec<String>),
    ConfigNotFound(String),
    ConfigParse(String),
    ConfigWrite(String),

    // Exchange errors
    OrderPlacement(String),
    InvalidOrder(String),     // Rejected for its content; resubmitting cannot help
    MarketData(String),
    Cancellation(String),
    Exchange(String),

    // Lifecycle errors
    AlreadyRunning,
    NotConfigured(String),

    // Should never happen
    InvariantViolation(String),
}

impl TradingError {
    /// Get a user-friendly error message with helpful context
    pub fn user_message(&self) -> String {
        match self {
            TradingError::Configuration(violations) => {
                let mut msg = String::from("Trading configuration rejected:\n");
                for violation in violations {
                    msg.push_str(&format!("  - {}\n", violation));
                }
                msg.push_str("\n💡 Fix the [trading] section of your config and try again");
                msg
            }
            TradingError::ConfigNotFound(path) => {
                format!(
                    "Configuration file not found: {}\n\n\
                    💡 Quick fix:\n\
                    1. Run: grid-bot init\n\
                    2. Edit the [trading] section\n\
                    3. Try again",
                    path
                )
            }
            TradingError::AlreadyRunning => {
                "Trading is already running\n\n💡 Stop the current run before starting a new one".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TradingError::OrderPlacement(_)
                | TradingError::MarketData(_)
                | TradingError::Exchange(_)
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TradingError::Configuration(_)
            | TradingError::ConfigNotFound(_)
            | TradingError::ConfigParse(_)
            | TradingError::ConfigWrite(_) => "config",

            TradingError::OrderPlacement(_)
            | TradingError::InvalidOrder(_)
            | TradingError::Cancellation(_) => "order",

            TradingError::MarketData(_)
            | TradingError::Exchange(_) => "exchange",

            TradingError::AlreadyRunning
            | TradingError::NotConfigured(_) => "lifecycle",

            TradingError::InvariantViolation(_) => "internal",
        }
    }
}

impl fmt::Display for TradingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradingError::Configuration(violations) => {
                write!(f, "Invalid trading configuration: {}", violations.join("; "))
            }
            TradingError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path)
            }
            TradingError::ConfigParse(msg) => {
                write!(f, "Configuration parse error: {}", msg)
            }
            TradingError::ConfigWrite(msg) => {
                write!(f, "Configuration write error: {}", msg)
            }

            TradingError::OrderPlacement(msg) => {
                write!(f, "Order placement failed: {}", msg)
            }
            TradingError::InvalidOrder(msg) => {
                write!(f, "Invalid order: {}", msg)
            }
            TradingError::MarketData(msg) => {
                write!(f, "Market data unavailable: {}", msg)
            }
            TradingError::Cancellation(msg) => {
                write!(f, "Order cancellation failed: {}", msg)
            }
            TradingError::Exchange(msg) => {
                write!(f, "Exchange error: {}", msg)
            }

            TradingError::AlreadyRunning => {
                write!(f, "Trading is already running")
            }
            TradingError::NotConfigured(what) => {
                write!(f, "{} is not configured", what)
            }

            TradingError::InvariantViolation(msg) => {
                write!(f, "Invariant violated: {}", msg)
            }
        }
    }
}

impl std::error::Error for TradingError {}

impl From<io::Error> for TradingError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => TradingError::ConfigNotFound(err.to_string()),
            _ => TradingError::ConfigWrite(format!("IO error: {}", err)),
        }
    }
}

impl From<toml::de::Error> for TradingError {
    fn from(err: toml::de::Error) -> Self {
        TradingError::ConfigParse(format!("TOML parse error: {}", err))
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::Exchange(format!("JSON error: {}", err))
    }
}

impl From<crate::config::ConfigError> for TradingError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::FileNotFound(path) => TradingError::ConfigNotFound(path),
            ConfigError::FileRead(msg) | ConfigError::Parse(msg) => TradingError::ConfigParse(msg),
            ConfigError::FileWrite(msg) | ConfigError::Serialize(msg) => TradingError::ConfigWrite(msg),
            ConfigError::Validation(msg) => TradingError::Configuration(vec![msg]),
        }
    }
}

/// Result type alias using TradingError
pub type TradingResult<T> = Result<T, TradingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TradingError::Configuration(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(err.to_string(), "Invalid trading configuration: a; b");

        let err = TradingError::NotConfigured("Grid ladder".to_string());
        assert_eq!(err.to_string(), "Grid ladder is not configured");
    }

    #[test]
    fn test_error_category() {
        assert_eq!(TradingError::Configuration(vec![]).category(), "config");
        assert_eq!(TradingError::OrderPlacement("x".into()).category(), "order");
        assert_eq!(TradingError::Cancellation("x".into()).category(), "order");
        assert_eq!(TradingError::InvalidOrder("x".into()).category(), "order");
        assert_eq!(TradingError::MarketData("x".into()).category(), "exchange");
        assert_eq!(TradingError::AlreadyRunning.category(), "lifecycle");
        assert_eq!(TradingError::InvariantViolation("x".into()).category(), "internal");
    }

    #[test]
    fn test_retryable() {
        assert!(TradingError::OrderPlacement("timeout".into()).is_retryable());
        assert!(!TradingError::Configuration(vec![]).is_retryable());
        assert!(!TradingError::AlreadyRunning.is_retryable());
        assert!(!TradingError::InvalidOrder("invalid quantity 0".into()).is_retryable());
        assert!(!TradingError::Cancellation("gone".into()).is_retryable());
    }

    #[test]
    fn test_user_message_lists_violations() {
        let err = TradingError::Configuration(vec!["Leverage must be between 1 and 100".to_string()]);
        let msg = err.user_message();
        assert!(msg.contains("  - Leverage must be between 1 and 100"));
        assert!(msg.contains("💡"));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "config.toml");
        let trading_err: TradingError = io_err.into();
        assert!(matches!(trading_err, TradingError::ConfigNotFound(_)));
    }
}
