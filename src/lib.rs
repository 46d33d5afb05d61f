// Martingale Grid Bot Library
//
// A grid trading control loop that averages into a position and exits it with a single take-profit order

pub mod core;
pub mod clients;
pub mod config;
pub mod error;       // Unified error handling
pub mod validation;  // Pre-flight validation

// Re-export core trading types
pub use core::{
    EngineSettings, GridLadderManager, GridLevel, GridOrder, Lifecycle, MarketData, OrderFill,
    OrderRequest, OrderResponse, OrderSide, OrderStatus, OrderType, Position, PositionBook,
    RetryPolicy, Strategy, TakeProfitController, TakeProfitOrder, TickReport, TradingOrchestrator,
    TradingSnapshot,
};

// Re-export error types
pub use error::{TradingError, TradingResult};

// Re-export validation types
pub use validation::{ConfigValidator, ValidationCheck, ValidationLevel, ValidationResult};

// Re-export client types
pub use clients::{ExchangeClient, PaperExchange, RetryingExchange};

// Re-export configuration
pub use config::{Config, ConfigError, EngineConfig, LoggingConfig, RetryConfig, TradingConfig};
