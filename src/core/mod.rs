// Core trading logic modules

pub mod types;
pub mod calculations;
pub mod error_handling;
pub mod grid_ladder;
pub mod position_book;
pub mod take_profit;
pub mod orchestrator;

// Re-export commonly used types
pub use types::{
    GridLevel, GridOrder, MarketData, OrderFill, OrderRequest, OrderResponse, OrderSide,
    OrderStatus, OrderType, Position, Strategy, TakeProfitOrder,
};
pub use error_handling::RetryPolicy;
pub use grid_ladder::GridLadderManager;
pub use position_book::PositionBook;
pub use take_profit::TakeProfitController;
pub use orchestrator::{EngineSettings, Lifecycle, TickReport, TradingOrchestrator, TradingSnapshot};
