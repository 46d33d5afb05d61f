// Exchange client interface consumed by the trading engine

use crate::core::types::{MarketData, OrderFill, OrderRequest, OrderResponse, Position};
use crate::error::TradingResult;
use async_trait::async_trait;

/// Venue operations the engine needs. Implementations own their transport,
/// timeouts and authentication.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    async fn place_order(&self, order: OrderRequest) -> TradingResult<OrderResponse>;

    /// Best effort; `Ok(false)` means the venue refused the cancel
    async fn cancel_order(&self, order_id: &str) -> TradingResult<bool>;

    async fn get_market_data(&self, symbol: &str) -> TradingResult<MarketData>;

    /// Every fill the venue has reported for `symbol`
    async fn get_fills(&self, symbol: &str) -> TradingResult<Vec<OrderFill>>;

    async fn get_positions(&self) -> TradingResult<Vec<Position>>;

    async fn get_order_history(&self) -> TradingResult<Vec<OrderResponse>>;
}
