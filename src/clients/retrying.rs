// Decorator that retries order placement with exponential backoff

use crate::clients::exchange::ExchangeClient;
use crate::core::error_handling::RetryPolicy;
use crate::core::types::{MarketData, OrderFill, OrderRequest, OrderResponse, Position};
use crate::error::TradingResult;
use async_trait::async_trait;

pub struct RetryingExchange<E> {
    inner: E,
    policy: RetryPolicy,
}

impl<E: ExchangeClient> RetryingExchange<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<E: ExchangeClient> ExchangeClient for RetryingExchange<E> {
    async fn place_order(&self, order: OrderRequest) -> TradingResult<OrderResponse> {
        let label = format!("{} {} @ {:?}", order.side, order.symbol, order.price);
        let inner = &self.inner;
        self.policy
            .execute(&label, move || inner.place_order(order.clone()))
            .await
    }

    async fn cancel_order(&self, order_id: &str) -> TradingResult<bool> {
        self.inner.cancel_order(order_id).await
    }

    async fn get_market_data(&self, symbol: &str) -> TradingResult<MarketData> {
        self.inner.get_market_data(symbol).await
    }

    async fn get_fills(&self, symbol: &str) -> TradingResult<Vec<OrderFill>> {
        self.inner.get_fills(symbol).await
    }

    async fn get_positions(&self) -> TradingResult<Vec<Position>> {
        self.inner.get_positions().await
    }

    async fn get_order_history(&self) -> TradingResult<Vec<OrderResponse>> {
        self.inner.get_order_history().await
    }
}
