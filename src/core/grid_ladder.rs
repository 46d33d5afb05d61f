// Grid ladder: the limit orders of the current epoch

use crate::clients::exchange::ExchangeClient;
use crate::config::TradingConfig;
use crate::core::calculations::{grid_levels, grid_quantity};
use crate::core::types::{GridLevel, GridOrder, OrderRequest, OrderStatus};
use crate::error::{TradingError, TradingResult};
use futures_util::future::join_all;
use tracing::{debug, info, warn};

const FILL_EPSILON: f64 = 1e-12;

/// Owns the grid orders of one epoch. The order set is replaced wholesale on
/// every placement; individual orders only leave `Pending` through a fill or
/// a cancel. A partially filled order stays `Partial` until its quantity is
/// reached.
#[derive(Debug, Clone, Default)]
pub struct GridLadderManager {
    config: Option<TradingConfig>,
    orders: Vec<GridOrder>,
}

impl GridLadderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a new config; orders from a previous run are forgotten
    pub fn configure(&mut self, config: TradingConfig) {
        self.config = Some(config);
        self.orders.clear();
    }

    pub fn levels(&self) -> TradingResult<Vec<GridLevel>> {
        let config = self.require_config()?;
        Ok(grid_levels(config.from_price, config.to_price, config.grid_count, config.strategy))
    }

    /// Submit one limit order per level concurrently and keep whatever the
    /// exchange accepted. A partially placed ladder is still a valid ladder.
    pub async fn place_ladder(&mut self, exchange: &dyn ExchangeClient, balance: f64) -> TradingResult<Vec<GridOrder>> {
        let config = self.require_config()?.clone();
        let levels = self.levels()?;

        let submissions = levels.iter().filter(|level| level.price > 0.0).map(|level| {
            let quantity = grid_quantity(balance, config.grid_count, config.leverage, level.price);
            let request = OrderRequest::limit(&config.symbol, level.side, quantity, level.price)
                .with_leverage(config.leverage);
            async move { (level, quantity, exchange.place_order(request).await) }
        });
        let results = join_all(submissions).await;

        let mut placed = Vec::with_capacity(results.len());
        let mut failed = levels.len() - results.len();
        if failed > 0 {
            warn!("⚠️  Skipped {} grid level(s) at or below zero", failed);
        }

        for (level, quantity, result) in results {
            match result {
                Ok(response) => {
                    debug!("📌 Level {} {} {:.6} @ {:.2} -> {}",
                           level.level, level.side, quantity, level.price, response.order_id);
                    placed.push(GridOrder {
                        id: response.order_id,
                        price: level.price,
                        quantity,
                        side: level.side,
                        status: OrderStatus::Pending,
                        grid_level: level.level,
                        filled_quantity: 0.0,
                    });
                }
                Err(e) => {
                    warn!("❌ Grid level {} @ {:.2} not placed: {}", level.level, level.price, e);
                    failed += 1;
                }
            }
        }

        info!("🪜 Placed {}/{} grid orders for {} ({})",
              placed.len(), levels.len(), config.symbol, config.strategy);
        if failed > 0 {
            warn!("⚠️  Ladder degraded: {} level(s) missing", failed);
        }

        self.orders = placed.clone();
        Ok(placed)
    }

    /// Best-effort cancel of every open order, partially filled ones included.
    /// Orders are marked cancelled locally whatever the exchange answers;
    /// returns how many were marked.
    pub async fn cancel_all(&mut self, exchange: &dyn ExchangeClient) -> usize {
        let pending: Vec<String> = self.pending_orders().iter().map(|o| o.id.clone()).collect();
        if pending.is_empty() {
            return 0;
        }

        let results = join_all(pending.iter().map(|id| exchange.cancel_order(id))).await;
        for (id, result) in pending.iter().zip(results) {
            match result {
                Ok(true) => {}
                Ok(false) => debug!("Exchange did not cancel {}", id),
                Err(e) => warn!("⚠️  Cancel of {} failed: {}", id, e),
            }
        }

        for order in self.orders.iter_mut().filter(|o| o.is_open()) {
            order.status = OrderStatus::Cancelled;
        }

        info!("🧹 Cancelled {} pending grid order(s)", pending.len());
        pending.len()
    }

    /// Cancel what is left and lay a fresh ladder of the same width anchored at `start_price`
    pub async fn reset(
        &mut self,
        exchange: &dyn ExchangeClient,
        start_price: f64,
        balance: f64,
    ) -> TradingResult<Vec<GridOrder>> {
        let reanchored = self.require_config()?.reanchored(start_price);
        self.cancel_all(exchange).await;

        info!("🔄 Resetting grid: {:.2} -> {:.2}", reanchored.from_price, reanchored.to_price);
        self.config = Some(reanchored);
        self.place_ladder(exchange, balance).await
    }

    /// Flip the named open orders to fully filled; unknown or settled ids are ignored
    pub fn mark_filled(&mut self, ids: &[String]) -> usize {
        let mut flipped = 0;
        for order in self.orders.iter_mut() {
            if order.is_open() && ids.contains(&order.id) {
                order.status = OrderStatus::Filled;
                order.filled_quantity = order.quantity;
                flipped += 1;
            }
        }
        flipped
    }

    /// Bring an open order up to `reported_total`, the cumulative quantity the
    /// exchange has filled for it. Returns the newly filled part, capped at
    /// the order's quantity, or `None` when nothing new was filled.
    pub fn record_fill(&mut self, id: &str, reported_total: f64) -> Option<f64> {
        let order = self.orders.iter_mut().find(|o| o.id == id && o.is_open())?;

        let new = reported_total.min(order.quantity) - order.filled_quantity;
        if new <= FILL_EPSILON {
            return None;
        }

        order.filled_quantity += new;
        order.status = if order.remaining() <= FILL_EPSILON {
            OrderStatus::Filled
        } else {
            OrderStatus::Partial
        };
        Some(new)
    }

    /// Open on the exchange: pending or partially filled
    pub fn is_pending(&self, id: &str) -> bool {
        self.orders.iter().any(|o| o.id == id && o.is_open())
    }

    pub fn orders(&self) -> &[GridOrder] {
        &self.orders
    }

    pub fn pending_orders(&self) -> Vec<&GridOrder> {
        self.orders.iter().filter(|o| o.is_open()).collect()
    }

    pub fn filled_orders(&self) -> Vec<&GridOrder> {
        self.orders.iter().filter(|o| o.status == OrderStatus::Filled).collect()
    }

    /// Quantity filled across the ladder, partial fills included
    pub fn filled_quantity(&self) -> f64 {
        self.orders.iter().map(|o| o.filled_quantity).sum()
    }

    pub fn config(&self) -> Option<&TradingConfig> {
        self.config.as_ref()
    }

    fn require_config(&self) -> TradingResult<&TradingConfig> {
        self.config
            .as_ref()
            .ok_or_else(|| TradingError::NotConfigured("Grid ladder".to_string()))
    }
}
