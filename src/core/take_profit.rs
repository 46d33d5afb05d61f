// Aggregate take-profit order management

use crate::clients::exchange::ExchangeClient;
use crate::core::calculations::{round_to, take_profit_price};
use crate::core::types::{OrderRequest, OrderStatus, Strategy, TakeProfitOrder, QUANTITY_DECIMALS};
use crate::error::{TradingError, TradingResult};
use tracing::{debug, info, warn};

/// Holds at most one exit order covering the whole position book.
/// Any change to the aggregate is handled by cancel-then-recreate.
#[derive(Debug, Clone, Default)]
pub struct TakeProfitController {
    symbol: Option<String>,
    strategy: Option<Strategy>,
    order: Option<TakeProfitOrder>,
}

impl TakeProfitController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&mut self, symbol: &str, strategy: Strategy) {
        self.symbol = Some(symbol.to_string());
        self.strategy = Some(strategy);
        self.order = None;
    }

    pub fn target_price(&self, average_entry: f64, take_profit_percent: f64) -> TradingResult<f64> {
        let (_, strategy) = self.require_config()?;
        Ok(take_profit_price(average_entry, take_profit_percent, strategy))
    }

    /// Submit a limit exit for `quantity` at the target derived from `average_entry`
    pub async fn place(
        &mut self,
        exchange: &dyn ExchangeClient,
        average_entry: f64,
        quantity: f64,
        take_profit_percent: f64,
    ) -> TradingResult<&TakeProfitOrder> {
        let (symbol, strategy) = self.require_config()?;
        let symbol = symbol.to_string();

        let quantity = round_to(quantity, QUANTITY_DECIMALS);
        if quantity <= 0.0 {
            return Err(TradingError::OrderPlacement("take profit quantity must be positive".to_string()));
        }

        let price = take_profit_price(average_entry, take_profit_percent, strategy);
        let side = strategy.exit_side();

        let response = exchange
            .place_order(OrderRequest::limit(&symbol, side, quantity, price))
            .await
            .map_err(|e| match e {
                TradingError::OrderPlacement(_) => e,
                other => TradingError::OrderPlacement(other.to_string()),
            })?;

        info!("🎯 Take profit {} {:.6} {} @ {:.2} (avg entry {:.2})",
              side, quantity, symbol, price, average_entry);

        Ok(&*self.order.insert(TakeProfitOrder {
            id: response.order_id,
            price,
            quantity,
            side,
            status: OrderStatus::Pending,
        }))
    }

    /// Cancel the current exit (best effort) and place a new one for the updated aggregate
    pub async fn refresh(
        &mut self,
        exchange: &dyn ExchangeClient,
        average_entry: f64,
        quantity: f64,
        take_profit_percent: f64,
    ) -> TradingResult<&TakeProfitOrder> {
        self.cancel(exchange).await;
        self.place(exchange, average_entry, quantity, take_profit_percent).await
    }

    /// Best-effort cancel; the reference is dropped whatever the exchange says
    pub async fn cancel(&mut self, exchange: &dyn ExchangeClient) -> bool {
        let Some(order) = self.order.take() else {
            return false;
        };

        match exchange.cancel_order(&order.id).await {
            Ok(true) => {
                debug!("🗑️  Take profit {} cancelled", order.id);
                true
            }
            Ok(false) => {
                warn!("⚠️  Exchange did not cancel take profit {}", order.id);
                false
            }
            Err(e) => {
                warn!("⚠️  Take profit cancel failed for {}: {}", order.id, e);
                false
            }
        }
    }

    /// Forget the order without touching the exchange (it has executed)
    pub fn clear(&mut self) {
        self.order = None;
    }

    pub fn order(&self) -> Option<&TakeProfitOrder> {
        self.order.as_ref()
    }

    pub fn has_order(&self) -> bool {
        self.order.is_some()
    }

    /// True when there is no exit or it no longer covers `total_size`
    pub fn needs_refresh(&self, total_size: f64) -> bool {
        match &self.order {
            None => total_size > 0.0,
            Some(order) => (order.quantity - round_to(total_size, QUANTITY_DECIMALS)).abs() > 1e-9,
        }
    }

    fn require_config(&self) -> TradingResult<(&str, Strategy)> {
        match (&self.symbol, self.strategy) {
            (Some(symbol), Some(strategy)) => Ok((symbol.as_str(), strategy)),
            _ => Err(TradingError::NotConfigured("Take profit controller".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::paper::PaperExchange;
    use crate::core::types::OrderSide;

    #[tokio::test]
    async fn test_place_prices_off_average_entry() {
        let exchange = PaperExchange::new().with_price("BTC", 140.0);
        let mut controller = TakeProfitController::new();
        controller.configure("BTC", Strategy::Long);

        let order = controller.place(&exchange, 150.0, 2.0, 10.0).await.unwrap().clone();

        assert_eq!(order.price, 165.0);
        assert_eq!(order.quantity, 2.0);
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(exchange.open_order_count(), 1);
    }

    #[tokio::test]
    async fn test_short_exit_buys_below_entry() {
        let exchange = PaperExchange::new().with_price("BTC", 160.0);
        let mut controller = TakeProfitController::new();
        controller.configure("BTC", Strategy::Short);

        let order = controller.place(&exchange, 150.0, 1.0, 10.0).await.unwrap();
        assert_eq!(order.price, 135.0);
        assert_eq!(order.side, OrderSide::Buy);
    }

    #[tokio::test]
    async fn test_refresh_replaces_existing_order() {
        let exchange = PaperExchange::new().with_price("BTC", 90.0);
        let mut controller = TakeProfitController::new();
        controller.configure("BTC", Strategy::Long);

        let first = controller.place(&exchange, 100.0, 1.0, 5.0).await.unwrap().id.clone();
        let second = controller.refresh(&exchange, 95.0, 2.0, 5.0).await.unwrap().clone();

        assert_ne!(first, second.id);
        assert_eq!(second.price, 99.75);
        assert_eq!(exchange.open_order_count(), 1);
        assert!(!controller.needs_refresh(2.0));
        assert!(controller.needs_refresh(3.0));
    }

    #[tokio::test]
    async fn test_failed_placement_surfaces_and_leaves_no_order() {
        let exchange = PaperExchange::new().with_price("BTC", 90.0);
        let mut controller = TakeProfitController::new();
        controller.configure("BTC", Strategy::Long);
        controller.place(&exchange, 100.0, 1.0, 5.0).await.unwrap();

        exchange.fail_next_placements(1);
        let result = controller.refresh(&exchange, 100.0, 2.0, 5.0).await;

        assert!(matches!(result, Err(TradingError::OrderPlacement(_))));
        assert!(!controller.has_order());
        assert!(controller.needs_refresh(2.0));
    }

    #[tokio::test]
    async fn test_placement_errors_surface_as_order_placement() {
        let exchange = PaperExchange::new().with_price("BTC", 90.0);
        let mut controller = TakeProfitController::new();
        controller.configure("BTC", Strategy::Long);

        exchange.fail_next_placements(1);
        let result = controller.place(&exchange, 100.0, 1.0, 5.0).await.cloned();
        assert_eq!(
            result,
            Err(TradingError::OrderPlacement("simulated venue rejection".to_string()))
        );

        // A zero entry prices the exit at zero, which the venue refuses outright
        let result = controller.place(&exchange, 0.0, 1.0, 5.0).await.cloned();
        assert_eq!(
            result,
            Err(TradingError::OrderPlacement(
                "Invalid order: limit order requires a positive price".to_string()
            ))
        );
        assert!(!controller.has_order());
    }

    #[tokio::test]
    async fn test_cancel_drops_reference_even_on_failure() {
        let exchange = PaperExchange::new().with_price("BTC", 90.0);
        let mut controller = TakeProfitController::new();
        controller.configure("BTC", Strategy::Long);
        controller.place(&exchange, 100.0, 1.0, 5.0).await.unwrap();

        exchange.set_cancel_failure(true);
        assert!(!controller.cancel(&exchange).await);
        assert!(controller.order().is_none());
        assert!(!controller.cancel(&exchange).await);
    }

    #[test]
    fn test_unconfigured_controller() {
        let controller = TakeProfitController::new();
        assert!(matches!(
            controller.target_price(100.0, 5.0),
            Err(TradingError::NotConfigured(_))
        ));
        assert!(!controller.needs_refresh(0.0));
    }
}
