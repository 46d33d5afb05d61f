// In-memory paper exchange
// Matches resting limit orders against a simulated last price

use crate::clients::exchange::ExchangeClient;
use crate::core::calculations::{position_pnl, round_to};
use crate::core::types::{
    MarketData, OrderFill, OrderRequest, OrderResponse, OrderSide, OrderStatus, OrderType, Position,
    Strategy, PRICE_DECIMALS,
};
use crate::error::{TradingError, TradingResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct RestingOrder {
    response: OrderResponse,
    remaining: f64,
    leverage: u32,
}

#[derive(Debug, Clone)]
struct NetPosition {
    size: f64,              // Signed: positive long, negative short
    average_price: f64,
    leverage: u32,
    opened_at: DateTime<Utc>,
}

struct RandomWalk {
    rng: StdRng,
    volatility: f64,
}

#[derive(Default)]
struct PaperState {
    prices: HashMap<String, f64>,
    opening_prices: HashMap<String, f64>,
    open_orders: Vec<RestingOrder>,
    history: Vec<OrderResponse>,
    fills: Vec<(String, OrderFill)>,
    positions: HashMap<String, NetPosition>,
    random_walk: Option<RandomWalk>,

    // Counters
    placement_attempts: u32,
    cancel_calls: u32,

    // Failure injection
    failing_placements: u32,
    fail_market_data: bool,
    fail_cancels: bool,
    fail_fill_queries: bool,
}

/// Simulated venue: limit buys fill when the price trades at or below the
/// limit, limit sells when it trades at or above it. Market orders fill at
/// the last price.
pub struct PaperExchange {
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PaperState::default()),
        }
    }

    pub fn with_price(self, symbol: &str, price: f64) -> Self {
        {
            let mut state = self.state();
            state.prices.insert(symbol.to_string(), price);
            state.opening_prices.insert(symbol.to_string(), price);
        }
        self
    }

    /// Move the price by a uniform random fraction in `±volatility` on every market data query
    pub fn with_random_walk(self, seed: u64, volatility: f64) -> Self {
        self.state().random_walk = Some(RandomWalk {
            rng: StdRng::seed_from_u64(seed),
            volatility,
        });
        self
    }

    /// Set the last traded price and fill every resting order it crosses
    pub fn set_price(&self, symbol: &str, price: f64) {
        let mut state = self.state();
        state.opening_prices.entry(symbol.to_string()).or_insert(price);
        state.prices.insert(symbol.to_string(), price);
        Self::match_orders(&mut state, symbol);
    }

    /// Fill up to `quantity` of a resting order at its limit price, leaving
    /// the rest on the book. Returns false when the order is not resting.
    pub fn fill_partially(&self, order_id: &str, quantity: f64) -> bool {
        let mut state = self.state();
        let Some(index) = state.open_orders.iter().position(|o| o.response.order_id == order_id) else {
            return false;
        };

        if quantity.is_nan() || quantity <= 0.0 {
            return false;
        }

        let order = &mut state.open_orders[index];
        let quantity = quantity.min(order.remaining);
        order.remaining = round_to(order.remaining - quantity, 8);
        let order = order.clone();
        let complete = order.remaining <= 0.0;
        if complete {
            state.open_orders.remove(index);
        }

        let price = order.response.price;
        Self::record_fill(&mut state, &order.response, price, quantity, complete, order.leverage);
        true
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.state().prices.get(symbol).copied()
    }

    pub fn fail_next_placements(&self, count: u32) {
        self.state().failing_placements = count;
    }

    pub fn set_market_data_failure(&self, fail: bool) {
        self.state().fail_market_data = fail;
    }

    pub fn set_cancel_failure(&self, fail: bool) {
        self.state().fail_cancels = fail;
    }

    pub fn set_fill_query_failure(&self, fail: bool) {
        self.state().fail_fill_queries = fail;
    }

    pub fn placement_attempts(&self) -> u32 {
        self.state().placement_attempts
    }

    pub fn cancel_calls(&self) -> u32 {
        self.state().cancel_calls
    }

    pub fn open_order_count(&self) -> usize {
        self.state().open_orders.len()
    }

    pub fn open_orders(&self) -> Vec<OrderResponse> {
        self.state().open_orders.iter().map(|o| o.response.clone()).collect()
    }

    fn state(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn crosses(side: OrderSide, limit: f64, price: f64) -> bool {
        match side {
            OrderSide::Buy => price <= limit,
            OrderSide::Sell => price >= limit,
        }
    }

    fn match_orders(state: &mut PaperState, symbol: &str) {
        let Some(&price) = state.prices.get(symbol) else {
            return;
        };

        let (crossed, resting): (Vec<RestingOrder>, Vec<RestingOrder>) = state
            .open_orders
            .drain(..)
            .partition(|o| o.response.symbol == symbol && Self::crosses(o.response.side, o.response.price, price));
        state.open_orders = resting;

        for order in crossed {
            Self::record_fill(state, &order.response, order.response.price, order.remaining, true, order.leverage);
        }
    }

    fn record_fill(
        state: &mut PaperState,
        order: &OrderResponse,
        fill_price: f64,
        quantity: f64,
        complete: bool,
        leverage: u32,
    ) {
        let now = Utc::now();
        state.fills.push((
            order.symbol.clone(),
            OrderFill {
                order_id: order.order_id.clone(),
                price: fill_price,
                quantity,
                timestamp: now,
            },
        ));

        if let Some(entry) = state.history.iter_mut().find(|h| h.order_id == order.order_id) {
            entry.status = if complete { OrderStatus::Filled } else { OrderStatus::Partial };
        }

        let signed = match order.side {
            OrderSide::Buy => quantity,
            OrderSide::Sell => -quantity,
        };
        let net = state.positions.entry(order.symbol.clone()).or_insert(NetPosition {
            size: 0.0,
            average_price: fill_price,
            leverage,
            opened_at: now,
        });

        let increasing = net.size == 0.0 || net.size.signum() == signed.signum();
        if increasing {
            let total = net.size.abs() + signed.abs();
            net.average_price = (net.average_price * net.size.abs() + fill_price * signed.abs()) / total;
        } else if signed.abs() > net.size.abs() {
            // Flipped through flat: the remainder opens at the fill price
            net.average_price = fill_price;
            net.opened_at = now;
        }
        net.size = round_to(net.size + signed, 8);

        if net.size == 0.0 {
            state.positions.remove(&order.symbol);
        }

        debug!("📗 Paper fill: {} {} {} @ {:.2}", order.side, quantity, order.symbol, fill_price);
    }
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExchangeClient for PaperExchange {
    async fn place_order(&self, order: OrderRequest) -> TradingResult<OrderResponse> {
        let mut state = self.state();
        state.placement_attempts += 1;

        if state.failing_placements > 0 {
            state.failing_placements -= 1;
            return Err(TradingError::OrderPlacement("simulated venue rejection".to_string()));
        }

        if order.quantity <= 0.0 {
            return Err(TradingError::InvalidOrder(format!("invalid quantity {}", order.quantity)));
        }

        let last_price = state.prices.get(&order.symbol).copied();
        let price = match (order.order_type, order.price) {
            (OrderType::Limit, Some(price)) if price > 0.0 => price,
            (OrderType::Limit, _) => {
                return Err(TradingError::InvalidOrder("limit order requires a positive price".to_string()));
            }
            (OrderType::Market, _) => last_price.ok_or_else(|| {
                TradingError::InvalidOrder(format!("no market for {}", order.symbol))
            })?,
        };

        let response = OrderResponse {
            order_id: format!("paper_{}", Uuid::new_v4().simple()),
            symbol: order.symbol.clone(),
            side: order.side,
            price,
            quantity: order.quantity,
            status: OrderStatus::Pending,
            timestamp: Utc::now(),
        };
        state.history.push(response.clone());

        let leverage = order.leverage.unwrap_or(1);
        let fills_now = order.order_type == OrderType::Market
            || last_price.is_some_and(|last| Self::crosses(order.side, price, last));

        if fills_now {
            Self::record_fill(&mut state, &response, price, order.quantity, true, leverage);
        } else {
            state.open_orders.push(RestingOrder {
                response: response.clone(),
                remaining: order.quantity,
                leverage,
            });
        }

        Ok(response)
    }

    async fn cancel_order(&self, order_id: &str) -> TradingResult<bool> {
        let mut state = self.state();
        state.cancel_calls += 1;

        if state.fail_cancels {
            return Err(TradingError::Cancellation(format!("simulated cancel failure for {}", order_id)));
        }

        let Some(index) = state.open_orders.iter().position(|o| o.response.order_id == order_id) else {
            return Ok(false);
        };
        state.open_orders.remove(index);

        if let Some(entry) = state.history.iter_mut().find(|h| h.order_id == order_id) {
            entry.status = OrderStatus::Cancelled;
        }
        Ok(true)
    }

    async fn get_market_data(&self, symbol: &str) -> TradingResult<MarketData> {
        let mut state = self.state();

        if state.fail_market_data {
            return Err(TradingError::MarketData(format!("simulated feed outage for {}", symbol)));
        }

        let current = state
            .prices
            .get(symbol)
            .copied()
            .ok_or_else(|| TradingError::MarketData(format!("no price for {}", symbol)))?;

        let price = match state.random_walk.as_mut() {
            Some(walk) if walk.volatility > 0.0 => {
                let change = walk.rng.gen_range(-walk.volatility..walk.volatility);
                round_to(current * (1.0 + change), PRICE_DECIMALS).max(0.01)
            }
            _ => current,
        };
        state.prices.insert(symbol.to_string(), price);
        Self::match_orders(&mut state, symbol);

        let opening = state.opening_prices.get(symbol).copied().unwrap_or(price);
        let volume: f64 = state
            .fills
            .iter()
            .filter(|(s, _)| s == symbol)
            .map(|(_, f)| f.quantity)
            .sum();

        Ok(MarketData {
            symbol: symbol.to_string(),
            price,
            volume,
            change_24h: (price - opening) / opening * 100.0,
            timestamp: Utc::now(),
        })
    }

    async fn get_fills(&self, symbol: &str) -> TradingResult<Vec<OrderFill>> {
        let state = self.state();

        if state.fail_fill_queries {
            return Err(TradingError::Exchange(format!("simulated fill query failure for {}", symbol)));
        }

        Ok(state
            .fills
            .iter()
            .filter(|(s, _)| s == symbol)
            .map(|(_, f)| f.clone())
            .collect())
    }

    async fn get_positions(&self) -> TradingResult<Vec<Position>> {
        let state = self.state();

        let mut positions: Vec<Position> = state
            .positions
            .iter()
            .map(|(symbol, net)| {
                let side = if net.size > 0.0 { Strategy::Long } else { Strategy::Short };
                let current_price = state.prices.get(symbol).copied().unwrap_or(net.average_price);
                let size = net.size.abs();
                Position {
                    id: format!("paper_{}", symbol),
                    symbol: symbol.clone(),
                    side,
                    size,
                    entry_price: net.average_price,
                    current_price,
                    pnl: position_pnl(net.average_price, current_price, size, side, net.leverage),
                    leverage: net.leverage,
                    created_at: net.opened_at,
                }
            })
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        Ok(positions)
    }

    async fn get_order_history(&self) -> TradingResult<Vec<OrderResponse>> {
        Ok(self.state().history.clone())
    }
}
