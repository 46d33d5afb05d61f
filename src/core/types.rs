// Common types used across the trading engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Long,   // Buy the dips, exit above average entry
    Short,  // Sell the rallies, exit below average entry
}

impl Strategy {
    /// Side used by the grid ladder
    pub fn entry_side(self) -> OrderSide {
        match self {
            Strategy::Long => OrderSide::Buy,
            Strategy::Short => OrderSide::Sell,
        }
    }

    /// Side used by the take-profit order
    pub fn exit_side(self) -> OrderSide {
        self.entry_side().opposite()
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Long => write!(f, "long"),
            Strategy::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn opposite(self) -> OrderSide {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Partial,
}

/// One rung of the ladder, derived from the config and never persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridLevel {
    pub level: usize,
    pub price: f64,
    pub quantity: f64,
    pub side: OrderSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridOrder {
    pub id: String,
    pub price: f64,
    pub quantity: f64,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub grid_level: usize,
    /// Cumulative quantity the exchange has reported filled
    #[serde(default)]
    pub filled_quantity: f64,
}

impl GridOrder {
    pub fn remaining(&self) -> f64 {
        (self.quantity - self.filled_quantity).max(0.0)
    }

    /// Still resting on the exchange, untouched or partially filled
    pub fn is_open(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Partial)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub symbol: String,
    pub side: Strategy,
    pub size: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub pnl: f64,
    pub leverage: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeProfitOrder {
    pub id: String,
    pub price: f64,
    pub quantity: f64,
    pub side: OrderSide,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFill {
    pub order_id: String,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: f64,
    pub price: Option<f64>,
    pub leverage: Option<u32>,
}

impl OrderRequest {
    pub fn limit(symbol: &str, side: OrderSide, quantity: f64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
            leverage: None,
        }
    }

    pub fn with_leverage(mut self, leverage: u32) -> Self {
        self.leverage = Some(leverage);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    pub change_24h: f64,
    pub timestamp: DateTime<Utc>,
}

// Trading constants
pub const MIN_LEVERAGE: u32 = 1;
pub const MAX_LEVERAGE: u32 = 100;
pub const DEFAULT_LEVERAGE: u32 = 10;
pub const MIN_GRID_COUNT: usize = 2;
pub const MAX_GRID_COUNT: usize = 50;
pub const DEFAULT_GRID_COUNT: usize = 10;
pub const MIN_TAKE_PROFIT: f64 = 0.1;
pub const MAX_TAKE_PROFIT: f64 = 100.0;
pub const DEFAULT_TAKE_PROFIT: f64 = 5.0;
pub const MIN_SEED_AMOUNT: f64 = 10.0;
pub const PRICE_DECIMALS: u32 = 2;
pub const QUANTITY_DECIMALS: u32 = 6;
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 5;
