// Open positions created from grid fills, plus their aggregate metrics

use crate::core::calculations::{average_entry_price, position_pnl, total_pnl, total_position_size};
use crate::core::types::{OrderFill, Position, Strategy};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

/// One position per fill, kept in creation order. Positions are never split,
/// merged or removed individually; the whole book is cleared when the
/// take-profit executes.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: Vec<Position>,
    current_price: Option<f64>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the latest market price and mark every position to it
    pub fn update_price(&mut self, price: f64) {
        self.current_price = Some(price);
        for position in &mut self.positions {
            position.current_price = price;
            position.pnl = position_pnl(position.entry_price, price, position.size, position.side, position.leverage);
        }
    }

    pub fn add_position(&mut self, fill: &OrderFill, symbol: &str, side: Strategy, leverage: u32) -> &Position {
        let mark = self.current_price.unwrap_or(fill.price);
        let position = Position {
            id: format!("pos_{}", Uuid::new_v4().simple()),
            symbol: symbol.to_string(),
            side,
            size: fill.quantity,
            entry_price: fill.price,
            current_price: mark,
            pnl: position_pnl(fill.price, mark, fill.quantity, side, leverage),
            leverage,
            created_at: Utc::now(),
        };

        debug!("📥 New {} position {} {:.6} @ {:.2}", side, position.id, position.size, position.entry_price);
        self.positions.push(position);
        &self.positions[self.positions.len() - 1]
    }

    /// Append one position per fill, in order
    pub fn apply_fills(&mut self, fills: &[OrderFill], symbol: &str, side: Strategy, leverage: u32) -> usize {
        for fill in fills {
            self.add_position(fill, symbol, side, leverage);
        }
        fills.len()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn has_positions(&self) -> bool {
        !self.positions.is_empty()
    }

    pub fn total_size(&self) -> f64 {
        total_position_size(&self.positions)
    }

    pub fn total_pnl(&self) -> f64 {
        total_pnl(&self.positions)
    }

    pub fn average_entry(&self) -> f64 {
        average_entry_price(&self.positions)
    }

    pub fn current_price(&self) -> Option<f64> {
        self.current_price
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(id: &str, price: f64, quantity: f64) -> OrderFill {
        OrderFill {
            order_id: id.to_string(),
            price,
            quantity,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_position_marked_at_fill_price_before_any_quote() {
        let mut book = PositionBook::new();
        let position = book.add_position(&fill("a", 100.0, 1.0), "BTC", Strategy::Long, 5);

        assert_eq!(position.current_price, 100.0);
        assert_eq!(position.pnl, 0.0);
        assert!(position.id.starts_with("pos_"));
    }

    #[test]
    fn test_aggregates_follow_fills_and_price() {
        let mut book = PositionBook::new();
        book.apply_fills(&[fill("a", 100.0, 1.0), fill("b", 200.0, 1.0)], "BTC", Strategy::Long, 5);

        assert_eq!(book.count(), 2);
        assert_eq!(book.total_size(), 2.0);
        assert_eq!(book.average_entry(), 150.0);

        book.update_price(110.0);
        // +10% on the first (0.5), -45% on the second (-2.25)
        assert!((book.positions()[0].pnl - 0.5).abs() < 1e-9);
        assert!((book.positions()[1].pnl + 2.25).abs() < 1e-9);
        assert!((book.total_pnl() + 1.75).abs() < 1e-9);
        assert_eq!(book.current_price(), Some(110.0));
    }

    #[test]
    fn test_new_positions_use_last_observed_price() {
        let mut book = PositionBook::new();
        book.update_price(90.0);
        let position = book.add_position(&fill("a", 100.0, 2.0), "BTC", Strategy::Short, 1);

        assert_eq!(position.current_price, 90.0);
        assert!((position.pnl - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_clear_empties_book_but_keeps_price() {
        let mut book = PositionBook::new();
        book.update_price(100.0);
        book.add_position(&fill("a", 100.0, 1.0), "BTC", Strategy::Long, 1);

        book.clear();
        assert!(!book.has_positions());
        assert_eq!(book.average_entry(), 0.0);
        assert_eq!(book.total_size(), 0.0);
        assert_eq!(book.current_price(), Some(100.0));
    }
}
