// Pure grid math: level generation, sizing, averages and P&L

use crate::core::types::{GridLevel, Position, Strategy, PRICE_DECIMALS, QUANTITY_DECIMALS};

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Build the ladder for a price range.
///
/// Long ladders start at `from_price` and step downward with buy orders,
/// short ladders start at `to_price` and step upward with sell orders.
/// Quantities are left at zero; the ladder manager sizes each level.
pub fn grid_levels(from_price: f64, to_price: f64, count: usize, strategy: Strategy) -> Vec<GridLevel> {
    let step = (to_price - from_price).abs() / count as f64;
    let (start, direction) = match strategy {
        Strategy::Long => (from_price, -1.0),
        Strategy::Short => (to_price, 1.0),
    };
    let side = strategy.entry_side();

    (0..count)
        .map(|i| GridLevel {
            level: i + 1,
            price: round_to(start + direction * step * i as f64, PRICE_DECIMALS),
            quantity: 0.0,
            side,
        })
        .collect()
}

/// Equal notional share of leveraged capital per level, in base units
pub fn grid_quantity(balance: f64, count: usize, leverage: u32, price: f64) -> f64 {
    let per_grid = balance * leverage as f64 / count as f64;
    round_to(per_grid / price, QUANTITY_DECIMALS)
}

pub fn average_entry_price(positions: &[Position]) -> f64 {
    let total_size = total_position_size(positions);
    if positions.is_empty() || total_size <= 0.0 {
        return 0.0;
    }
    let total_value: f64 = positions.iter().map(|p| p.entry_price * p.size).sum();
    total_value / total_size
}

/// Leveraged P&L; positive means profit for the given side
pub fn position_pnl(entry_price: f64, current_price: f64, size: f64, side: Strategy, leverage: u32) -> f64 {
    let price_change = match side {
        Strategy::Long => current_price - entry_price,
        Strategy::Short => entry_price - current_price,
    };
    let pnl_percent = price_change / entry_price * 100.0;
    pnl_percent * leverage as f64 * size / 100.0
}

pub fn take_profit_price(average_entry: f64, take_profit_percent: f64, strategy: Strategy) -> f64 {
    let multiplier = match strategy {
        Strategy::Long => 1.0 + take_profit_percent / 100.0,
        Strategy::Short => 1.0 - take_profit_percent / 100.0,
    };
    round_to(average_entry * multiplier, PRICE_DECIMALS)
}

pub fn total_position_size(positions: &[Position]) -> f64 {
    positions.iter().map(|p| p.size).sum()
}

pub fn total_pnl(positions: &[Position]) -> f64 {
    positions.iter().map(|p| p.pnl).sum()
}

pub fn is_take_profit_hit(strategy: Strategy, current_price: f64, target_price: f64) -> bool {
    match strategy {
        Strategy::Long => current_price >= target_price,
        Strategy::Short => current_price <= target_price,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn position(entry_price: f64, size: f64) -> Position {
        Position {
            id: format!("pos-{}", entry_price),
            symbol: "BTC".to_string(),
            side: Strategy::Long,
            size,
            entry_price,
            current_price: entry_price,
            pnl: 0.0,
            leverage: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_long_ladder_steps_down_from_from_price() {
        let levels = grid_levels(45000.0, 40500.0, 9, Strategy::Long);

        assert_eq!(levels.len(), 9);
        assert_eq!(levels[0].level, 1);
        assert_eq!(levels[0].price, 45000.0);
        assert_eq!(levels[1].price, 44500.0);
        assert_eq!(levels[8].level, 9);
        assert_eq!(levels[8].price, 41000.0);
        assert!(levels.iter().all(|l| l.side == crate::core::types::OrderSide::Buy));
    }

    #[test]
    fn test_short_ladder_steps_up_from_to_price() {
        let levels = grid_levels(100.0, 110.0, 4, Strategy::Short);

        let prices: Vec<f64> = levels.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![110.0, 112.5, 115.0, 117.5]);
        assert!(levels.iter().all(|l| l.side == crate::core::types::OrderSide::Sell));
    }

    #[test]
    fn test_levels_are_strictly_monotonic() {
        for count in 2..=50 {
            let long = grid_levels(3000.0, 2000.0, count, Strategy::Long);
            let short = grid_levels(2000.0, 3000.0, count, Strategy::Short);

            assert_eq!(long.len(), count);
            assert!(long.windows(2).all(|w| w[1].price < w[0].price));
            assert!(short.windows(2).all(|w| w[1].price > w[0].price));

            let step = 1000.0 / count as f64;
            assert!((long[0].price - 3000.0).abs() <= step);
            assert!((short[0].price - 3000.0).abs() <= step);
        }
    }

    #[test]
    fn test_level_prices_rounded_to_cents() {
        let levels = grid_levels(100.0, 99.0, 3, Strategy::Long);
        assert_eq!(levels[1].price, 99.67);
        assert_eq!(levels[2].price, 99.33);
    }

    #[test]
    fn test_grid_quantity() {
        // 1000 * 10 / 10 = 1000 per level, at 50000 -> 0.02
        assert_eq!(grid_quantity(1000.0, 10, 10, 50000.0), 0.02);
        // rounded to 6 places
        assert_eq!(grid_quantity(100.0, 3, 1, 7.0), 4.761905);
    }

    #[test]
    fn test_average_entry_price() {
        assert_eq!(average_entry_price(&[]), 0.0);
        assert_eq!(average_entry_price(&[position(123.0, 0.5)]), 123.0);
        assert_eq!(average_entry_price(&[position(100.0, 1.0), position(200.0, 1.0)]), 150.0);
        // weighted by size
        let avg = average_entry_price(&[position(100.0, 3.0), position(200.0, 1.0)]);
        assert!((avg - 125.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_pnl() {
        let pnl = position_pnl(100.0, 110.0, 2.0, Strategy::Long, 5);
        assert!((pnl - 1.0).abs() < 1e-9);

        let short = position_pnl(100.0, 90.0, 2.0, Strategy::Short, 5);
        assert!((short - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pnl_sign_flips_on_adverse_move() {
        assert!(position_pnl(100.0, 101.0, 1.0, Strategy::Long, 3) > 0.0);
        assert!(position_pnl(100.0, 99.0, 1.0, Strategy::Long, 3) < 0.0);
        assert!(position_pnl(100.0, 99.0, 1.0, Strategy::Short, 3) > 0.0);
        assert!(position_pnl(100.0, 101.0, 1.0, Strategy::Short, 3) < 0.0);
        assert_eq!(position_pnl(100.0, 100.0, 1.0, Strategy::Long, 3), 0.0);
    }

    #[test]
    fn test_take_profit_price() {
        assert_eq!(take_profit_price(150.0, 10.0, Strategy::Long), 165.0);
        assert_eq!(take_profit_price(150.0, 10.0, Strategy::Short), 135.0);
    }

    #[test]
    fn test_take_profit_hit() {
        assert!(is_take_profit_hit(Strategy::Long, 165.0, 165.0));
        assert!(!is_take_profit_hit(Strategy::Long, 164.99, 165.0));
        assert!(is_take_profit_hit(Strategy::Short, 135.0, 135.0));
        assert!(!is_take_profit_hit(Strategy::Short, 135.01, 135.0));
    }

    #[test]
    fn test_totals() {
        let mut a = position(100.0, 1.5);
        a.pnl = 2.0;
        let mut b = position(90.0, 0.5);
        b.pnl = -0.5;
        assert_eq!(total_position_size(&[a.clone(), b.clone()]), 2.0);
        assert_eq!(total_pnl(&[a, b]), 1.5);
    }
}
