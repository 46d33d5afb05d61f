// End-to-end runs over a random-walk market

mod common;

use common::{assert_close, create_test_config, SYMBOL};
use martingale_grid_bot::{
    EngineSettings, ExchangeClient, Lifecycle, OrderStatus, PaperExchange, RetryPolicy,
    RetryingExchange, TradingConfig, TradingOrchestrator, TradingSnapshot,
};
use std::sync::Arc;
use std::time::Duration;

fn assert_book_consistent(snapshot: &TradingSnapshot) {
    let filled: f64 = snapshot.grid_orders.iter().map(|o| o.filled_quantity).sum();
    assert_close(filled, snapshot.total_size);
    for order in snapshot.grid_orders.iter().filter(|o| o.status == OrderStatus::Filled) {
        assert_close(order.filled_quantity, order.quantity);
    }

    match &snapshot.take_profit {
        Some(take_profit) => {
            assert!(!snapshot.positions.is_empty());
            assert_close(take_profit.quantity, snapshot.total_size);
        }
        None => assert!(snapshot.positions.is_empty()),
    }
}

#[tokio::test]
async fn test_random_walk_session_keeps_books_consistent() {
    let paper = PaperExchange::new()
        .with_price(SYMBOL, 100.5)
        .with_random_walk(11, 0.02);
    let exchange = Arc::new(RetryingExchange::new(paper, RetryPolicy::none()));
    let orchestrator = TradingOrchestrator::new(exchange.clone(), EngineSettings::manual());

    orchestrator.start(create_test_config()).await.unwrap();

    let mut last_epoch = 1;
    for _ in 0..300 {
        let report = orchestrator.tick_once().await.unwrap();
        let snapshot = orchestrator.snapshot();

        assert_book_consistent(&snapshot);
        if report.take_profit_hit {
            assert_eq!(snapshot.epoch, last_epoch + 1);
            let config = snapshot.config.as_ref().unwrap();
            assert_close(config.from_price - config.to_price, 10.0);
        }
        last_epoch = snapshot.epoch;
    }

    orchestrator.stop().await.unwrap();
    assert_eq!(exchange.inner().open_order_count(), 0);

    let history = exchange.get_order_history().await.unwrap();
    assert!(history.len() >= 5);
}

#[tokio::test]
async fn test_background_loop_runs_until_stopped() {
    let paper = PaperExchange::new()
        .with_price(SYMBOL, 100.5)
        .with_random_walk(3, 0.01);
    let exchange = Arc::new(paper);
    let settings = EngineSettings {
        tick_interval: Duration::from_millis(5),
        ..EngineSettings::default()
    };
    let orchestrator = TradingOrchestrator::new(exchange.clone(), settings);

    orchestrator.start(create_test_config()).await.unwrap();
    assert!(orchestrator.is_running());

    let snapshot = orchestrator.run_for(Duration::from_millis(100)).await.unwrap();

    assert_eq!(snapshot.state, Lifecycle::Stopped);
    assert!(snapshot.last_price.is_some());
    assert!(snapshot.take_profit.is_none());
    assert_eq!(exchange.open_order_count(), 0);
}

#[tokio::test]
async fn test_concurrent_ticks_never_overlap() {
    let exchange = Arc::new(PaperExchange::new().with_price(SYMBOL, 99.0));
    let orchestrator = Arc::new(TradingOrchestrator::new(exchange.clone(), EngineSettings::manual()));
    orchestrator.start(create_test_config()).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move { orchestrator.tick_once().await })
        })
        .collect();

    let mut fills = 0;
    for handle in handles {
        fills += handle.await.unwrap().unwrap().fills;
    }

    // The level at 100 filled on placement and is counted exactly once
    assert_eq!(fills, 1);
    assert_eq!(orchestrator.snapshot().positions.len(), 1);
}

#[tokio::test]
async fn test_large_ladder_places_every_level() {
    let exchange = Arc::new(PaperExchange::new().with_price("ETH", 3100.0));
    let orchestrator = TradingOrchestrator::new(exchange.clone(), EngineSettings::manual());

    let config = TradingConfig {
        symbol: "ETH".to_string(),
        leverage: 20,
        from_price: 3000.0,
        to_price: 2500.0,
        grid_count: 50,
        seed_amount: 5000.0,
        ..create_test_config()
    };
    orchestrator.start(config).await.unwrap();

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.grid_orders.len(), 50);
    assert_eq!(exchange.open_order_count(), 50);

    let mut levels: Vec<usize> = snapshot.grid_orders.iter().map(|o| o.grid_level).collect();
    levels.sort();
    levels.dedup();
    assert_eq!(levels.len(), 50);
}
