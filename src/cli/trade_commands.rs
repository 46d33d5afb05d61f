// Trade command implementations: paper sessions against the in-memory exchange
use martingale_grid_bot::{
    Config, EngineSettings, ExchangeClient, PaperExchange, RetryPolicy, RetryingExchange,
    TradingError, TradingOrchestrator, TradingResult, TradingSnapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_TICKS: u32 = 20;

pub struct RunOptions {
    pub ticks: Option<u32>,
    pub minutes: Option<f64>,
    pub start_price: Option<f64>,
    pub volatility: f64,
    pub seed: u64,
    pub json: bool,
}

pub async fn run_paper(config: &Config, options: RunOptions) -> TradingResult<()> {
    let trading = config.trading.clone();
    let start_price = options.start_price.unwrap_or(trading.from_price);

    info!("🧪 PAPER trading {} from {:.2} (volatility ±{:.3}%, seed {})",
          trading.symbol, start_price, options.volatility * 100.0, options.seed);

    let paper = PaperExchange::new()
        .with_price(&trading.symbol, start_price)
        .with_random_walk(options.seed, options.volatility);
    let exchange = Arc::new(RetryingExchange::new(paper, RetryPolicy::from(&config.retry)));

    let timed = options.minutes.map(session_duration).transpose()?;
    let settings = EngineSettings {
        manual_ticks: timed.is_none(),
        ..EngineSettings::from(config)
    };

    let orchestrator = TradingOrchestrator::new(exchange.clone(), settings);
    orchestrator.start(trading).await?;

    let snapshot = match timed {
        Some(duration) => {
            info!("⏰ Running for {:.1} minute(s), tick every {}s",
                  duration.as_secs_f64() / 60.0, config.engine.tick_interval_secs);
            tokio::select! {
                result = orchestrator.run_for(duration) => result?,
                _ = tokio::signal::ctrl_c() => {
                    warn!("⚠️  Interrupted, stopping...");
                    orchestrator.stop().await?;
                    orchestrator.snapshot()
                }
            }
        }
        None => {
            let ticks = options.ticks.unwrap_or(DEFAULT_TICKS);
            let mut hits = 0;
            for _ in 0..ticks {
                if orchestrator.tick_once().await?.take_profit_hit {
                    hits += 1;
                }
            }
            info!("🏁 {} tick(s) done, {} take profit(s) hit", ticks, hits);
            orchestrator.stop().await?;
            orchestrator.snapshot()
        }
    };

    report_session(&snapshot, exchange.as_ref(), options.json).await
}

/// Wall-clock length of a `--minutes` session
fn session_duration(minutes: f64) -> TradingResult<Duration> {
    Duration::try_from_secs_f64(minutes * 60.0)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| {
            TradingError::Configuration(vec![format!(
                "--minutes must be a positive finite number, got {}",
                minutes
            )])
        })
}

async fn report_session(
    snapshot: &TradingSnapshot,
    exchange: &dyn ExchangeClient,
    json: bool,
) -> TradingResult<()> {
    info!("📊 Session summary");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("   Epochs:        {}", snapshot.epoch);
    if let Some(price) = snapshot.last_price {
        info!("   Last price:    {:.2}", price);
    }
    info!("   Positions:     {} ({:.6} @ avg {:.2})",
          snapshot.positions.len(), snapshot.total_size, snapshot.average_entry);
    info!("   Open P&L:      {:+.2}", snapshot.total_pnl);

    let history = exchange.get_order_history().await?;
    info!("   Orders sent:   {}", history.len());

    for position in exchange.get_positions().await? {
        info!("   Venue {} {} {:.6} @ {:.2} (P&L {:+.2})",
              position.symbol, position.side, position.size, position.entry_price, position.pnl);
    }
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_duration_converts_minutes() {
        assert_eq!(session_duration(1.5).unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_session_duration_rejects_unusable_values() {
        for minutes in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::MAX] {
            assert!(
                matches!(session_duration(minutes), Err(TradingError::Configuration(_))),
                "{} minutes should be rejected",
                minutes
            );
        }
    }
}
