// Trading lifecycle: start, tick loop, take-profit reset and stop

use crate::clients::exchange::ExchangeClient;
use crate::config::{Config, TradingConfig};
use crate::core::calculations::is_take_profit_hit;
use crate::core::grid_ladder::GridLadderManager;
use crate::core::position_book::PositionBook;
use crate::core::take_profit::TakeProfitController;
use crate::core::types::{GridOrder, OrderFill, Position, TakeProfitOrder, DEFAULT_TICK_INTERVAL_SECS};
use crate::error::{TradingError, TradingResult};
use crate::validation::ConfigValidator;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub tick_interval: Duration,
    /// Do not spawn the background loop; ticks are driven with `tick_once`
    pub manual_ticks: bool,
    pub log_fills: bool,
    pub log_ticks: bool,
}

impl EngineSettings {
    pub fn manual() -> Self {
        Self {
            manual_ticks: true,
            ..Self::default()
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            manual_ticks: false,
            log_fills: true,
            log_ticks: true,
        }
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            tick_interval: config.engine.tick_interval(),
            manual_ticks: false,
            log_fills: config.logging.log_fills,
            log_ticks: config.logging.log_ticks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Idle,
    Active,
    Stopped,
}

/// Point-in-time view of the engine, published after every state change
#[derive(Debug, Clone, Serialize)]
pub struct TradingSnapshot {
    pub running: bool,
    pub state: Lifecycle,
    pub epoch: u64,
    pub config: Option<TradingConfig>,
    pub grid_orders: Vec<GridOrder>,
    pub positions: Vec<Position>,
    pub take_profit: Option<TakeProfitOrder>,
    pub last_price: Option<f64>,
    pub total_pnl: f64,
    pub average_entry: f64,
    pub total_size: f64,
    pub updated_at: DateTime<Utc>,
}

/// What a single tick observed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub skipped: bool,
    pub fills: usize,
    pub price: Option<f64>,
    pub take_profit_hit: bool,
}

struct Engine {
    exchange: Arc<dyn ExchangeClient>,
    settings: EngineSettings,
    state: Lifecycle,
    config: Option<TradingConfig>,
    ladder: GridLadderManager,
    book: PositionBook,
    take_profit: TakeProfitController,
    epoch: u64,
    last_price: Option<f64>,
}

impl Engine {
    fn snapshot(&self) -> TradingSnapshot {
        TradingSnapshot {
            running: self.state == Lifecycle::Active,
            state: self.state,
            epoch: self.epoch,
            config: self.config.clone(),
            grid_orders: self.ladder.orders().to_vec(),
            positions: self.book.positions().to_vec(),
            take_profit: self.take_profit.order().cloned(),
            last_price: self.last_price,
            total_pnl: self.book.total_pnl(),
            average_entry: self.book.average_entry(),
            total_size: self.book.total_size(),
            updated_at: Utc::now(),
        }
    }

    async fn begin(&mut self, config: TradingConfig) {
        self.ladder.configure(config.clone());
        self.take_profit.configure(&config.symbol, config.strategy);
        self.book.clear();
        self.last_price = None;
        self.epoch = 1;
        self.state = Lifecycle::Active;

        if let Err(e) = self.ladder.place_ladder(self.exchange.as_ref(), config.seed_amount).await {
            error!("❌ Initial ladder placement failed: {}", e);
        }
        self.config = Some(config);
    }

    async fn shutdown(&mut self) {
        let cancelled = self.ladder.cancel_all(self.exchange.as_ref()).await;
        let take_profit_cancelled = self.take_profit.cancel(self.exchange.as_ref()).await;
        self.state = Lifecycle::Stopped;

        info!("🛑 Trading stopped: {} grid order(s) cancelled, take profit cancelled: {}",
              cancelled, take_profit_cancelled);
    }

    async fn tick(&mut self, stop: &watch::Receiver<bool>) -> TickReport {
        let mut report = TickReport::default();
        let Some(config) = self.config.clone() else {
            return report;
        };

        // 1-2. An executed exit closes the epoch; new grid fills become positions
        match self.exchange.get_fills(&config.symbol).await {
            Ok(fills) => {
                if let Some(exit) = self.take_profit.order().cloned() {
                    if let Some(fill) = fills.iter().find(|f| f.order_id == exit.id) {
                        self.reset_after_take_profit(fill.price, exit.price, &config).await;
                        report.take_profit_hit = true;
                        report.price = self.last_price;
                        self.check_invariants();
                        return report;
                    }
                }

                for fill in cumulative_fills(&fills) {
                    let Some(quantity) = self.ladder.record_fill(&fill.order_id, fill.quantity) else {
                        continue;
                    };
                    self.apply_fill(&OrderFill { quantity, ..fill }, &config).await;
                    report.fills += 1;

                    if *stop.borrow() {
                        return report;
                    }
                }
            }
            Err(e) => warn!("⚠️  Fill query failed: {}", e),
        }

        if self.book.has_positions() && self.take_profit.needs_refresh(self.book.total_size()) {
            debug!("Reconciling take profit with {:.6} open", self.book.total_size());
            self.refresh_take_profit(&config).await;
        }

        if *stop.borrow() {
            return report;
        }

        // 3. Mark to market
        let price = match self.exchange.get_market_data(&config.symbol).await {
            Ok(data) => data.price,
            Err(e) => {
                warn!("📉 Market data unavailable, skipping price checks: {}", e);
                self.check_invariants();
                return report;
            }
        };
        self.book.update_price(price);
        self.last_price = Some(price);
        report.price = Some(price);

        if *stop.borrow() {
            return report;
        }

        // 4. Take-profit hit against the latest price
        if let Some(target) = self.take_profit.order().map(|o| o.price) {
            if self.book.has_positions() && is_take_profit_hit(config.strategy, price, target) {
                self.reset_after_take_profit(price, target, &config).await;
                report.take_profit_hit = true;
            }
        }

        self.check_invariants();

        let summary = format!(
            "⏱️  Tick epoch {} | {} @ {:.2} | positions {} | size {:.6} | P&L {:+.2} | pending {}",
            self.epoch,
            config.symbol,
            price,
            self.book.count(),
            self.book.total_size(),
            self.book.total_pnl(),
            self.ladder.pending_orders().len()
        );
        if self.settings.log_ticks {
            info!("{}", summary);
        } else {
            debug!("{}", summary);
        }

        report
    }

    async fn apply_fill(&mut self, fill: &OrderFill, config: &TradingConfig) {
        self.book.add_position(fill, &config.symbol, config.strategy, config.leverage);

        let message = format!(
            "💰 Grid fill {} {:.6} @ {:.2} | {} position(s), avg entry {:.2}",
            config.symbol,
            fill.quantity,
            fill.price,
            self.book.count(),
            self.book.average_entry()
        );
        if self.settings.log_fills {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }

        self.refresh_take_profit(config).await;
    }

    async fn refresh_take_profit(&mut self, config: &TradingConfig) {
        let result = self
            .take_profit
            .refresh(
                self.exchange.as_ref(),
                self.book.average_entry(),
                self.book.total_size(),
                config.take_profit_percent,
            )
            .await;

        if let Err(e) = result {
            warn!("⚠️  Take profit not placed, will retry next tick: {}", e);
        }
    }

    async fn reset_after_take_profit(&mut self, observed: f64, target: f64, config: &TradingConfig) {
        info!("🎯 Take profit hit at {:.2} (target {:.2}): closing {} position(s), P&L {:+.2}",
              observed, target, self.book.count(), self.book.total_pnl());

        self.book.clear();
        self.take_profit.clear();

        let anchor = match self.exchange.get_market_data(&config.symbol).await {
            Ok(data) => data.price,
            Err(e) => {
                warn!("⚠️  Could not refresh price for reset, using {:.2}: {}", observed, e);
                observed
            }
        };
        self.book.update_price(anchor);
        self.last_price = Some(anchor);

        match self.ladder.reset(self.exchange.as_ref(), anchor, config.seed_amount).await {
            Ok(orders) => info!("🔄 Epoch {} ladder anchored at {:.2} with {} order(s)",
                                self.epoch + 1, anchor, orders.len()),
            Err(e) => error!("❌ Ladder reset failed: {}", e),
        }

        self.config = self.ladder.config().cloned();
        self.epoch += 1;
    }

    fn check_invariants(&self) {
        let filled = self.ladder.filled_quantity();
        let held = self.book.total_size();
        if (filled - held).abs() > 1e-6 {
            let violation = TradingError::InvariantViolation(format!(
                "filled grid quantity {:.6} != position size {:.6}",
                filled, held
            ));
            error!("🚨 {}", violation);
        }

        if self.book.has_positions() && !self.take_profit.has_order() {
            warn!("⚠️  {} position(s) open without a take profit", self.book.count());
        } else if !self.book.has_positions() && self.take_profit.has_order() {
            error!("🚨 {}", TradingError::InvariantViolation("take profit outstanding with no positions".to_string()));
        }
    }
}

/// Drives one symbol's martingale grid against an exchange client
pub struct TradingOrchestrator {
    engine: Arc<Mutex<Engine>>,
    // Held for the whole of start/stop
    control: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
    snapshots: Arc<watch::Sender<TradingSnapshot>>,
    settings: EngineSettings,
}

impl TradingOrchestrator {
    pub fn new(exchange: Arc<dyn ExchangeClient>, settings: EngineSettings) -> Self {
        let engine = Engine {
            exchange,
            settings: settings.clone(),
            state: Lifecycle::Idle,
            config: None,
            ladder: GridLadderManager::new(),
            book: PositionBook::new(),
            take_profit: TakeProfitController::new(),
            epoch: 0,
            last_price: None,
        };
        let (snapshots, _) = watch::channel(engine.snapshot());
        let (shutdown, _) = watch::channel(false);

        Self {
            engine: Arc::new(Mutex::new(engine)),
            control: Mutex::new(None),
            shutdown,
            snapshots: Arc::new(snapshots),
            settings,
        }
    }

    /// Validate `config`, lay the initial ladder and begin ticking
    pub async fn start(&self, config: TradingConfig) -> TradingResult<()> {
        let mut control = self.control.lock().await;
        let mut engine = self.engine.lock().await;

        if engine.state == Lifecycle::Active {
            return Err(TradingError::AlreadyRunning);
        }

        let validation = ConfigValidator::validate(&config);
        if !validation.passed {
            validation.display();
            return Err(TradingError::Configuration(validation.errors()));
        }

        info!("🚀 Starting {} grid on {}: {} levels {:.2} -> {:.2}, {}x, TP {}%",
              config.strategy, config.symbol, config.grid_count,
              config.from_price, config.to_price, config.leverage, config.take_profit_percent);

        self.shutdown.send_replace(false);
        engine.begin(config).await;
        self.snapshots.send_replace(engine.snapshot());
        drop(engine);

        if !self.settings.manual_ticks {
            let task = tokio::spawn(run_loop(
                Arc::clone(&self.engine),
                Arc::clone(&self.snapshots),
                self.shutdown.subscribe(),
                self.settings.tick_interval,
            ));
            *control = Some(task);
        }

        Ok(())
    }

    /// Stop ticking, cancel everything resting on the exchange. No-op unless active.
    pub async fn stop(&self) -> TradingResult<()> {
        let mut control = self.control.lock().await;

        self.shutdown.send_replace(true);
        if let Some(task) = control.take() {
            if let Err(e) = task.await {
                error!("❌ Tick loop ended abnormally: {}", e);
            }
        }

        let mut engine = self.engine.lock().await;
        if engine.state != Lifecycle::Active {
            return Ok(());
        }

        engine.shutdown().await;
        self.snapshots.send_replace(engine.snapshot());
        Ok(())
    }

    /// Run one tick now. Skipped if another tick (or start/stop) holds the engine.
    pub async fn tick_once(&self) -> TradingResult<TickReport> {
        let Ok(mut engine) = self.engine.try_lock() else {
            debug!("⏭️  Tick skipped: engine busy");
            return Ok(TickReport {
                skipped: true,
                ..TickReport::default()
            });
        };

        if engine.state != Lifecycle::Active {
            return Err(TradingError::NotConfigured("Trading loop".to_string()));
        }

        let stop = self.shutdown.subscribe();
        let report = engine.tick(&stop).await;
        self.snapshots.send_replace(engine.snapshot());
        Ok(report)
    }

    /// Let the loop run for `duration`, then stop it
    pub async fn run_for(&self, duration: Duration) -> TradingResult<TradingSnapshot> {
        sleep(duration).await;
        self.stop().await?;
        Ok(self.snapshot())
    }

    pub fn snapshot(&self) -> TradingSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TradingSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.snapshots.borrow().running
    }
}

/// One entry per order id, in first-seen order, carrying the cumulative
/// quantity and the latest price reported for it
fn cumulative_fills(fills: &[OrderFill]) -> Vec<OrderFill> {
    let mut merged: Vec<OrderFill> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for fill in fills {
        match index.get(fill.order_id.as_str()) {
            Some(&i) => {
                let entry = &mut merged[i];
                entry.quantity += fill.quantity;
                entry.price = fill.price;
                entry.timestamp = fill.timestamp;
            }
            None => {
                index.insert(&fill.order_id, merged.len());
                merged.push(fill.clone());
            }
        }
    }
    merged
}

async fn run_loop(
    engine: Arc<Mutex<Engine>>,
    snapshots: Arc<watch::Sender<TradingSnapshot>>,
    mut shutdown: watch::Receiver<bool>,
    period: Duration,
) {
    let stop = shutdown.clone();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Ok(mut engine) = engine.try_lock() else {
                    debug!("⏭️  Tick skipped: previous tick still running");
                    continue;
                };
                engine.tick(&stop).await;
                snapshots.send_replace(engine.snapshot());
            }
        }
    }

    debug!("Tick loop exited");
}
