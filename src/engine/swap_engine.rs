//! Swap engine: lifecycle state machine and the monitoring loop.
//!
//! One engine trades one token on one chain. `start` spawns the loop,
//! `stop` flips the state and wakes the loop if it is sleeping. An
//! iteration already in flight always runs to completion.
//!
//! The loop holds `loop_guard` for its whole lifetime, so a loop started
//! after a stop waits for the previous one to exit first.

use anyhow::Result;
use ethers::types::Address;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::engine::balances::BalanceReader;
use crate::engine::executor::SwapExecutor;
use crate::engine::price_feed::PriceFeed;
use crate::storage::ActivityLog;
use crate::strategy::{evaluate, size_request, SizingConfig, ThresholdRule};
use crate::types::{
    EngineState, EngineStatus, PriceReading, SwapOutcome, SwapRequest, TradeAction, TradeIntent,
    NATIVE_ASSET,
};

// ---------------------------------------------------------------------------
// Settings and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub chain_id: u64,
    pub tracked_token: Address,
    /// Wallet whose balances are read and which signs swaps.
    pub wallet: Address,
    /// Native amount spent per buy, in whole units.
    pub buy_amount_native: Decimal,
    /// Share of the token balance sold per sell, 1..=100.
    pub sell_percentage: u8,
    pub poll_interval: Duration,
    /// Delay after an iteration that failed unexpectedly.
    pub recovery_delay: Duration,
}

impl EngineSettings {
    fn sizing(&self) -> SizingConfig {
        SizingConfig {
            tracked_token: self.tracked_token,
            buy_amount_native: self.buy_amount_native,
            sell_percentage: self.sell_percentage,
        }
    }
}

/// What one loop iteration observed and did.
#[derive(Debug, Clone, Default)]
pub struct IterationReport {
    pub reading: Option<PriceReading>,
    pub intent: Option<TradeIntent>,
    pub request: Option<SwapRequest>,
    pub outcome: Option<SwapOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Lifecycle {
    state: EngineState,
    /// Bumped on every start; a loop only runs while its generation is current.
    generation: u64,
}

impl Lifecycle {
    fn is_live(&self, generation: u64) -> bool {
        self.state == EngineState::Running && self.generation == generation
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SwapEngine {
    settings: EngineSettings,
    rules: ThresholdRule,
    price_feed: PriceFeed,
    balances: BalanceReader,
    executor: SwapExecutor,
    log: ActivityLog,
    lifecycle: watch::Sender<Lifecycle>,
    loop_guard: tokio::sync::Mutex<()>,
    iterations: AtomicU64,
    last_price: Mutex<Option<Decimal>>,
}

impl SwapEngine {
    pub fn new(
        settings: EngineSettings,
        rules: ThresholdRule,
        price_feed: PriceFeed,
        balances: BalanceReader,
        executor: SwapExecutor,
        log: ActivityLog,
    ) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle {
            state: EngineState::Idle,
            generation: 0,
        });

        Self {
            settings,
            rules,
            price_feed,
            balances,
            executor,
            log,
            lifecycle,
            loop_guard: tokio::sync::Mutex::new(()),
            iterations: AtomicU64::new(0),
            last_price: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.log
    }

    pub fn state(&self) -> EngineState {
        self.lifecycle.borrow().state
    }

    // ----- Lifecycle -----

    /// Enter `Running` and spawn the monitoring loop.
    ///
    /// Returns false, and leaves the running loop alone, if already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut generation = 0;
        let started = self.lifecycle.send_if_modified(|lc| {
            if lc.state == EngineState::Running {
                return false;
            }
            lc.state = EngineState::Running;
            lc.generation += 1;
            generation = lc.generation;
            true
        });

        if !started {
            self.log.info("Bot is already running");
            return false;
        }

        self.log.info(format!(
            "Bot started: token {:#x} on chain {}, checking every {}s",
            self.settings.tracked_token,
            self.settings.chain_id,
            self.settings.poll_interval.as_secs()
        ));

        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.monitor(generation).await });
        true
    }

    /// Leave `Running`. Returns false if the engine was not running.
    pub fn stop(&self) -> bool {
        let stopped = self.lifecycle.send_if_modified(|lc| {
            if lc.state != EngineState::Running {
                return false;
            }
            lc.state = EngineState::Stopped;
            true
        });

        if stopped {
            self.log.info("Bot stopped");
        } else {
            self.log.info("Bot is not running");
        }
        stopped
    }

    /// Wait until no monitoring loop is active.
    pub async fn join(&self) {
        let _idle = self.loop_guard.lock().await;
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            state: self.state(),
            tracked_asset: format!("{:#x}", self.settings.tracked_token),
            chain_id: self.settings.chain_id,
            wallet: format!("{:#x}", self.settings.wallet),
            log_count: self.log.len(),
            iterations: self.iterations.load(Ordering::Relaxed),
            last_price: *self.last_price.lock(),
        }
    }

    // ----- Loop -----

    async fn monitor(self: Arc<Self>, generation: u64) {
        let _active = self.loop_guard.lock().await;
        info!(generation, "Monitoring loop started");

        while self.is_live(generation) {
            let delay = match self.run_iteration().await {
                Ok(_) => self.settings.poll_interval,
                Err(e) => {
                    self.log.warn(format!("Error in monitoring loop: {e:#}"));
                    self.settings.recovery_delay
                }
            };
            self.sleep_while_live(generation, delay).await;
        }

        info!(generation, "Monitoring loop exited");
    }

    fn is_live(&self, generation: u64) -> bool {
        self.lifecycle.borrow().is_live(generation)
    }

    /// Sleep for `delay`, returning early if the engine leaves this generation.
    async fn sleep_while_live(&self, generation: u64, delay: Duration) {
        let mut rx = self.lifecycle.subscribe();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = wait_until_not_live(&mut rx, generation) => {
                debug!(generation, "Sleep interrupted by stop");
            }
        }
    }

    /// One loop body: price, condition, balances, sizing, quote, execute.
    ///
    /// Transient failures are absorbed into the report. An `Err` is an
    /// unexpected failure the loop answers with the recovery delay.
    pub async fn run_iteration(&self) -> Result<IterationReport> {
        self.iterations.fetch_add(1, Ordering::Relaxed);
        let mut report = IterationReport::default();
        let token = self.settings.tracked_token;

        let Some(reading) = self.price_feed.fetch(token).await else {
            return Ok(report);
        };
        self.log.info(format!("Current token price: ${}", reading.price));
        *self.last_price.lock() = Some(reading.price);
        let price = reading.price;
        report.reading = Some(reading);

        let Some(intent) = evaluate(price, &self.rules) else {
            return Ok(report);
        };
        self.log.info(format!(
            "Condition met: {} - Action: {}",
            intent.reason, intent.action
        ));
        let action = intent.action;
        report.intent = Some(intent);

        let wallet = self.settings.wallet;
        let native_balance = self.balances.read(NATIVE_ASSET, wallet).await;
        let token_balance = self.balances.read_holding(token, wallet).await;
        self.log.info(format!(
            "ETH Balance: {native_balance}, Token Balance: {token_balance}"
        ));

        let request = size_request(action, &self.settings.sizing(), &token_balance)?;
        if request.amount.is_zero() {
            self.log.info(format!("{} skipped: nothing to swap", label(action)));
            report.request = Some(request);
            return Ok(report);
        }

        let Some(quote) = self.executor.quote(&request).await else {
            self.log.warn(format!("{} skipped: no quote available", label(action)));
            report.request = Some(request);
            return Ok(report);
        };

        let outcome = self.executor.execute_quoted(&request, &quote).await;
        if outcome.is_success() {
            self.log.info(format!("{} order executed successfully!", label(action)));
        } else {
            self.log.warn(format!("{} order failed: {outcome}", label(action)));
        }

        report.request = Some(request);
        report.outcome = Some(outcome);
        Ok(report)
    }
}

async fn wait_until_not_live(rx: &mut watch::Receiver<Lifecycle>, generation: u64) {
    loop {
        let current = *rx.borrow_and_update();
        if !current.is_live(generation) {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nothing can stop us any more, let the timer decide.
            std::future::pending::<()>().await;
        }
    }
}

fn label(action: TradeAction) -> &'static str {
    match action {
        TradeAction::Buy => "Buy",
        TradeAction::Sell => "Sell",
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
