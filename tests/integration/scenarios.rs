//! End-to-end trading scenarios.

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use autoswap::chain::Ledger;
use autoswap::engine::{
    BalanceReader, EngineSettings, ExecutorSettings, FixedFees, PriceFeed, SwapEngine,
    SwapExecutor,
};
use autoswap::storage::ActivityLog;
use autoswap::strategy::ThresholdRule;
use autoswap::types::{EngineState, SwapStatus, TradeAction, NATIVE_ASSET};

use crate::mock_chain::{MockLedger, MockOracle, MockRouter};

const CHAIN_ID: u64 = 42161;

fn token() -> Address {
    Address::repeat_byte(0x07)
}

struct Harness {
    engine: Arc<SwapEngine>,
    oracle: Arc<MockOracle>,
    router: Arc<MockRouter>,
    ledger: Arc<MockLedger>,
    log: ActivityLog,
}

fn harness(oracle: MockOracle, ledger: MockLedger, sell_percentage: u8) -> Harness {
    let oracle = Arc::new(oracle);
    let router = Arc::new(MockRouter::new());
    let ledger = Arc::new(ledger);
    let log = ActivityLog::in_memory();

    let settings = EngineSettings {
        chain_id: CHAIN_ID,
        tracked_token: token(),
        wallet: ledger.wallet(),
        buy_amount_native: dec!(0.01),
        sell_percentage,
        poll_interval: Duration::from_secs(30),
        recovery_delay: Duration::from_secs(5),
    };

    let executor = SwapExecutor::new(
        router.clone(),
        ledger.clone(),
        Arc::new(FixedFees::default()),
        log.clone(),
        ExecutorSettings {
            chain_id: CHAIN_ID,
            slippage_pct: dec!(0.5),
            confirmation_timeout: Duration::from_secs(300),
            confirmation_poll: Duration::from_secs(2),
        },
    );

    let engine = Arc::new(SwapEngine::new(
        settings,
        ThresholdRule::new(Some(dec!(0.001)), Some(dec!(0.01))),
        PriceFeed::new(oracle.clone(), CHAIN_ID, log.clone()),
        BalanceReader::new(ledger.clone(), log.clone()),
        executor,
        log.clone(),
    ));

    Harness {
        engine,
        oracle,
        router,
        ledger,
        log,
    }
}

fn whole_tokens(n: u64) -> U256 {
    U256::exp10(18) * U256::from(n)
}

fn logged(log: &ActivityLog, needle: &str) -> bool {
    log.recent(usize::MAX).iter().any(|l| l.contains(needle))
}

#[tokio::test]
async fn scenario_a_buy_below_threshold() {
    let h = harness(
        MockOracle::fixed(dec!(0.0005)),
        MockLedger::new(U256::exp10(18), U256::zero(), 18),
        100,
    );

    let report = h.engine.run_iteration().await.unwrap();

    assert_eq!(report.intent.unwrap().action, TradeAction::Buy);
    let request = report.request.unwrap();
    assert_eq!(request.from_asset, NATIVE_ASSET);
    assert_eq!(request.to_asset, token());
    assert_eq!(request.amount, U256::exp10(16));

    // Quote pre-check once, execute once.
    assert_eq!(h.router.quotes().len(), 1);
    assert_eq!(h.router.builds().len(), 1);
    let submitted = h.ledger.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].to, h.router.router_address);
    assert_eq!(submitted[0].value, U256::exp10(16));
    assert_eq!(submitted[0].gas_limit, U256::from(500_000u64));
    assert_eq!(submitted[0].gas_price, U256::exp10(9));

    assert_eq!(report.outcome.unwrap().status, SwapStatus::Confirmed { block_number: 1001 });
    assert!(logged(&h.log, "Buy order executed successfully!"));
    assert!(logged(&h.log, "Swap confirmed! Block: 1001"));
}

#[tokio::test]
async fn scenario_b_sell_half_of_balance() {
    let h = harness(
        MockOracle::fixed(dec!(0.02)),
        MockLedger::new(U256::exp10(18), whole_tokens(1000), 18),
        50,
    );

    let report = h.engine.run_iteration().await.unwrap();

    assert_eq!(report.intent.unwrap().action, TradeAction::Sell);
    let request = report.request.unwrap();
    assert_eq!(request.from_asset, token());
    assert_eq!(request.to_asset, NATIVE_ASSET);
    assert_eq!(request.amount, whole_tokens(500));

    let quotes = h.router.quotes();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].amount, whole_tokens(500));
    assert_eq!(quotes[0].slippage_pct, dec!(0.5));
    assert_eq!(quotes[0].chain_id, CHAIN_ID);
    assert!(report.outcome.unwrap().is_success());
    assert!(logged(&h.log, "Sell order executed successfully!"));
}

#[tokio::test]
async fn scenario_b_sell_sizing_assumes_18_decimals() {
    // 1000 whole tokens of a 6-decimal token are still sized as 1000 * 10^18 * 50%.
    let h = harness(
        MockOracle::fixed(dec!(0.02)),
        MockLedger::new(U256::zero(), U256::from(1_000_000_000u64), 6),
        50,
    );

    let report = h.engine.run_iteration().await.unwrap();
    assert_eq!(report.request.unwrap().amount, whole_tokens(500));
}

#[tokio::test]
async fn sell_of_large_balance_keeps_every_wei() {
    let raw = U256::exp10(30) + U256::from(7u64);
    let h = harness(
        MockOracle::fixed(dec!(0.02)),
        MockLedger::new(U256::exp10(18), raw, 18),
        100,
    );

    let report = h.engine.run_iteration().await.unwrap();
    assert_eq!(report.request.unwrap().amount, raw);
    assert_eq!(h.ledger.submitted().len(), 1);
}

#[tokio::test]
async fn scenario_c_between_thresholds_never_swaps() {
    let h = harness(
        MockOracle::fixed(dec!(0.005)),
        MockLedger::new(U256::exp10(18), whole_tokens(1000), 18),
        100,
    );

    let report = h.engine.run_iteration().await.unwrap();

    assert_eq!(report.reading.unwrap().price, dec!(0.005));
    assert!(report.intent.is_none());
    assert!(h.router.quotes().is_empty());
    assert!(h.ledger.submitted().is_empty());
}

#[tokio::test]
async fn scenario_d_feed_failure_is_absorbed() {
    let h = harness(
        MockOracle::failing("connection refused"),
        MockLedger::new(U256::exp10(18), whole_tokens(1000), 18),
        100,
    );

    let report = h.engine.run_iteration().await.unwrap();

    assert!(report.reading.is_none());
    assert!(report.intent.is_none());
    assert!(h.router.quotes().is_empty());
    assert!(logged(&h.log, "Error fetching token price: connection refused"));
}

#[tokio::test(start_paused = true)]
async fn scenario_d_loop_keeps_polling_after_failure() {
    let h = harness(
        MockOracle::failing("connection refused"),
        MockLedger::new(U256::exp10(18), whole_tokens(1000), 18),
        100,
    );

    assert!(h.engine.start());
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(h.oracle.calls(), 2);
    assert_eq!(h.engine.state(), EngineState::Running);

    // Feed recovers; the next poll trades.
    h.oracle.set_price(dec!(0.0005));
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.oracle.calls(), 3);
    assert_eq!(h.ledger.submitted().len(), 1);

    assert!(h.engine.stop());
    h.engine.join().await;
    assert_eq!(h.engine.state(), EngineState::Stopped);
}

#[tokio::test]
async fn no_route_skips_execution() {
    let h = harness(
        MockOracle::fixed(dec!(0.0005)),
        MockLedger::new(U256::exp10(18), U256::zero(), 18),
        100,
    );
    h.router.set_no_route();

    let report = h.engine.run_iteration().await.unwrap();

    assert!(report.request.is_some());
    assert!(report.outcome.is_none());
    assert_eq!(h.router.quotes().len(), 1);
    assert!(h.router.builds().is_empty());
    assert!(h.ledger.submitted().is_empty());
}

#[tokio::test]
async fn executor_alone_short_circuits_on_no_route() {
    let h = harness(
        MockOracle::fixed(dec!(0.0005)),
        MockLedger::new(U256::exp10(18), U256::zero(), 18),
        100,
    );
    h.router.set_no_route();

    let executor = SwapExecutor::new(
        h.router.clone(),
        h.ledger.clone(),
        Arc::new(FixedFees::default()),
        h.log.clone(),
        ExecutorSettings {
            chain_id: CHAIN_ID,
            slippage_pct: dec!(0.5),
            confirmation_timeout: Duration::from_secs(10),
            confirmation_poll: Duration::from_secs(1),
        },
    );
    let outcome = executor
        .execute(&autoswap::types::SwapRequest {
            from_asset: NATIVE_ASSET,
            to_asset: token(),
            amount: U256::exp10(16),
        })
        .await;

    assert!(!outcome.is_success());
    assert!(h.router.builds().is_empty());
    assert!(h.ledger.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn condition_refires_every_poll() {
    let h = harness(
        MockOracle::fixed(dec!(0.0001)),
        MockLedger::new(U256::exp10(18), U256::zero(), 18),
        100,
    );

    h.engine.start();
    // Polls at t = 0, 30, 60, 90.
    tokio::time::sleep(Duration::from_secs(95)).await;
    h.engine.stop();
    h.engine.join().await;

    assert_eq!(h.ledger.submitted().len(), 4);
    let status = h.engine.status();
    assert_eq!(status.iterations, 4);
    assert_eq!(status.last_price, Some(Decimal::new(1, 4)));
    assert!(status.log_count > 0);
}
