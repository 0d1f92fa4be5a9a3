//! AUTOSWAP: price-conditional token swap bot.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the aggregator and chain clients into the swap engine, and runs
//! it until Ctrl-C / SIGTERM with a graceful stop.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info};

use autoswap::aggregator::okx::OkxDexClient;
use autoswap::chain::evm::EvmLedger;
use autoswap::chain::Ledger;
use autoswap::config::{AppConfig, FeeStrategyKind};
use autoswap::dashboard;
use autoswap::engine::{BalanceReader, FeeStrategy, NodeFees, PriceFeed, SwapEngine, SwapExecutor};
use autoswap::storage::ActivityLog;

const BANNER: &str = r#"
  ================================================
    AUTOSWAP  //  price-conditional token swaps
  ================================================
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("AUTOSWAP_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = AppConfig::load(&config_path)?;

    init_logging(&cfg);
    cfg.log_warnings();

    println!("{BANNER}");
    info!(
        token = %cfg.token.address,
        chain_id = cfg.network.chain_id,
        interval_secs = cfg.monitor.check_interval_secs,
        buy_below = ?cfg.conditions.buy_price_below,
        sell_above = ?cfg.conditions.sell_price_above,
        "AUTOSWAP starting up"
    );

    // Missing credential is fatal before anything is built.
    let private_key = cfg.resolve_private_key()?;

    // -- Initialise components -------------------------------------------

    let ledger: Arc<dyn Ledger> = Arc::new(
        EvmLedger::connect(&cfg.network.rpc_url, &private_key, cfg.network.chain_id)
            .context("Failed to initialise chain client")?,
    );
    let wallet = ledger.wallet();

    let okx = Arc::new(
        OkxDexClient::new(&cfg.api.base_url, cfg.api_timeout())
            .context("Failed to initialise aggregator client")?,
    );

    let fixed = cfg.fixed_fees()?;
    let fees: Arc<dyn FeeStrategy> = match cfg.swap.fee_strategy {
        FeeStrategyKind::Fixed => Arc::new(fixed),
        FeeStrategyKind::Node => Arc::new(NodeFees::new(ledger.clone(), fixed)),
    };

    let log = ActivityLog::new(cfg.activity_path());

    let engine = Arc::new(SwapEngine::new(
        cfg.engine_settings(wallet)?,
        cfg.threshold_rule(),
        PriceFeed::new(okx.clone(), cfg.network.chain_id, log.clone()),
        BalanceReader::new(ledger.clone(), log.clone()),
        SwapExecutor::new(okx, ledger, fees, log.clone(), cfg.executor_settings()),
        log,
    ));

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(engine.clone(), cfg.dashboard.port).await?;
    }

    // -- Run -------------------------------------------------------------

    engine.start();
    info!("Engine running. Press Ctrl+C to stop.");

    wait_for_shutdown().await;
    info!("Shutdown signal received.");

    engine.stop();
    engine.join().await;

    let status = engine.status();
    info!(
        iterations = status.iterations,
        log_entries = status.log_count,
        "AUTOSWAP shut down cleanly."
    );

    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Initialise the tracing subscriber (JSON output via env or config).
fn init_logging(cfg: &AppConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("autoswap=info"));

    let json_logging = std::env::var("AUTOSWAP_LOG_JSON").is_ok() || cfg.logging.json;

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
