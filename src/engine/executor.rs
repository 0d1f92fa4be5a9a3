//! Swap executor.
//!
//! Runs the two-phase aggregator protocol for one swap request:
//! quote, then build/submit/confirm. Every failure aborts the remaining
//! phases and is reported as a `SwapOutcome`, never as an error. Nothing
//! is retried here.

use anyhow::Result;
use chrono::Utc;
use ethers::types::TxHash;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::aggregator::{RouteParams, SwapRouter};
use crate::chain::Ledger;
use crate::engine::fees::FeeStrategy;
use crate::storage::ActivityLog;
use crate::types::{SwapError, SwapOutcome, SwapQuote, SwapRequest, SwapTransaction, TxDescriptor, TxReceipt};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub chain_id: u64,
    /// Maximum acceptable slippage, in percent.
    pub slippage_pct: Decimal,
    /// Upper bound on the wait for a receipt after submission.
    pub confirmation_timeout: Duration,
    /// Delay between receipt lookups.
    pub confirmation_poll: Duration,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct SwapExecutor {
    router: Arc<dyn SwapRouter>,
    ledger: Arc<dyn Ledger>,
    fees: Arc<dyn FeeStrategy>,
    log: ActivityLog,
    settings: ExecutorSettings,
}

impl SwapExecutor {
    pub fn new(
        router: Arc<dyn SwapRouter>,
        ledger: Arc<dyn Ledger>,
        fees: Arc<dyn FeeStrategy>,
        log: ActivityLog,
        settings: ExecutorSettings,
    ) -> Self {
        Self {
            router,
            ledger,
            fees,
            log,
            settings,
        }
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Quote phase only. `None` when the router has no route or fails.
    pub async fn quote(&self, request: &SwapRequest) -> Option<SwapQuote> {
        let params = self.route_params(request);
        match self.router.quote(&params).await {
            Ok(quote) => {
                debug!(
                    amount_in = %quote.amount_in,
                    amount_out = ?quote.amount_out,
                    "Quote received"
                );
                Some(quote)
            }
            Err(e) => {
                self.log.warn(format!("Error getting swap quote: {e:#}"));
                None
            }
        }
    }

    /// Full protocol: quote, then execute. A failed quote submits nothing.
    pub async fn execute(&self, request: &SwapRequest) -> SwapOutcome {
        let params = self.route_params(request);
        match self.router.quote(&params).await {
            Ok(quote) => self.execute_quoted(request, &quote).await,
            Err(e) => {
                self.log.warn(format!("Error getting swap quote: {e:#}"));
                SwapOutcome::failed(format!("{e:#}"))
            }
        }
    }

    /// Execute phase against an already obtained quote.
    ///
    /// The aggregator's build endpoint cannot be bound to an earlier quote,
    /// so the quote is advisory; its age at build time is logged.
    pub async fn execute_quoted(&self, request: &SwapRequest, quote: &SwapQuote) -> SwapOutcome {
        let params = self.route_params(request);

        let template = match self.router.build_swap(&params).await {
            Ok(tx) => tx,
            Err(e) => return self.abort(e),
        };

        let staleness_ms = (Utc::now() - quote.quoted_at).num_milliseconds().max(0);
        info!(
            staleness_ms,
            quoted_out = ?quote.amount_out,
            "Swap transaction built from advisory quote"
        );

        let descriptor = match self.describe(template).await {
            Ok(d) => d,
            Err(e) => return self.abort(e),
        };

        let tx_hash = match self.ledger.submit(&descriptor).await {
            Ok(hash) => hash,
            Err(e) => return self.abort(e),
        };
        self.log.info(format!("Swap executed! TX Hash: {tx_hash:#x}"));

        self.await_confirmation(tx_hash).await
    }

    fn route_params(&self, request: &SwapRequest) -> RouteParams {
        RouteParams {
            chain_id: self.settings.chain_id,
            from_asset: request.from_asset,
            to_asset: request.to_asset,
            amount: request.amount,
            slippage_pct: self.settings.slippage_pct,
            user_wallet: self.ledger.wallet(),
        }
    }

    async fn describe(&self, template: SwapTransaction) -> Result<TxDescriptor> {
        let gas_price = self.fees.gas_price().await?;
        Ok(TxDescriptor {
            to: template.to,
            data: template.data,
            value: template.value.unwrap_or_default(),
            gas_limit: self.fees.gas_limit(template.gas_limit),
            gas_price,
        })
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> SwapOutcome {
        let limit = self.settings.confirmation_timeout;
        match tokio::time::timeout(limit, self.poll_receipt(tx_hash)).await {
            Ok(receipt) if receipt.succeeded => {
                self.log.info(format!("Swap confirmed! Block: {}", receipt.block_number));
                SwapOutcome::confirmed(tx_hash, receipt.block_number)
            }
            Ok(receipt) => {
                let err = SwapError::Reverted {
                    tx_hash: format!("{tx_hash:#x}"),
                };
                self.log.warn(format!("{err} in block {}", receipt.block_number));
                SwapOutcome::failed_onchain(tx_hash, err)
            }
            Err(_) => {
                let err = SwapError::ConfirmationTimeout {
                    tx_hash: format!("{tx_hash:#x}"),
                    waited_secs: limit.as_secs(),
                };
                self.log.warn(err.to_string());
                SwapOutcome::timed_out(tx_hash, err)
            }
        }
    }

    /// Poll until a receipt appears. Lookup errors are transient.
    async fn poll_receipt(&self, tx_hash: TxHash) -> TxReceipt {
        loop {
            match self.ledger.receipt(tx_hash).await {
                Ok(Some(receipt)) => return receipt,
                Ok(None) => {}
                Err(e) => warn!(tx = %format!("{tx_hash:#x}"), error = %e, "Receipt lookup failed"),
            }
            tokio::time::sleep(self.settings.confirmation_poll).await;
        }
    }

    fn abort(&self, e: anyhow::Error) -> SwapOutcome {
        self.log.warn(format!("Error executing swap: {e:#}"));
        SwapOutcome::failed(format!("{e:#}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
