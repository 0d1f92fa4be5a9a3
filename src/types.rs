//! Shared types for the AUTOSWAP bot.
//!
//! These types form the data model used across all modules.
//! They are kept free of I/O so that aggregator, chain, strategy and
//! engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, TxHash, H160, U256};
use ethers::utils::format_units;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The chain-native base asset is addressed by the zero address,
/// both by the aggregator API and by the balance reader.
pub const NATIVE_ASSET: Address = H160([0u8; 20]);

/// Returns true when `asset` refers to the chain-native base asset.
pub fn is_native(asset: Address) -> bool {
    asset == NATIVE_ASSET
}

/// Raw on-chain balance together with the precision it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenHolding {
    pub raw: U256,
    pub decimals: u32,
}

impl TokenHolding {
    pub fn new(raw: U256, decimals: u32) -> Self {
        Self { raw, decimals }
    }

    pub fn zero() -> Self {
        Self::new(U256::zero(), 18)
    }
}

impl fmt::Display for TokenHolding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match format_units(self.raw, self.decimals) {
            Ok(text) if text.contains('.') => {
                f.write_str(text.trim_end_matches('0').trim_end_matches('.'))
            }
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{} (raw)", self.raw),
        }
    }
}

// ---------------------------------------------------------------------------
// Price
// ---------------------------------------------------------------------------

/// A single price observation for the tracked asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReading {
    pub asset: Address,
    /// Price in USD as reported by the oracle.
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl PriceReading {
    pub fn new(asset: Address, price: Decimal) -> Self {
        Self {
            asset,
            price,
            observed_at: Utc::now(),
        }
    }
}

impl fmt::Display for PriceReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x} @ ${}", self.asset, self.price)
    }
}

// ---------------------------------------------------------------------------
// Trade intent
// ---------------------------------------------------------------------------

/// Direction of a triggered trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeAction {
    /// Base asset -> tracked asset.
    Buy,
    /// Tracked asset -> base asset.
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "buy"),
            TradeAction::Sell => write!(f, "sell"),
        }
    }
}

/// A trade the condition evaluator wants to perform this iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub action: TradeAction,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Swap protocol
// ---------------------------------------------------------------------------

/// A sized conversion between two assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub from_asset: Address,
    pub to_asset: Address,
    /// Amount of `from_asset` in its smallest unit.
    pub amount: U256,
}

impl fmt::Display for SwapRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:#x} -> {:#x}",
            self.amount, self.from_asset, self.to_asset
        )
    }
}

/// Route returned by the aggregator's quote endpoint.
///
/// Opaque beyond the expected output; the raw route payload is kept for
/// logging and so it can be handed to the execute phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapQuote {
    pub from_asset: Address,
    pub to_asset: Address,
    pub amount_in: U256,
    /// Expected output in the destination asset's smallest unit, if reported.
    pub amount_out: Option<U256>,
    pub route: serde_json::Value,
    pub quoted_at: DateTime<Utc>,
}

/// Prepared transaction template returned by the aggregator's swap endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapTransaction {
    pub to: Address,
    pub data: Bytes,
    pub value: Option<U256>,
    pub gas_limit: Option<U256>,
}

/// Fully-specified transaction handed to the signer/broadcaster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxDescriptor {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: U256,
}

/// Inclusion receipt for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// False when the transaction was included but reverted.
    pub succeeded: bool,
}

/// Terminal state of one swap attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SwapStatus {
    Confirmed { block_number: u64 },
    Failed,
    /// Submitted, but no receipt arrived within the confirmation timeout.
    TimedOut,
}

/// Result of one swap attempt. Logged, never retried within an iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
    #[serde(flatten)]
    pub status: SwapStatus,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

impl SwapOutcome {
    pub fn confirmed(tx_hash: TxHash, block_number: u64) -> Self {
        Self {
            status: SwapStatus::Confirmed { block_number },
            tx_hash: Some(format!("{tx_hash:#x}")),
            error: None,
        }
    }

    /// Failure before anything reached the chain.
    pub fn failed(error: impl fmt::Display) -> Self {
        Self {
            status: SwapStatus::Failed,
            tx_hash: None,
            error: Some(error.to_string()),
        }
    }

    /// Failure after submission (e.g. the transaction reverted).
    pub fn failed_onchain(tx_hash: TxHash, error: impl fmt::Display) -> Self {
        Self {
            status: SwapStatus::Failed,
            tx_hash: Some(format!("{tx_hash:#x}")),
            error: Some(error.to_string()),
        }
    }

    pub fn timed_out(tx_hash: TxHash, error: impl fmt::Display) -> Self {
        Self {
            status: SwapStatus::TimedOut,
            tx_hash: Some(format!("{tx_hash:#x}")),
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, SwapStatus::Confirmed { .. })
    }
}

impl fmt::Display for SwapOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tx = self.tx_hash.as_deref().unwrap_or("-");
        match (&self.status, &self.error) {
            (SwapStatus::Confirmed { block_number }, _) => {
                write!(f, "confirmed in block {block_number} (tx {tx})")
            }
            (SwapStatus::Failed, err) => {
                write!(f, "failed (tx {tx}): {}", err.as_deref().unwrap_or("unknown"))
            }
            (SwapStatus::TimedOut, err) => {
                write!(f, "timed out (tx {tx}): {}", err.as_deref().unwrap_or("unknown"))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "IDLE"),
            EngineState::Running => write!(f, "RUNNING"),
            EngineState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Snapshot returned by `SwapEngine::status()`.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub tracked_asset: String,
    pub chain_id: u64,
    pub wallet: String,
    pub log_count: usize,
    pub iterations: u64,
    pub last_price: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for AUTOSWAP.
#[derive(Debug, thiserror::Error)]
pub enum SwapError {
    #[error("Aggregator API error (code {code}): {message}")]
    Api { code: String, message: String },

    #[error("No route available")]
    NoRoute,

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("No confirmation for {tx_hash} after {waited_secs}s")]
    ConfirmationTimeout { tx_hash: String, waited_secs: u64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
