//! DEX aggregator integrations.
//!
//! Defines the `PriceOracle` and `SwapRouter` traits the engine talks to,
//! and provides the OKX DEX aggregator implementation of both.

pub mod okx;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};
use rust_decimal::Decimal;

use crate::types::{SwapQuote, SwapTransaction};

/// Parameters shared by the quote and swap-build calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParams {
    pub chain_id: u64,
    pub from_asset: Address,
    pub to_asset: Address,
    /// Amount of `from_asset` in its smallest unit.
    pub amount: U256,
    /// Maximum acceptable slippage, in percent.
    pub slippage_pct: Decimal,
    pub user_wallet: Address,
}

/// Source of current token prices.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Current USD price of `token` on `chain_id`.
    async fn token_price(&self, chain_id: u64, token: Address) -> Result<Decimal>;
}

/// Liquidity router: quotes a conversion and prepares the transaction for it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SwapRouter: Send + Sync {
    /// Request a route. Fails with `SwapError::NoRoute` when none exists.
    async fn quote(&self, params: &RouteParams) -> Result<SwapQuote>;

    /// Request a ready-to-sign transaction for the same conversion.
    async fn build_swap(&self, params: &RouteParams) -> Result<SwapTransaction>;
}
