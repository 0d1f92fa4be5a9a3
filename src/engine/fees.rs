//! Fee strategies for swap transactions.

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::U256;
use std::sync::Arc;
use tracing::warn;

use crate::chain::Ledger;

/// Default gas price: 1 gwei.
pub const DEFAULT_GAS_PRICE_WEI: u64 = 1_000_000_000;

/// Gas limit used when the router does not suggest one.
pub const DEFAULT_FALLBACK_GAS_LIMIT: u64 = 500_000;

/// Chooses gas price and gas limit for a swap transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeeStrategy: Send + Sync {
    async fn gas_price(&self) -> Result<U256>;

    /// Gas limit for a transaction, given the router's suggestion if any.
    fn gas_limit(&self, suggested: Option<U256>) -> U256;
}

// ---------------------------------------------------------------------------
// Fixed
// ---------------------------------------------------------------------------

/// Constant gas price and fallback limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFees {
    pub gas_price: U256,
    pub fallback_gas_limit: U256,
}

impl FixedFees {
    pub fn new(gas_price: U256, fallback_gas_limit: U256) -> Self {
        Self {
            gas_price,
            fallback_gas_limit,
        }
    }
}

impl Default for FixedFees {
    fn default() -> Self {
        Self::new(
            U256::from(DEFAULT_GAS_PRICE_WEI),
            U256::from(DEFAULT_FALLBACK_GAS_LIMIT),
        )
    }
}

#[async_trait]
impl FeeStrategy for FixedFees {
    async fn gas_price(&self) -> Result<U256> {
        Ok(self.gas_price)
    }

    fn gas_limit(&self, suggested: Option<U256>) -> U256 {
        match suggested {
            Some(limit) if !limit.is_zero() => limit,
            _ => self.fallback_gas_limit,
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Gas price from the node's `eth_gasPrice`, falling back to fixed values.
pub struct NodeFees {
    ledger: Arc<dyn Ledger>,
    fallback: FixedFees,
}

impl NodeFees {
    pub fn new(ledger: Arc<dyn Ledger>, fallback: FixedFees) -> Self {
        Self { ledger, fallback }
    }
}

#[async_trait]
impl FeeStrategy for NodeFees {
    async fn gas_price(&self) -> Result<U256> {
        match self.ledger.gas_price().await {
            Ok(price) if !price.is_zero() => Ok(price),
            Ok(_) => {
                warn!("Node reported zero gas price, using fixed price");
                Ok(self.fallback.gas_price)
            }
            Err(e) => {
                warn!(error = %e, "eth_gasPrice failed, using fixed price");
                Ok(self.fallback.gas_price)
            }
        }
    }

    fn gas_limit(&self, suggested: Option<U256>) -> U256 {
        self.fallback.gas_limit(suggested)
    }
}
