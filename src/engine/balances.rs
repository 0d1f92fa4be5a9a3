//! Balance reader.
//!
//! Returns human-readable balances, or the raw holding for exact sizing.
//! Any lookup failure yields zero and is logged, so a broken RPC can at
//! worst zero-size a sell.

use anyhow::Result;
use ethers::types::Address;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::chain::Ledger;
use crate::storage::ActivityLog;
use crate::types::{is_native, TokenHolding};
use crate::units::{to_decimal, NATIVE_DECIMALS};

pub struct BalanceReader {
    ledger: Arc<dyn Ledger>,
    log: ActivityLog,
}

impl BalanceReader {
    pub fn new(ledger: Arc<dyn Ledger>, log: ActivityLog) -> Self {
        Self { ledger, log }
    }

    /// Balance of `asset` held by `owner`, or zero on failure.
    pub async fn read(&self, asset: Address, owner: Address) -> Decimal {
        let holding = self.read_holding(asset, owner).await;
        match to_decimal(holding.raw, holding.decimals) {
            Ok(amount) => amount,
            Err(e) => {
                self.log.warn(format!("Error getting wallet balance: {e:#}"));
                Decimal::ZERO
            }
        }
    }

    /// Raw balance of `asset` held by `owner` with its precision, or zero on failure.
    pub async fn read_holding(&self, asset: Address, owner: Address) -> TokenHolding {
        match self.try_read(asset, owner).await {
            Ok(holding) => holding,
            Err(e) => {
                self.log.warn(format!("Error getting wallet balance: {e:#}"));
                TokenHolding::zero()
            }
        }
    }

    async fn try_read(&self, asset: Address, owner: Address) -> Result<TokenHolding> {
        if is_native(asset) {
            let wei = self.ledger.native_balance(owner).await?;
            return Ok(TokenHolding::new(wei, NATIVE_DECIMALS));
        }

        let raw = self.ledger.token_balance(asset, owner).await?;
        let decimals = self.ledger.token_decimals(asset).await?;
        Ok(TokenHolding::new(raw, u32::from(decimals)))
    }
}
