//! Trade sizing.
//!
//! Buys spend a fixed amount of the native asset. Sells spend a percentage
//! of the tracked-token balance, re-expressed at 18 decimals regardless of
//! the token's actual precision. The rescale is integer arithmetic on the
//! raw balance, so no digits are lost for large holdings.

use anyhow::Result;
use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use tracing::debug;

use crate::types::{SwapRequest, TokenHolding, TradeAction, NATIVE_ASSET};
use crate::units::{rescale, to_smallest_unit, NATIVE_DECIMALS};

/// Decimal precision assumed when rescaling the token balance for a sell.
pub const SELL_SCALE_DECIMALS: u32 = 18;

/// Sizing parameters.
#[derive(Debug, Clone)]
pub struct SizingConfig {
    pub tracked_token: Address,
    /// Native amount spent per buy, in whole units (e.g. ETH).
    pub buy_amount_native: Decimal,
    /// Share of the token balance sold per sell, 1..=100.
    pub sell_percentage: u8,
}

/// `floor(balance * pct / 100)`.
pub fn sell_amount(balance: U256, sell_percentage: u8) -> U256 {
    let pct = U256::from(sell_percentage);
    let hundred = U256::from(100u8);
    match balance.checked_mul(pct) {
        Some(scaled) => scaled / hundred,
        // Only reachable near U256::MAX; dividing first loses at most 99 units.
        None => balance / hundred * pct,
    }
}

/// Build the swap request for `action`.
///
/// `token_balance` is the raw tracked-token holding; it is only consulted
/// for sells.
pub fn size_request(
    action: TradeAction,
    config: &SizingConfig,
    token_balance: &TokenHolding,
) -> Result<SwapRequest> {
    let request = match action {
        TradeAction::Buy => SwapRequest {
            from_asset: NATIVE_ASSET,
            to_asset: config.tracked_token,
            amount: to_smallest_unit(config.buy_amount_native, NATIVE_DECIMALS)?,
        },
        TradeAction::Sell => {
            let balance = rescale(token_balance.raw, token_balance.decimals, SELL_SCALE_DECIMALS)?;
            SwapRequest {
                from_asset: config.tracked_token,
                to_asset: NATIVE_ASSET,
                amount: sell_amount(balance, config.sell_percentage),
            }
        }
    };

    debug!(action = %action, amount = %request.amount, "Sized swap request");
    Ok(request)
}
