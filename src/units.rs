//! Conversions between human-readable decimals and on-chain integer units.
//!
//! `rust_decimal` carries at most 28 significant digits, so scaling a large
//! raw balance down may drop the least-significant fractional digits.
//! Scaling up always truncates toward zero.

use anyhow::{Context, Result};
use ethers::types::U256;
use ethers::utils::{format_units, parse_units};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::types::SwapError;

/// Decimal precision of the chain-native asset (wei).
pub const NATIVE_DECIMALS: u32 = 18;

/// Significant digits a `Decimal` can hold.
const DECIMAL_DIGITS: usize = 28;

/// Scale a raw integer amount down by `decimals` (e.g. wei -> ETH).
pub fn to_decimal(raw: U256, decimals: u32) -> Result<Decimal> {
    let text = format_units(raw, decimals)
        .map_err(|e| SwapError::Conversion(format!("format_units({raw}, {decimals}): {e}")))?;

    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let whole = whole.trim_start_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    if whole.len() > DECIMAL_DIGITS {
        return Err(SwapError::Conversion(format!("{raw} exceeds decimal range")).into());
    }

    let budget = DECIMAL_DIGITS - whole.len();
    let fraction = fraction.trim_end_matches('0');
    let fraction = &fraction[..fraction.len().min(budget)];

    let normalized = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{whole}.{fraction}")
    };
    Decimal::from_str(&normalized).with_context(|| format!("Failed to parse {normalized} as decimal"))
}

/// Scale a decimal amount up to raw integer units (e.g. ETH -> wei).
pub fn to_smallest_unit(amount: Decimal, decimals: u32) -> Result<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(SwapError::Conversion(format!("negative amount {amount}")).into());
    }
    let truncated = amount.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
    let parsed = parse_units(truncated.to_string(), decimals)
        .map_err(|e| SwapError::Conversion(format!("parse_units({truncated}, {decimals}): {e}")))?;
    Ok(parsed.into())
}

/// Re-express a raw amount held at `from` decimals at `to` decimals.
///
/// Exact when scaling up; scaling down truncates toward zero.
pub fn rescale(raw: U256, from: u32, to: u32) -> Result<U256> {
    if from == to {
        return Ok(raw);
    }
    if from > to {
        let shift = from - to;
        // 10^78 exceeds U256::MAX, so any larger shift floors to zero.
        if shift > 77 {
            return Ok(U256::zero());
        }
        return Ok(raw / U256::exp10(shift as usize));
    }
    let shift = to - from;
    if shift > 77 {
        return Err(SwapError::Conversion(format!("cannot rescale {raw} by 10^{shift}")).into());
    }
    raw.checked_mul(U256::exp10(shift as usize))
        .ok_or_else(|| SwapError::Conversion(format!("{raw} * 10^{shift} overflows")).into())
}

/// Parse a decimal string from an API payload, tolerating scientific notation.
pub fn parse_decimal(text: &str) -> Result<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .with_context(|| format!("Invalid decimal value: {text:?}"))
}

/// Parse a base-10 integer string (API amounts, gas limits) into `U256`.
pub fn parse_u256(text: &str) -> Result<U256> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(U256::zero());
    }
    if let Some(hex) = text.strip_prefix("0x") {
        return U256::from_str_radix(hex, 16).with_context(|| format!("Invalid hex integer: {text:?}"));
    }
    U256::from_dec_str(text).with_context(|| format!("Invalid integer: {text:?}"))
}
