//! Price-threshold trigger evaluation.
//!
//! Maps a price reading plus the configured thresholds to an optional
//! trade intent. Pure and deterministic: no hysteresis, no cooldown, so a
//! condition that stays true fires again on every poll.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{TradeAction, TradeIntent};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Threshold rules, fixed for the engine's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Buy when price <= this value.
    pub buy_below: Option<Decimal>,
    /// Sell when price >= this value.
    pub sell_above: Option<Decimal>,
    /// Reserved: percentage-rise trigger. Accepted but never evaluated.
    pub price_increase_pct: Option<Decimal>,
    /// Reserved: percentage-drop trigger. Accepted but never evaluated.
    pub price_decrease_pct: Option<Decimal>,
}

impl ThresholdRule {
    pub fn new(buy_below: Option<Decimal>, sell_above: Option<Decimal>) -> Self {
        Self {
            buy_below,
            sell_above,
            ..Self::default()
        }
    }

    /// True when a price could satisfy both thresholds at once.
    /// Buy wins in that case, which is rarely what the operator meant.
    pub fn is_overlapping(&self) -> bool {
        matches!((self.buy_below, self.sell_above), (Some(b), Some(a)) if b >= a)
    }

    /// True when a reserved percentage trigger has been configured.
    pub fn has_reserved_triggers(&self) -> bool {
        self.price_increase_pct.is_some() || self.price_decrease_pct.is_some()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Evaluate the rules against the current price.
///
/// The buy condition is checked first; sell is only considered when buy
/// does not match. Both comparisons are inclusive.
pub fn evaluate(current_price: Decimal, rules: &ThresholdRule) -> Option<TradeIntent> {
    if let Some(buy_below) = rules.buy_below {
        if current_price <= buy_below {
            return Some(TradeIntent {
                action: TradeAction::Buy,
                reason: format!("Price below {buy_below}"),
            });
        }
    }

    if let Some(sell_above) = rules.sell_above {
        if current_price >= sell_above {
            return Some(TradeIntent {
                action: TradeAction::Sell,
                reason: format!("Price above {sell_above}"),
            });
        }
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
