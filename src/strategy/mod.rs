//! Trading strategy.
//!
//! Pure decision logic, free of I/O:
//! - `conditions`: price thresholds -> trade intent
//! - `sizing`: trade intent + balances -> swap request

pub mod conditions;
pub mod sizing;

pub use conditions::{evaluate, ThresholdRule};
pub use sizing::{sell_amount, size_request, SizingConfig};
