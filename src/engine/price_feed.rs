//! Price feed.
//!
//! Wraps the price oracle. Failures never reach the caller: they are
//! recorded in the activity log and reported as "no reading". Retry
//! cadence belongs to the engine's poll interval.

use ethers::types::Address;
use std::sync::Arc;

use crate::aggregator::PriceOracle;
use crate::storage::ActivityLog;
use crate::types::PriceReading;

pub struct PriceFeed {
    oracle: Arc<dyn PriceOracle>,
    chain_id: u64,
    log: ActivityLog,
}

impl PriceFeed {
    pub fn new(oracle: Arc<dyn PriceOracle>, chain_id: u64, log: ActivityLog) -> Self {
        Self {
            oracle,
            chain_id,
            log,
        }
    }

    /// Current price of `asset`, or `None` if the oracle could not provide one.
    pub async fn fetch(&self, asset: Address) -> Option<PriceReading> {
        match self.oracle.token_price(self.chain_id, asset).await {
            Ok(price) => Some(PriceReading::new(asset, price)),
            Err(e) => {
                self.log.warn(format!("Error fetching token price: {e:#}"));
                None
            }
        }
    }
}
