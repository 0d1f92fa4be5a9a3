//! In-memory aggregator and ledger for integration testing.
//!
//! Deterministic implementations of `PriceOracle`, `SwapRouter` and
//! `Ledger` that record every call, with no network access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use ethers::types::{Address, TxHash, U256};
use rust_decimal::Decimal;
use std::sync::Mutex;

use autoswap::aggregator::{PriceOracle, RouteParams, SwapRouter};
use autoswap::chain::Ledger;
use autoswap::types::{SwapError, SwapQuote, SwapTransaction, TxDescriptor, TxReceipt};

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

/// Price oracle returning a fixed price, or failing on every call.
pub struct MockOracle {
    price: Mutex<Result<Decimal, String>>,
    calls: Mutex<usize>,
}

impl MockOracle {
    pub fn fixed(price: Decimal) -> Self {
        Self {
            price: Mutex::new(Ok(price)),
            calls: Mutex::new(0),
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            price: Mutex::new(Err(msg.to_string())),
            calls: Mutex::new(0),
        }
    }

    pub fn set_price(&self, price: Decimal) {
        *self.price.lock().unwrap() = Ok(price);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PriceOracle for MockOracle {
    async fn token_price(&self, _chain_id: u64, _token: Address) -> Result<Decimal> {
        *self.calls.lock().unwrap() += 1;
        self.price.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Router that records quote and build requests.
pub struct MockRouter {
    pub router_address: Address,
    no_route: Mutex<bool>,
    quotes: Mutex<Vec<RouteParams>>,
    builds: Mutex<Vec<RouteParams>>,
}

impl MockRouter {
    pub fn new() -> Self {
        Self {
            router_address: Address::repeat_byte(0x99),
            no_route: Mutex::new(false),
            quotes: Mutex::new(Vec::new()),
            builds: Mutex::new(Vec::new()),
        }
    }

    /// Make every quote fail with "no route".
    pub fn set_no_route(&self) {
        *self.no_route.lock().unwrap() = true;
    }

    pub fn quotes(&self) -> Vec<RouteParams> {
        self.quotes.lock().unwrap().clone()
    }

    pub fn builds(&self) -> Vec<RouteParams> {
        self.builds.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapRouter for MockRouter {
    async fn quote(&self, params: &RouteParams) -> Result<SwapQuote> {
        self.quotes.lock().unwrap().push(params.clone());
        if *self.no_route.lock().unwrap() {
            return Err(SwapError::NoRoute.into());
        }
        Ok(SwapQuote {
            from_asset: params.from_asset,
            to_asset: params.to_asset,
            amount_in: params.amount,
            amount_out: Some(params.amount * U256::from(2u64)),
            route: serde_json::json!({ "mock": true }),
            quoted_at: Utc::now(),
        })
    }

    async fn build_swap(&self, params: &RouteParams) -> Result<SwapTransaction> {
        self.builds.lock().unwrap().push(params.clone());
        Ok(SwapTransaction {
            to: self.router_address,
            data: vec![0x12, 0x34].into(),
            value: Some(params.amount),
            gas_limit: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Ledger with fixed balances that confirms every submission immediately.
pub struct MockLedger {
    wallet: Address,
    native_wei: U256,
    token_raw: U256,
    token_decimals: u8,
    submitted: Mutex<Vec<TxDescriptor>>,
}

impl MockLedger {
    pub fn new(native_wei: U256, token_raw: U256, token_decimals: u8) -> Self {
        Self {
            wallet: Address::repeat_byte(0xaa),
            native_wei,
            token_raw,
            token_decimals,
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn submitted(&self) -> Vec<TxDescriptor> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ledger for MockLedger {
    fn wallet(&self) -> Address {
        self.wallet
    }

    async fn native_balance(&self, _owner: Address) -> Result<U256> {
        Ok(self.native_wei)
    }

    async fn token_balance(&self, _token: Address, _owner: Address) -> Result<U256> {
        Ok(self.token_raw)
    }

    async fn token_decimals(&self, _token: Address) -> Result<u8> {
        Ok(self.token_decimals)
    }

    async fn gas_price(&self) -> Result<U256> {
        Ok(U256::exp10(8))
    }

    async fn submit(&self, tx: &TxDescriptor) -> Result<TxHash> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(tx.clone());
        Ok(TxHash::from_low_u64_be(submitted.len() as u64))
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        Ok(Some(TxReceipt {
            tx_hash,
            block_number: 1_000 + tx_hash.to_low_u64_be(),
            succeeded: true,
        }))
    }
}
