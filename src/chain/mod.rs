//! On-chain access: balances, fee data, transaction submission and receipts.
//!
//! The `Ledger` trait is the boundary to the signer/broadcaster; `evm`
//! provides the JSON-RPC implementation used in production.

pub mod evm;

use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, TxHash, U256};

use crate::types::{TxDescriptor, TxReceipt};

/// Signer, broadcaster and balance source for one wallet on one chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Address of the signing wallet.
    fn wallet(&self) -> Address;

    /// Native balance of `owner`, in wei.
    async fn native_balance(&self, owner: Address) -> Result<U256>;

    /// Raw ERC-20 balance of `owner`.
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256>;

    /// ERC-20 decimal precision.
    async fn token_decimals(&self, token: Address) -> Result<u8>;

    /// Current gas price suggested by the node.
    async fn gas_price(&self) -> Result<U256>;

    /// Sign and broadcast a transaction. Returns its hash.
    async fn submit(&self, tx: &TxDescriptor) -> Result<TxHash>;

    /// Receipt for `tx_hash`, or `None` while it is still pending.
    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>>;
}
