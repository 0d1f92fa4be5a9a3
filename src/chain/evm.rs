//! JSON-RPC ledger for EVM chains.
//!
//! Reads go through a plain HTTP provider; writes go through a
//! `SignerMiddleware` wrapping a local wallet bound to the chain id,
//! which fills in the nonce before signing.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, TransactionRequest, TxHash, U256},
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::{debug, info};

use super::Ledger;
use crate::types::{TxDescriptor, TxReceipt};

abigen!(
    Erc20,
    r"[
        function balanceOf(address owner) view returns (uint256)
        function decimals() view returns (uint8)
    ]",
);

/// Ledger backed by an HTTP JSON-RPC endpoint and a local private key.
pub struct EvmLedger {
    provider: Arc<Provider<Http>>,
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    wallet: Address,
}

impl EvmLedger {
    /// Connect to `rpc_url` and load the signing key.
    ///
    /// The private key may be given with or without a `0x` prefix.
    pub fn connect(rpc_url: &str, private_key: &SecretString, chain_id: u64) -> Result<Self> {
        let provider = Arc::new(
            Provider::<Http>::try_from(rpc_url)
                .with_context(|| format!("Invalid RPC URL: {rpc_url}"))?,
        );

        let key = private_key.expose_secret().trim();
        let signer = key
            .strip_prefix("0x")
            .unwrap_or(key)
            .parse::<LocalWallet>()
            .context("Failed to parse signer private key")?
            .with_chain_id(chain_id);
        let wallet = signer.address();

        info!(wallet = %format!("{wallet:#x}"), chain_id, "Signer loaded");

        let client = SignerMiddleware::new((*provider).clone(), signer);
        Ok(Self {
            provider,
            client,
            wallet,
        })
    }
}

#[async_trait]
impl Ledger for EvmLedger {
    fn wallet(&self) -> Address {
        self.wallet
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        self.provider
            .get_balance(owner, None)
            .await
            .context("eth_getBalance failed")
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let contract = Erc20::new(token, self.provider.clone());
        contract
            .balance_of(owner)
            .call()
            .await
            .with_context(|| format!("balanceOf failed for token {token:#x}"))
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        let contract = Erc20::new(token, self.provider.clone());
        contract
            .decimals()
            .call()
            .await
            .with_context(|| format!("decimals failed for token {token:#x}"))
    }

    async fn gas_price(&self) -> Result<U256> {
        self.provider
            .get_gas_price()
            .await
            .context("eth_gasPrice failed")
    }

    async fn submit(&self, tx: &TxDescriptor) -> Result<TxHash> {
        let request = TransactionRequest::new()
            .from(self.wallet)
            .to(tx.to)
            .data(tx.data.clone())
            .value(tx.value)
            .gas(tx.gas_limit)
            .gas_price(tx.gas_price);

        debug!(to = %format!("{:#x}", tx.to), value = %tx.value, gas = %tx.gas_limit, "Submitting transaction");

        let pending = self
            .client
            .send_transaction(request, None)
            .await
            .context("Failed to sign and broadcast transaction")?;
        Ok(pending.tx_hash())
    }

    async fn receipt(&self, tx_hash: TxHash) -> Result<Option<TxReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .context("eth_getTransactionReceipt failed")?;

        // A receipt without a block number is not yet included.
        Ok(receipt.and_then(|r| {
            r.block_number.map(|block| TxReceipt {
                tx_hash,
                block_number: block.as_u64(),
                succeeded: r.status.map_or(true, |s| s.as_u64() == 1),
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    // Well-known Hardhat/Anvil development key #0.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_connect_derives_wallet_address() {
        let key: SecretString = Secret::new(DEV_KEY.to_string());
        let ledger = EvmLedger::connect("http://127.0.0.1:8545", &key, 42161).unwrap();
        let expected: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        assert_eq!(ledger.wallet(), expected);
    }

    #[test]
    fn test_connect_accepts_unprefixed_key() {
        let key: SecretString = Secret::new(DEV_KEY.trim_start_matches("0x").to_string());
        assert!(EvmLedger::connect("http://127.0.0.1:8545", &key, 1).is_ok());
    }

    #[test]
    fn test_connect_rejects_bad_key() {
        let key: SecretString = Secret::new("not-a-key".to_string());
        assert!(EvmLedger::connect("http://127.0.0.1:8545", &key, 1).is_err());
    }

    #[test]
    fn test_connect_rejects_bad_url() {
        let key: SecretString = Secret::new(DEV_KEY.to_string());
        assert!(EvmLedger::connect("not a url", &key, 1).is_err());
    }
}
