//! OKX DEX aggregator integration.
//!
//! Provides token prices, swap quotes and prepared swap transactions.
//!
//! Base URL: https://web3.okx.com/api/v5/dex
//! Every response is wrapped in `{ "code": "0", "msg": "", "data": ... }`;
//! any other code is an application-level failure even on HTTP 200.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use ethers::types::{Address, Bytes};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use super::{PriceOracle, RouteParams, SwapRouter};
use crate::types::{SwapError, SwapQuote, SwapTransaction};
use crate::units::{parse_decimal, parse_u256};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_BASE_URL: &str = "https://web3.okx.com/api/v5/dex";

const SUCCESS_CODE: &str = "0";

/// Route sorting directive for the swap-build call (1 = best price).
const SORT_BEST_PRICE: u8 = 1;

// ---------------------------------------------------------------------------
// API response types (OKX JSON -> Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    /// Usually a string ("0"), occasionally a bare number.
    #[serde(default)]
    code: Value,
    #[serde(default)]
    msg: String,
    /// Absent `data` decodes as `None`.
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn code(&self) -> String {
        match &self.code {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Unwrap the payload, mapping a non-zero code to `SwapError::Api`.
    fn into_data(self) -> Result<Option<T>> {
        let code = self.code();
        if code != SUCCESS_CODE {
            return Err(SwapError::Api {
                code,
                message: self.msg,
            }
            .into());
        }
        Ok(self.data)
    }
}

/// Transaction fields, found either at the top level of a swap entry
/// or nested under `tx`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTx {
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    data: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default, alias = "gas")]
    gas_limit: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SwapEntry {
    #[serde(default)]
    tx: Option<RawTx>,
    #[serde(flatten)]
    top: RawTx,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapBody {
    chain_id: String,
    from_token_address: String,
    to_token_address: String,
    amount: String,
    slippage: String,
    user_wallet_address: String,
    sort: u8,
    fee_percent: u8,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// OKX DEX aggregator client.
pub struct OkxDexClient {
    http: Client,
    base_url: String,
}

impl OkxDexClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("AUTOSWAP/0.1.0")
            .build()
            .context("Failed to build HTTP client for OKX DEX")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Option<T>> {
        let url = self.url(endpoint);
        debug!(url = %url, "OKX GET");

        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("OKX request failed: {endpoint}"))?;

        Self::decode(endpoint, resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, endpoint: &str, body: &B) -> Result<Option<T>> {
        let url = self.url(endpoint);
        debug!(url = %url, "OKX POST");

        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("OKX request failed: {endpoint}"))?;

        Self::decode(endpoint, resp).await
    }

    async fn decode<T: DeserializeOwned>(endpoint: &str, resp: reqwest::Response) -> Result<Option<T>> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OKX API error {status} on {endpoint}: {body}");
        }

        let envelope: Envelope<T> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse OKX {endpoint} response"))?;

        envelope.into_data()
    }

    fn route_query(params: &RouteParams) -> Vec<(&'static str, String)> {
        vec![
            ("chainId", params.chain_id.to_string()),
            ("fromTokenAddress", format!("{:#x}", params.from_asset)),
            ("toTokenAddress", format!("{:#x}", params.to_asset)),
            ("amount", params.amount.to_string()),
            ("slippage", params.slippage_pct.to_string()),
            ("userWalletAddress", format!("{:#x}", params.user_wallet)),
        ]
    }

    /// Pull `price` out of a token payload (object, or array of objects).
    fn extract_price(data: &Value) -> Result<Decimal> {
        let entry = match data {
            Value::Array(items) => items.first().ok_or(SwapError::Api {
                code: SUCCESS_CODE.into(),
                message: "empty token data".into(),
            })?,
            other => other,
        };
        match entry.get("price") {
            Some(Value::String(s)) => parse_decimal(s),
            Some(Value::Number(n)) => parse_decimal(&n.to_string()),
            _ => anyhow::bail!("OKX token data has no price field"),
        }
    }

    fn value_text(value: &Option<Value>) -> Option<String> {
        match value {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    fn parse_swap_entry(entry: SwapEntry) -> Result<SwapTransaction> {
        let nested = entry.tx.unwrap_or_default();
        let top = entry.top;

        let to = nested
            .to
            .or(top.to)
            .context("OKX swap data has no `to` address")?;
        let data = nested
            .data
            .or(top.data)
            .context("OKX swap data has no calldata")?;
        let value = Self::value_text(&nested.value).or_else(|| Self::value_text(&top.value));
        let gas_limit =
            Self::value_text(&nested.gas_limit).or_else(|| Self::value_text(&top.gas_limit));

        Ok(SwapTransaction {
            to: Address::from_str(&to).with_context(|| format!("Invalid `to` address: {to}"))?,
            data: Bytes::from_str(&data).context("Invalid swap calldata")?,
            value: value.as_deref().map(parse_u256).transpose()?,
            gas_limit: gas_limit.as_deref().map(parse_u256).transpose()?,
        })
    }
}

#[async_trait]
impl PriceOracle for OkxDexClient {
    async fn token_price(&self, chain_id: u64, token: Address) -> Result<Decimal> {
        let query = [
            ("chainId", chain_id.to_string()),
            ("tokenContractAddress", format!("{token:#x}")),
        ];
        let data: Value = self
            .get("aggregator/tokens", &query)
            .await?
            .ok_or(SwapError::Api {
                code: SUCCESS_CODE.into(),
                message: "missing token data".into(),
            })?;
        Self::extract_price(&data)
    }
}

#[async_trait]
impl SwapRouter for OkxDexClient {
    async fn quote(&self, params: &RouteParams) -> Result<SwapQuote> {
        let routes: Vec<Value> = self
            .get("aggregator/quote", &Self::route_query(params))
            .await?
            .unwrap_or_default();
        let route = routes.into_iter().next().ok_or(SwapError::NoRoute)?;

        let amount_out = route
            .get("toTokenAmount")
            .and_then(Value::as_str)
            .map(parse_u256)
            .transpose()?;

        Ok(SwapQuote {
            from_asset: params.from_asset,
            to_asset: params.to_asset,
            amount_in: params.amount,
            amount_out,
            route,
            quoted_at: Utc::now(),
        })
    }

    async fn build_swap(&self, params: &RouteParams) -> Result<SwapTransaction> {
        let body = SwapBody {
            chain_id: params.chain_id.to_string(),
            from_token_address: format!("{:#x}", params.from_asset),
            to_token_address: format!("{:#x}", params.to_asset),
            amount: params.amount.to_string(),
            slippage: params.slippage_pct.to_string(),
            user_wallet_address: format!("{:#x}", params.user_wallet),
            sort: SORT_BEST_PRICE,
            fee_percent: 0,
        };
        let entries: Vec<SwapEntry> = self
            .post("aggregator/swap", &body)
            .await?
            .unwrap_or_default();
        let entry = entries.into_iter().next().ok_or(SwapError::NoRoute)?;
        Self::parse_swap_entry(entry)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
