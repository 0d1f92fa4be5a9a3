//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` (if present) into strongly-typed structs with
//! built-in defaults, then applies the deployment's environment variables
//! on top. The signer key is referenced by env-var name in the config and
//! resolved at runtime into a `SecretString`.

use anyhow::{Context, Result};
use ethers::types::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::{Secret, SecretString};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::aggregator::okx::DEFAULT_BASE_URL;
use crate::engine::executor::ExecutorSettings;
use crate::engine::fees::{FixedFees, DEFAULT_FALLBACK_GAS_LIMIT};
use crate::engine::swap_engine::EngineSettings;
use crate::storage::DEFAULT_ACTIVITY_FILE;
use crate::strategy::ThresholdRule;
use crate::types::SwapError;
use crate::units::{parse_decimal, to_smallest_unit};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub token: TokenConfig,
    pub api: ApiConfig,
    pub conditions: ConditionsConfig,
    pub swap: SwapConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Name of the env var holding the signer's private key.
    pub private_key_env: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://arb1.arbitrum.io/rpc".into(),
            chain_id: 42161,
            private_key_env: "PRIVATE_KEY".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TokenConfig {
    pub address: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            address: "0x077574441c4f8763a37a2cfee2ecb444aa60a15e".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConditionsConfig {
    pub buy_price_below: Option<Decimal>,
    pub sell_price_above: Option<Decimal>,
    /// Reserved. Accepted but never evaluated.
    pub price_increase_pct: Option<Decimal>,
    /// Reserved. Accepted but never evaluated.
    pub price_decrease_pct: Option<Decimal>,
}

impl Default for ConditionsConfig {
    fn default() -> Self {
        Self {
            buy_price_below: Some(dec!(0.001)),
            sell_price_above: Some(dec!(0.01)),
            price_increase_pct: None,
            price_decrease_pct: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeeStrategyKind {
    #[default]
    Fixed,
    Node,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SwapConfig {
    /// Native amount spent per buy, in whole units.
    pub amount_native: Decimal,
    pub sell_percentage: u8,
    pub slippage_pct: Decimal,
    pub fee_strategy: FeeStrategyKind,
    pub gas_price_gwei: Decimal,
    pub fallback_gas_limit: u64,
    pub confirmation_timeout_secs: u64,
    pub confirmation_poll_ms: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            amount_native: dec!(0.01),
            sell_percentage: 100,
            slippage_pct: dec!(0.5),
            fee_strategy: FeeStrategyKind::Fixed,
            gas_price_gwei: dec!(1),
            fallback_gas_limit: DEFAULT_FALLBACK_GAS_LIMIT,
            confirmation_timeout_secs: 300,
            confirmation_poll_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MonitorConfig {
    pub check_interval_secs: u64,
    pub recovery_delay_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            recovery_delay_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Activity log file. Empty disables the file sink.
    pub activity_file: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            activity_file: DEFAULT_ACTIVITY_FILE.into(),
            json: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load from `path` (defaults if the file is absent), apply environment
    /// overrides, validate.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path}"))?;
            Self::from_toml_str(&contents)
                .with_context(|| format!("Failed to parse config file: {path}"))?
        } else {
            info!(path, "No config file found, using defaults");
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply overrides from `lookup` (the process environment in production).
    /// A set but unparseable value is an error.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("RPC_URL") {
            self.network.rpc_url = v;
        }
        if let Some(v) = get("CHAIN_ID") {
            self.network.chain_id = parse_override("CHAIN_ID", &v)?;
        }
        if let Some(v) = get("TOKEN_ADDRESS") {
            self.token.address = v;
        }
        if let Some(v) = get("BUY_PRICE_BELOW") {
            self.conditions.buy_price_below = Some(decimal_override("BUY_PRICE_BELOW", &v)?);
        }
        if let Some(v) = get("SELL_PRICE_ABOVE") {
            self.conditions.sell_price_above = Some(decimal_override("SELL_PRICE_ABOVE", &v)?);
        }
        if let Some(v) = get("SWAP_AMOUNT_ETH") {
            self.swap.amount_native = decimal_override("SWAP_AMOUNT_ETH", &v)?;
        }
        if let Some(v) = get("SELL_PERCENTAGE") {
            self.swap.sell_percentage = parse_override("SELL_PERCENTAGE", &v)?;
        }
        if let Some(v) = get("SLIPPAGE") {
            self.swap.slippage_pct = decimal_override("SLIPPAGE", &v)?;
        }
        if let Some(v) = get("CHECK_INTERVAL") {
            self.monitor.check_interval_secs = parse_override("CHECK_INTERVAL", &v)?;
        }
        if let Some(v) = get("CONFIRMATION_TIMEOUT") {
            self.swap.confirmation_timeout_secs = parse_override("CONFIRMATION_TIMEOUT", &v)?;
        }
        Ok(())
    }

    /// Reject unusable values.
    pub fn validate(&self) -> Result<()> {
        self.token_address()?;
        reqwest::Url::parse(&self.network.rpc_url)
            .map_err(|e| config_error(format!("invalid rpc_url {:?}: {e}", self.network.rpc_url)))?;
        reqwest::Url::parse(&self.api.base_url)
            .map_err(|e| config_error(format!("invalid api.base_url {:?}: {e}", self.api.base_url)))?;

        if !(1..=100).contains(&self.swap.sell_percentage) {
            return Err(config_error(format!(
                "sell_percentage must be within 1..=100, got {}",
                self.swap.sell_percentage
            )));
        }
        if self.swap.slippage_pct <= Decimal::ZERO || self.swap.slippage_pct > dec!(100) {
            return Err(config_error(format!(
                "slippage_pct must be within (0, 100], got {}",
                self.swap.slippage_pct
            )));
        }
        if self.swap.amount_native <= Decimal::ZERO {
            return Err(config_error(format!(
                "amount_native must be positive, got {}",
                self.swap.amount_native
            )));
        }
        if self.swap.gas_price_gwei <= Decimal::ZERO {
            return Err(config_error("gas_price_gwei must be positive".into()));
        }
        if self.monitor.check_interval_secs == 0 {
            return Err(config_error("check_interval_secs must be positive".into()));
        }
        if self.monitor.recovery_delay_secs == 0 {
            return Err(config_error("recovery_delay_secs must be positive".into()));
        }
        if self.swap.confirmation_timeout_secs == 0 {
            return Err(config_error("confirmation_timeout_secs must be positive".into()));
        }
        if self.swap.confirmation_poll_ms == 0 {
            return Err(config_error("confirmation_poll_ms must be positive".into()));
        }

        Ok(())
    }

    /// Log settings that are accepted but probably not what was meant.
    pub fn log_warnings(&self) {
        let rules = self.threshold_rule();
        if rules.is_overlapping() {
            warn!(
                buy_below = ?rules.buy_below,
                sell_above = ?rules.sell_above,
                "buy_price_below >= sell_price_above: buy takes precedence where both match"
            );
        }
        if rules.has_reserved_triggers() {
            warn!("price_increase_pct / price_decrease_pct are not evaluated");
        }
    }

    /// Resolve an environment variable name to its value.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// The signer's private key. Missing or empty is fatal.
    pub fn resolve_private_key(&self) -> Result<SecretString> {
        let name = &self.network.private_key_env;
        let key = Self::resolve_env(name)?;
        if key.trim().is_empty() {
            return Err(config_error(format!("{name} is empty")));
        }
        Ok(Secret::new(key))
    }

    // ----- Derived settings -----

    pub fn token_address(&self) -> Result<Address> {
        self.token
            .address
            .trim()
            .parse::<Address>()
            .map_err(|e| config_error(format!("invalid token address {:?}: {e}", self.token.address)))
    }

    pub fn threshold_rule(&self) -> ThresholdRule {
        ThresholdRule {
            buy_below: self.conditions.buy_price_below,
            sell_above: self.conditions.sell_price_above,
            price_increase_pct: self.conditions.price_increase_pct,
            price_decrease_pct: self.conditions.price_decrease_pct,
        }
    }

    pub fn engine_settings(&self, wallet: Address) -> Result<EngineSettings> {
        Ok(EngineSettings {
            chain_id: self.network.chain_id,
            tracked_token: self.token_address()?,
            wallet,
            buy_amount_native: self.swap.amount_native,
            sell_percentage: self.swap.sell_percentage,
            poll_interval: Duration::from_secs(self.monitor.check_interval_secs),
            recovery_delay: Duration::from_secs(self.monitor.recovery_delay_secs),
        })
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            chain_id: self.network.chain_id,
            slippage_pct: self.swap.slippage_pct,
            confirmation_timeout: Duration::from_secs(self.swap.confirmation_timeout_secs),
            confirmation_poll: Duration::from_millis(self.swap.confirmation_poll_ms),
        }
    }

    pub fn fixed_fees(&self) -> Result<FixedFees> {
        let gas_price = to_smallest_unit(self.swap.gas_price_gwei, 9)
            .context("Invalid gas_price_gwei")?;
        Ok(FixedFees::new(gas_price, self.swap.fallback_gas_limit.into()))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Activity log file, or `None` when disabled.
    pub fn activity_path(&self) -> Option<PathBuf> {
        let path = self.logging.activity_file.trim();
        (!path.is_empty()).then(|| PathBuf::from(path))
    }
}

fn config_error(message: String) -> anyhow::Error {
    SwapError::Config(message).into()
}

fn parse_override<T>(name: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| config_error(format!("{name}={value:?}: {e}")))
}

fn decimal_override(name: &str, value: &str) -> Result<Decimal> {
    parse_decimal(value).map_err(|e| config_error(format!("{name}={value:?}: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
