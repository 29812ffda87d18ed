//! Runtime configuration read from the environment.

use crate::builder::ComputeBudget;
use crate::consts::{
    DEFAULT_STALENESS, DEFAULT_UNIT_BUDGET, DEFAULT_UNIT_PRICE, RAYDIUM_API_URL, SOL_MINT,
};
use crate::helpers::parse_keypair;
use anyhow::{Context, anyhow};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const HELIUS_RPC_URL: &str = "https://mainnet.helius-rpc.com/?api-key=";

#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    pub rpc_url: String,
    /// Secret key, as a byte array or base58.
    pub keypair: String,
    #[serde(default = "default_api_url")]
    pub raydium_api_url: String,
    #[serde(default = "default_staleness_ms")]
    pub pool_staleness_ms: u64,
    #[serde(default)]
    pub compute_budget: ComputeBudget,
    #[serde(default = "default_quote_mint")]
    pub quote_mint: String,
}

fn default_api_url() -> String {
    RAYDIUM_API_URL.to_string()
}

fn default_staleness_ms() -> u64 {
    DEFAULT_STALENESS.as_millis() as u64
}

fn default_quote_mint() -> String {
    SOL_MINT.to_string()
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("rpc_url", &self.rpc_url)
            .field("keypair", &"<redacted>")
            .field("raydium_api_url", &self.raydium_api_url)
            .field("pool_staleness_ms", &self.pool_staleness_ms)
            .field("compute_budget", &self.compute_budget)
            .field("quote_mint", &self.quote_mint)
            .finish()
    }
}

impl ClientConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup.
    ///
    /// `RPC_URL` wins over `HELIUS_API_KEY`; `KEYPAIR` wins over
    /// `ACC_PRIVATE_KEY`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let rpc_url = match (lookup("RPC_URL"), lookup("HELIUS_API_KEY")) {
            (Some(url), _) => url,
            (None, Some(key)) => format!("{HELIUS_RPC_URL}{key}"),
            (None, None) => return Err(anyhow!("Set RPC_URL or HELIUS_API_KEY")),
        };
        let keypair = lookup("KEYPAIR")
            .or_else(|| lookup("ACC_PRIVATE_KEY"))
            .ok_or_else(|| anyhow!("KEYPAIR env is not presented"))?;

        Ok(Self {
            rpc_url,
            keypair,
            raydium_api_url: lookup("RAYDIUM_API_URL").unwrap_or_else(default_api_url),
            pool_staleness_ms: parse_or(&lookup, "POOL_STALENESS_MS", default_staleness_ms())?,
            compute_budget: ComputeBudget {
                unit_limit: parse_or(&lookup, "UNIT_BUDGET", DEFAULT_UNIT_BUDGET)?,
                unit_price: parse_or(&lookup, "UNIT_PRICE", DEFAULT_UNIT_PRICE)?,
            },
            quote_mint: lookup("QUOTE_MINT").unwrap_or_else(default_quote_mint),
        })
    }

    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.pool_staleness_ms)
    }

    pub fn quote_mint(&self) -> anyhow::Result<Pubkey> {
        Pubkey::from_str(&self.quote_mint).context("Invalid QUOTE_MINT")
    }

    pub fn keypair(&self) -> anyhow::Result<Keypair> {
        parse_keypair(&self.keypair)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: {value:?}")),
        None => Ok(default),
    }
}
