//! A client for slippage-bounded swaps against Raydium AMM V4 pools on Solana.
//!
//! This crate provides:
//! - Pool snapshots resolved by pair address or token mint ([`pool`]).
//! - Constant-product quotes with fee, price impact and slippage ([`quote`]).
//! - Swap requests lowered into AMM V4 instructions ([`builder`]).
//! - A facade tying them together behind `buy`, `buy_by_token`, `sell` and
//!   `sell_by_token` ([`SwapClient`]).
//!
//! # Examples
//!
//! ```no_run
//! use raydium_v4_swap::{ClientConfig, SwapClient};
//! use raydium_v4_swap::raydium::RaydiumPoolSource;
//! use raydium_v4_swap::rpc::{KeypairSigner, RpcBalanceSource, RpcBroadcaster};
//! use rust_decimal::Decimal;
//! use solana_client::nonblocking::rpc_client::RpcClient;
//! use std::sync::Arc;
//! # async fn run() -> anyhow::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let rpc = Arc::new(RpcClient::new(config.rpc_url.clone()));
//! let quote_mint = config.quote_mint()?;
//! let client = SwapClient::new(
//!     Arc::new(RaydiumPoolSource::new(rpc.clone(), &config.raydium_api_url, quote_mint)),
//!     Arc::new(KeypairSigner::new(config.keypair()?, rpc.clone(), config.compute_budget)),
//!     Arc::new(RpcBroadcaster::new(rpc.clone())),
//!     Arc::new(RpcBalanceSource::new(rpc)),
//!     quote_mint,
//! );
//! let pair = "58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2".parse()?;
//! let result = client.buy(pair, Decimal::new(1, 2), Decimal::from(5)).await?;
//! println!("Bought at least {} tokens: {}", result.quote.min_amount_out, result.signature);
//! # Ok(())
//! # }
//! ```
pub mod amm;
pub mod builder;
pub mod client;
pub mod config;
pub mod consts;
pub mod error;
pub mod helpers;
pub mod interface;
pub mod pool;
pub mod quote;
pub mod raydium;
pub mod rpc;
pub mod util;

pub use builder::{ComputeBudget, SwapRequest, build};
pub use client::{
    BalanceSource, Broadcaster, SignedSwap, SwapClient, SwapOrder, SwapResult, SwapSigner,
};
pub use config::ClientConfig;
pub use error::{Stage, StageError, SwapError};
pub use pool::{PoolDataSource, PoolId, PoolState, RawPoolData};
pub use quote::{AmountSpec, Quote, SwapDirection, SwapIntent, compute_quote};
