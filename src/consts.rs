//! Common constants used across the swap client.

use std::time::Duration;

/// The Solana native token mint (wrapped SOL).
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// Program ID for Raydium AMM V4.
pub const AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

/// Raydium HTTP API v3.
pub const RAYDIUM_API_URL: &str = "https://api-v3.raydium.io";

/// Size of an AMM V4 pool account.
pub const AMM_V4_ACCOUNT_LEN: usize = 752;

/// Token amounts never carry more decimals than this.
pub const MAX_DECIMALS: u8 = 18;

/// Roughly one slot; pool reserves move every block.
pub const DEFAULT_STALENESS: Duration = Duration::from_millis(400);

/// Default compute unit limit for a swap transaction.
pub const DEFAULT_UNIT_BUDGET: u32 = 150_000;

/// Default compute unit price, in micro-lamports.
pub const DEFAULT_UNIT_PRICE: u64 = 1_000_000;
