//! Pool state snapshots and their resolution from a data source.
//!
//! A [`PoolState`] is never mutated after construction. Refreshing a pool
//! produces a brand new snapshot, so anything holding an `Arc<PoolState>`
//! keeps reading consistent reserves while a newer one is published.

use crate::amm::AmmKeys;
use crate::consts::MAX_DECIMALS;
use crate::error::{Result, SwapError};
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::cmp::Reverse;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Pool data as read from chain, in the program's own coin/pc orientation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawPoolData {
    pub address: Pubkey,
    pub coin_mint: Pubkey,
    pub pc_mint: Pubkey,
    pub coin_reserve: u64,
    pub pc_reserve: u64,
    pub coin_decimals: u8,
    pub pc_decimals: u8,
    pub fee_numerator: u64,
    pub fee_denominator: u64,
    pub keys: AmmKeys,
}

/// Source of raw pool data, typically Solana RPC plus the Raydium API.
#[async_trait]
pub trait PoolDataSource: Send + Sync {
    /// `Ok(None)` when no pool lives at `address`.
    async fn fetch_pool_by_address(&self, address: &Pubkey) -> Result<Option<RawPoolData>>;

    /// Every pool that trades `mint`, in no particular order.
    async fn fetch_pools_by_mint(&self, mint: &Pubkey) -> Result<Vec<RawPoolData>>;
}

/// What the caller named when asking for a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolId {
    Pair(Pubkey),
    Mint(Pubkey),
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolId::Pair(pair) => write!(f, "pair {pair}"),
            PoolId::Mint(mint) => write!(f, "mint {mint}"),
        }
    }
}

/// One AMM pool at a point in time.
///
/// `base` is always the traded token and `quote` the reference asset
/// (wrapped SOL unless configured otherwise), whatever the on-chain vault
/// order is.
#[derive(Clone, Debug)]
pub struct PoolState {
    pair: Pubkey,
    base_mint: Pubkey,
    quote_mint: Pubkey,
    base_reserve: u64,
    quote_reserve: u64,
    base_decimals: u8,
    quote_decimals: u8,
    fee_numerator: u64,
    fee_denominator: u64,
    keys: AmmKeys,
    refreshed_at: Instant,
}

impl PoolState {
    /// Builds a snapshot from raw data, orienting it against `reference_mint`.
    ///
    /// # Errors
    /// - [`SwapError::NotFound`] if neither side of the pool is `reference_mint`.
    /// - [`SwapError::Transport`] if the fee or decimals are out of range.
    pub fn from_raw(raw: &RawPoolData, reference_mint: &Pubkey) -> Result<Self> {
        if raw.fee_denominator == 0 || raw.fee_numerator >= raw.fee_denominator {
            return Err(SwapError::Transport(format!(
                "pool {} has malformed fee {}/{}",
                raw.address, raw.fee_numerator, raw.fee_denominator
            )));
        }
        if raw.coin_decimals > MAX_DECIMALS || raw.pc_decimals > MAX_DECIMALS {
            return Err(SwapError::Transport(format!(
                "pool {} has malformed decimals {}/{}",
                raw.address, raw.coin_decimals, raw.pc_decimals
            )));
        }

        let (base_mint, quote_mint, base_reserve, quote_reserve, base_decimals, quote_decimals) =
            if raw.pc_mint == *reference_mint {
                (
                    raw.coin_mint,
                    raw.pc_mint,
                    raw.coin_reserve,
                    raw.pc_reserve,
                    raw.coin_decimals,
                    raw.pc_decimals,
                )
            } else if raw.coin_mint == *reference_mint {
                (
                    raw.pc_mint,
                    raw.coin_mint,
                    raw.pc_reserve,
                    raw.coin_reserve,
                    raw.pc_decimals,
                    raw.coin_decimals,
                )
            } else {
                return Err(SwapError::NotFound(format!(
                    "pool {} does not trade against {}",
                    raw.address, reference_mint
                )));
            };

        Ok(Self {
            pair: raw.address,
            base_mint,
            quote_mint,
            base_reserve,
            quote_reserve,
            base_decimals,
            quote_decimals,
            fee_numerator: raw.fee_numerator,
            fee_denominator: raw.fee_denominator,
            keys: raw.keys,
            refreshed_at: Instant::now(),
        })
    }

    pub fn pair(&self) -> &Pubkey {
        &self.pair
    }

    pub fn base_mint(&self) -> &Pubkey {
        &self.base_mint
    }

    pub fn quote_mint(&self) -> &Pubkey {
        &self.quote_mint
    }

    pub fn base_reserve(&self) -> u64 {
        self.base_reserve
    }

    pub fn quote_reserve(&self) -> u64 {
        self.quote_reserve
    }

    pub fn base_decimals(&self) -> u8 {
        self.base_decimals
    }

    pub fn quote_decimals(&self) -> u8 {
        self.quote_decimals
    }

    /// Fee as `(numerator, denominator)`.
    pub fn fee(&self) -> (u64, u64) {
        (self.fee_numerator, self.fee_denominator)
    }

    pub fn keys(&self) -> &AmmKeys {
        &self.keys
    }

    /// When the data behind this snapshot was requested.
    pub fn refreshed_at(&self) -> Instant {
        self.refreshed_at
    }

    fn requested_at(mut self, at: Instant) -> Self {
        self.refreshed_at = at;
        self
    }

    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.refreshed_at.elapsed() >= threshold
    }

    /// Combined reserve value in the reference asset. The base side is worth
    /// the same as the quote side at the pool's own price.
    pub fn reference_value(&self) -> u128 {
        2 * self.quote_reserve as u128
    }
}

/// Resolves a pair address or token mint to a pool snapshot.
///
/// A mint can trade in several pools. Candidates not paired with
/// `reference_mint` are dropped; the one with the highest
/// [`PoolState::reference_value`] wins and exact ties go to the lowest pair
/// address.
pub async fn resolve(
    source: &dyn PoolDataSource,
    id: &PoolId,
    reference_mint: &Pubkey,
) -> Result<PoolState> {
    let requested = Instant::now();
    match id {
        PoolId::Pair(pair) => {
            let raw = source
                .fetch_pool_by_address(pair)
                .await?
                .ok_or_else(|| SwapError::NotFound(id.to_string()))?;
            Ok(PoolState::from_raw(&raw, reference_mint)?.requested_at(requested))
        }
        PoolId::Mint(mint) => {
            let candidates = source.fetch_pools_by_mint(mint).await?;
            debug!("{} candidate pools for mint {}", candidates.len(), mint);
            let pools = candidates.iter().filter_map(|raw| {
                match PoolState::from_raw(raw, reference_mint) {
                    Ok(pool) if pool.base_mint == *mint => Some(pool),
                    Ok(_) => None,
                    Err(SwapError::NotFound(_)) => None,
                    Err(e) => {
                        warn!("Skipping pool {}: {}", raw.address, e);
                        None
                    }
                }
            });
            pools
                .max_by_key(|pool| (pool.reference_value(), Reverse(pool.pair.to_bytes())))
                .map(|pool| pool.requested_at(requested))
                .ok_or_else(|| SwapError::NotFound(id.to_string()))
        }
    }
}

/// Fetches a fresh snapshot of the same pool.
pub async fn refresh(source: &dyn PoolDataSource, pool: &PoolState) -> Result<PoolState> {
    let requested = Instant::now();
    let raw = source
        .fetch_pool_by_address(&pool.pair)
        .await?
        .ok_or_else(|| SwapError::NotFound(PoolId::Pair(pool.pair).to_string()))?;
    Ok(PoolState::from_raw(&raw, &pool.quote_mint)?.requested_at(requested))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::amm::tests::sample_keys;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) fn raw_pool(
        address: Pubkey,
        token: Pubkey,
        reference: Pubkey,
        token_reserve: u64,
        reference_reserve: u64,
    ) -> RawPoolData {
        RawPoolData {
            address,
            coin_mint: token,
            pc_mint: reference,
            coin_reserve: token_reserve,
            pc_reserve: reference_reserve,
            coin_decimals: 6,
            pc_decimals: 9,
            fee_numerator: 25,
            fee_denominator: 10_000,
            keys: sample_keys(),
        }
    }

    #[derive(Default)]
    struct MapSource {
        pools: Mutex<HashMap<Pubkey, RawPoolData>>,
    }

    impl MapSource {
        fn with(pools: Vec<RawPoolData>) -> Self {
            let source = Self::default();
            {
                let mut map = source.pools.lock().unwrap();
                for raw in pools {
                    map.insert(raw.address, raw);
                }
            }
            source
        }
    }

    #[async_trait]
    impl PoolDataSource for MapSource {
        async fn fetch_pool_by_address(&self, address: &Pubkey) -> Result<Option<RawPoolData>> {
            Ok(self.pools.lock().unwrap().get(address).cloned())
        }

        async fn fetch_pools_by_mint(&self, mint: &Pubkey) -> Result<Vec<RawPoolData>> {
            Ok(self
                .pools
                .lock()
                .unwrap()
                .values()
                .filter(|p| p.coin_mint == *mint || p.pc_mint == *mint)
                .cloned()
                .collect())
        }
    }

    #[test]
    fn orients_sol_first_pools() {
        let token = Pubkey::new_unique();
        let sol = Pubkey::new_unique();
        let mut raw = raw_pool(Pubkey::new_unique(), token, sol, 10, 20);
        raw.coin_mint = sol;
        raw.pc_mint = token;
        raw.coin_decimals = 9;
        raw.pc_decimals = 6;

        let pool = PoolState::from_raw(&raw, &sol).unwrap();
        assert_eq!(pool.base_mint(), &token);
        assert_eq!(pool.quote_mint(), &sol);
        assert_eq!(pool.base_reserve(), 20);
        assert_eq!(pool.quote_reserve(), 10);
        assert_eq!(pool.base_decimals(), 6);
        assert_eq!(pool.quote_decimals(), 9);
    }

    #[test]
    fn rejects_malformed_fee_and_decimals() {
        let sol = Pubkey::new_unique();
        let mut raw = raw_pool(Pubkey::new_unique(), Pubkey::new_unique(), sol, 1, 1);
        raw.fee_numerator = raw.fee_denominator;
        assert!(matches!(
            PoolState::from_raw(&raw, &sol),
            Err(SwapError::Transport(_))
        ));

        let mut raw = raw_pool(Pubkey::new_unique(), Pubkey::new_unique(), sol, 1, 1);
        raw.coin_decimals = 19;
        assert!(matches!(
            PoolState::from_raw(&raw, &sol),
            Err(SwapError::Transport(_))
        ));
    }

    #[test]
    fn unrelated_pool_is_not_found() {
        let raw = raw_pool(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            1,
            1,
        );
        assert!(matches!(
            PoolState::from_raw(&raw, &Pubkey::new_unique()),
            Err(SwapError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn unknown_pair_is_not_found() {
        let source = MapSource::default();
        let err = resolve(
            &source,
            &PoolId::Pair(Pubkey::new_unique()),
            &Pubkey::new_unique(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SwapError::NotFound(_)));
    }

    #[tokio::test]
    async fn mint_resolves_to_deepest_pool() {
        let token = Pubkey::new_unique();
        let sol = Pubkey::new_unique();
        let shallow = raw_pool(Pubkey::new_unique(), token, sol, 1_000, 5_000);
        let deep = raw_pool(Pubkey::new_unique(), token, sol, 10, 9_000);
        let other_quote = raw_pool(
            Pubkey::new_unique(),
            token,
            Pubkey::new_unique(),
            1,
            u64::MAX,
        );
        let source = MapSource::with(vec![shallow, deep.clone(), other_quote]);

        let pool = resolve(&source, &PoolId::Mint(token), &sol).await.unwrap();
        assert_eq!(pool.pair(), &deep.address);
    }

    #[tokio::test]
    async fn mint_tie_goes_to_lowest_address() {
        let token = Pubkey::new_unique();
        let sol = Pubkey::new_unique();
        let low = Pubkey::new_from_array([1; 32]);
        let high = Pubkey::new_from_array([2; 32]);
        let source = MapSource::with(vec![
            raw_pool(high, token, sol, 100, 500),
            raw_pool(low, token, sol, 300, 500),
        ]);

        for _ in 0..4 {
            let pool = resolve(&source, &PoolId::Mint(token), &sol).await.unwrap();
            assert_eq!(pool.pair(), &low);
        }
    }

    #[tokio::test]
    async fn mint_without_reference_pool_is_not_found() {
        let token = Pubkey::new_unique();
        let source = MapSource::with(vec![raw_pool(
            Pubkey::new_unique(),
            token,
            Pubkey::new_unique(),
            1,
            1,
        )]);
        let err = resolve(&source, &PoolId::Mint(token), &Pubkey::new_unique())
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::NotFound(_)));
    }

    #[tokio::test]
    async fn refresh_replaces_the_snapshot() {
        let token = Pubkey::new_unique();
        let sol = Pubkey::new_unique();
        let pair = Pubkey::new_unique();
        let source = MapSource::with(vec![raw_pool(pair, token, sol, 100, 200)]);
        let first = resolve(&source, &PoolId::Pair(pair), &sol).await.unwrap();

        source
            .pools
            .lock()
            .unwrap()
            .insert(pair, raw_pool(pair, token, sol, 150, 180));
        let second = refresh(&source, &first).await.unwrap();

        assert_eq!(first.base_reserve(), 100);
        assert_eq!(second.base_reserve(), 150);
        assert_eq!(second.quote_reserve(), 180);
        assert!(second.refreshed_at() >= first.refreshed_at());
    }

    #[tokio::test]
    async fn snapshot_is_stamped_before_the_fetch() {
        let sol = Pubkey::new_unique();
        let pair = Pubkey::new_unique();
        let source = MapSource::with(vec![raw_pool(pair, Pubkey::new_unique(), sol, 1, 1)]);
        let before = Instant::now();
        let pool = resolve(&source, &PoolId::Pair(pair), &sol).await.unwrap();
        let after = Instant::now();
        assert!(pool.refreshed_at() >= before);
        assert!(pool.refreshed_at() <= after);
    }

    #[test]
    fn zero_threshold_is_always_stale() {
        let sol = Pubkey::new_unique();
        let raw = raw_pool(Pubkey::new_unique(), Pubkey::new_unique(), sol, 1, 1);
        let pool = PoolState::from_raw(&raw, &sol).unwrap();
        assert!(pool.is_stale(Duration::ZERO));
        assert!(!pool.is_stale(Duration::from_secs(3600)));
    }
}
