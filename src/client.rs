//! Client facade: resolves a pool, quotes, builds, signs and submits.

use crate::builder::{SwapRequest, build};
use crate::consts::DEFAULT_STALENESS;
use crate::error::{Result, Stage, StageError};
use crate::pool::{PoolDataSource, PoolId, PoolState, refresh, resolve};
use crate::quote::{AmountSpec, Quote, SwapDirection, SwapIntent, compute_quote};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A transaction ready for broadcast.
#[derive(Clone, Debug)]
pub struct SignedSwap {
    pub transaction: Transaction,
    pub signature: Signature,
}

#[async_trait]
pub trait SwapSigner: Send + Sync {
    /// Account that pays for and signs swaps.
    fn payer(&self) -> Pubkey;

    async fn sign(&self, request: &SwapRequest) -> Result<SignedSwap>;
}

#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn submit(&self, signed: &SignedSwap) -> Result<Signature>;
}

#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Held amount of `mint` in smallest units; zero if there is no account.
    async fn get_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Result<u64>;
}

/// The four public ways to trade, all served by one pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapOrder {
    BuyByPair {
        pair: Pubkey,
        sol_in: Decimal,
        slippage: Decimal,
    },
    BuyByMint {
        mint: Pubkey,
        sol_in: Decimal,
        slippage: Decimal,
    },
    SellByPair {
        pair: Pubkey,
        percentage: Decimal,
        slippage: Decimal,
    },
    SellByMint {
        mint: Pubkey,
        percentage: Decimal,
        slippage: Decimal,
    },
}

impl SwapOrder {
    pub fn pool_id(&self) -> PoolId {
        match *self {
            SwapOrder::BuyByPair { pair, .. } | SwapOrder::SellByPair { pair, .. } => {
                PoolId::Pair(pair)
            }
            SwapOrder::BuyByMint { mint, .. } | SwapOrder::SellByMint { mint, .. } => {
                PoolId::Mint(mint)
            }
        }
    }

    pub fn direction(&self) -> SwapDirection {
        match self {
            SwapOrder::BuyByPair { .. } | SwapOrder::BuyByMint { .. } => {
                SwapDirection::BuyBaseWithQuote
            }
            SwapOrder::SellByPair { .. } | SwapOrder::SellByMint { .. } => {
                SwapDirection::SellBaseForQuote
            }
        }
    }

    fn slippage(&self) -> Decimal {
        match *self {
            SwapOrder::BuyByPair { slippage, .. }
            | SwapOrder::BuyByMint { slippage, .. }
            | SwapOrder::SellByPair { slippage, .. }
            | SwapOrder::SellByMint { slippage, .. } => slippage,
        }
    }
}

/// Outcome of a submitted swap.
#[derive(Clone, Debug)]
pub struct SwapResult {
    pub signature: Signature,
    pub quote: Quote,
    pub request: SwapRequest,
}

/// Swap client over pluggable collaborators.
///
/// Holds at most one pool snapshot per pair address. A snapshot older than
/// the staleness threshold is refetched and the new `Arc` replaces the old
/// one in a single insert, so concurrent requests only ever see whole
/// snapshots. A slower fetch never overwrites a snapshot requested after
/// it, and stale snapshots of other pairs are dropped whenever a fetch
/// lands.
pub struct SwapClient {
    source: Arc<dyn PoolDataSource>,
    signer: Arc<dyn SwapSigner>,
    broadcaster: Arc<dyn Broadcaster>,
    balances: Arc<dyn BalanceSource>,
    reference_mint: Pubkey,
    staleness: Duration,
    pools: DashMap<Pubkey, Arc<PoolState>>,
    mints: DashMap<Pubkey, Pubkey>,
}

impl SwapClient {
    pub fn new(
        source: Arc<dyn PoolDataSource>,
        signer: Arc<dyn SwapSigner>,
        broadcaster: Arc<dyn Broadcaster>,
        balances: Arc<dyn BalanceSource>,
        reference_mint: Pubkey,
    ) -> Self {
        Self {
            source,
            signer,
            broadcaster,
            balances,
            reference_mint,
            staleness: DEFAULT_STALENESS,
            pools: DashMap::new(),
            mints: DashMap::new(),
        }
    }

    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = staleness;
        self
    }

    pub fn payer(&self) -> Pubkey {
        self.signer.payer()
    }

    /// Buy the pool's token with `sol_in` of the reference asset.
    pub async fn buy(
        &self,
        pair: Pubkey,
        sol_in: Decimal,
        slippage: Decimal,
    ) -> Result<SwapResult, StageError> {
        self.execute(SwapOrder::BuyByPair {
            pair,
            sol_in,
            slippage,
        })
        .await
    }

    pub async fn buy_by_token(
        &self,
        mint: Pubkey,
        sol_in: Decimal,
        slippage: Decimal,
    ) -> Result<SwapResult, StageError> {
        self.execute(SwapOrder::BuyByMint {
            mint,
            sol_in,
            slippage,
        })
        .await
    }

    /// Sell `percentage` of the held token balance.
    pub async fn sell(
        &self,
        pair: Pubkey,
        percentage: Decimal,
        slippage: Decimal,
    ) -> Result<SwapResult, StageError> {
        self.execute(SwapOrder::SellByPair {
            pair,
            percentage,
            slippage,
        })
        .await
    }

    pub async fn sell_by_token(
        &self,
        mint: Pubkey,
        percentage: Decimal,
        slippage: Decimal,
    ) -> Result<SwapResult, StageError> {
        self.execute(SwapOrder::SellByMint {
            mint,
            percentage,
            slippage,
        })
        .await
    }

    /// Runs the full pipeline for `order`.
    pub async fn execute(&self, order: SwapOrder) -> Result<SwapResult, StageError> {
        info!("Executing {:?}", order);
        let (pool, intent) = self.prepare(&order).await?;
        self.submit_intent(&pool, &intent).await
    }

    /// Quotes `order` without signing or submitting anything.
    pub async fn quote(&self, order: SwapOrder) -> Result<Quote, StageError> {
        let (pool, intent) = self.prepare(&order).await?;
        compute_quote(&pool, &intent).map_err(|e| e.at(Stage::Quote))
    }

    /// Runs the pipeline for an intent the caller has already built, e.g.
    /// with a balance it looked up itself.
    pub async fn execute_intent(
        &self,
        id: PoolId,
        intent: SwapIntent,
    ) -> Result<SwapResult, StageError> {
        let pool = self.pool(&id).await?;
        self.submit_intent(&pool, &intent).await
    }

    async fn prepare(
        &self,
        order: &SwapOrder,
    ) -> Result<(Arc<PoolState>, SwapIntent), StageError> {
        let direction = order.direction();
        let slippage = order.slippage();
        match *order {
            SwapOrder::BuyByPair { sol_in, .. } | SwapOrder::BuyByMint { sol_in, .. } => {
                let intent = SwapIntent::new(direction, AmountSpec::Exact(sol_in), slippage)
                    .map_err(|e| e.at(Stage::Validate))?;
                let pool = self.pool(&order.pool_id()).await?;
                Ok((pool, intent))
            }
            SwapOrder::SellByMint {
                mint, percentage, ..
            } => {
                validate_sell(percentage, slippage)?;
                let balance = self.balance(&mint).await?;
                let intent = sell_intent(percentage, balance, slippage)?;
                let pool = self.pool(&order.pool_id()).await?;
                Ok((pool, intent))
            }
            SwapOrder::SellByPair { percentage, .. } => {
                validate_sell(percentage, slippage)?;
                let pool = self.pool(&order.pool_id()).await?;
                let balance = self.balance(pool.base_mint()).await?;
                let intent = sell_intent(percentage, balance, slippage)?;
                Ok((pool, intent))
            }
        }
    }

    async fn submit_intent(
        &self,
        pool: &PoolState,
        intent: &SwapIntent,
    ) -> Result<SwapResult, StageError> {
        let quote = compute_quote(pool, intent).map_err(|e| e.at(Stage::Quote))?;
        info!(
            "Quoted {} -> {} (min {}) on {}",
            quote.amount_in,
            quote.amount_out,
            quote.min_amount_out,
            pool.pair()
        );
        let request = build(pool, &quote, self.signer.payer()).map_err(|e| e.at(Stage::Build))?;
        let signed = self
            .signer
            .sign(&request)
            .await
            .map_err(|e| e.at(Stage::Sign))?;
        let signature = self
            .broadcaster
            .submit(&signed)
            .await
            .map_err(|e| e.at(Stage::Submit))?;
        info!("Swap {} landed on {}", signature, pool.pair());
        Ok(SwapResult {
            signature,
            quote,
            request,
        })
    }

    async fn balance(&self, mint: &Pubkey) -> Result<u64, StageError> {
        let balance = self
            .balances
            .get_balance(&self.signer.payer(), mint)
            .await
            .map_err(|e| e.at(Stage::Balance))?;
        debug!("Held balance of {}: {}", mint, balance);
        Ok(balance)
    }

    /// Cached snapshot for `id`, refreshed first if stale.
    ///
    /// A stale mint entry is resolved again rather than refreshed, so a pool
    /// that has become deeper since the last lookup can take over.
    pub async fn pool(&self, id: &PoolId) -> Result<Arc<PoolState>, StageError> {
        let pair = match id {
            PoolId::Pair(pair) => Some(*pair),
            PoolId::Mint(mint) => self.mints.get(mint).map(|pair| *pair),
        };
        // The guard is dropped here, before any await.
        let cached = pair.and_then(|pair| self.pools.get(&pair).map(|pool| Arc::clone(&pool)));

        let pool = match (cached, id) {
            (Some(pool), _) if !pool.is_stale(self.staleness) => return Ok(pool),
            (Some(pool), PoolId::Pair(_)) => {
                debug!("Refreshing stale pool {}", pool.pair());
                refresh(self.source.as_ref(), &pool)
                    .await
                    .map_err(|e| e.at(Stage::Refresh))?
            }
            (Some(pool), PoolId::Mint(mint)) => {
                debug!("Re-resolving mint {} (was {})", mint, pool.pair());
                resolve(self.source.as_ref(), id, &self.reference_mint)
                    .await
                    .map_err(|e| e.at(Stage::Refresh))?
            }
            (None, _) => resolve(self.source.as_ref(), id, &self.reference_mint)
                .await
                .map_err(|e| e.at(Stage::Resolve))?,
        };

        let pool = self.publish(Arc::new(pool));
        self.evict_stale(pool.pair());
        if let PoolId::Mint(mint) = id {
            self.mints.insert(*mint, *pool.pair());
        }
        Ok(pool)
    }

    /// Stores `pool` unless the cache already holds a snapshot requested
    /// later, and returns whichever one is kept.
    fn publish(&self, pool: Arc<PoolState>) -> Arc<PoolState> {
        match self.pools.entry(*pool.pair()) {
            Entry::Occupied(entry) if entry.get().refreshed_at() >= pool.refreshed_at() => {
                debug!("Keeping newer snapshot of {}", pool.pair());
                Arc::clone(entry.get())
            }
            Entry::Occupied(mut entry) => {
                entry.insert(Arc::clone(&pool));
                pool
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&pool));
                pool
            }
        }
    }

    /// Drops stale snapshots other than `keep`, and mint entries pointing at
    /// dropped pools.
    fn evict_stale(&self, keep: &Pubkey) {
        self.pools
            .retain(|pair, pool| pair == keep || !pool.is_stale(self.staleness));
        self.mints.retain(|_, pair| self.pools.contains_key(pair));
    }

    /// Snapshot currently cached for `pair`, fresh or not.
    pub fn cached(&self, pair: &Pubkey) -> Option<Arc<PoolState>> {
        self.pools.get(pair).map(|pool| Arc::clone(&pool))
    }

    pub fn cached_pools(&self) -> usize {
        self.pools.len()
    }

    /// Drops every cached snapshot.
    pub fn clear_cache(&self) {
        self.pools.clear();
        self.mints.clear();
    }
}

fn validate_sell(percentage: Decimal, slippage: Decimal) -> Result<(), StageError> {
    // Probe with a non-zero balance so only the caller's parameters are checked.
    SwapIntent::new(
        SwapDirection::SellBaseForQuote,
        AmountSpec::PercentOfBalance {
            percent: percentage,
            balance: 1,
        },
        slippage,
    )
    .map(|_| ())
    .map_err(|e| e.at(Stage::Validate))
}

fn sell_intent(
    percentage: Decimal,
    balance: u64,
    slippage: Decimal,
) -> Result<SwapIntent, StageError> {
    SwapIntent::new(
        SwapDirection::SellBaseForQuote,
        AmountSpec::PercentOfBalance {
            percent: percentage,
            balance,
        },
        slippage,
    )
    .map_err(|e| e.at(Stage::Validate))
}
