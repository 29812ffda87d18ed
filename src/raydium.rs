use crate::amm::AmmKeys;
use crate::consts::{AMM_V4, AMM_V4_ACCOUNT_LEN};
use crate::error::{Result, SwapError};
use crate::interface::{PoolInfoData, PoolInfosResponse, PoolKeysResponse};
use crate::pool::{PoolDataSource, RawPoolData};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use borsh::{BorshDeserialize, BorshSerialize};
use dashmap::DashMap;
use reqwest::Client;
use serde::de::DeserializeOwned;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest page the Raydium API serves.
const MINT_PAGE_SIZE: u32 = 100;

/// Listing pages read at most per mint lookup.
const MAX_MINT_PAGES: u32 = 10;

#[derive(BorshSerialize, BorshDeserialize, Debug)]
pub struct LiquidityStateLayoutV4 {
    pub status: u64,
    pub nonce: u64,
    pub max_order: u64,
    pub depth: u64,
    pub base_decimal: u64,
    pub quote_decimal: u64,
    pub state: u64,
    pub reset_flag: u64,
    pub min_size: u64,
    pub vol_max_cut_ratio: u64,
    pub amount_wave_ratio: u64,
    pub base_lot_size: u64,
    pub quote_lot_size: u64,
    pub min_price_multiplier: u64,
    pub max_price_multiplier: u64,
    pub system_decimal_value: u64,
    pub min_separate_numerator: u64,
    pub min_separate_denominator: u64,
    pub trade_fee_numerator: u64,
    pub trade_fee_denominator: u64,
    pub pnl_numerator: u64,
    pub pnl_denominator: u64,
    pub swap_fee_numerator: u64,
    pub swap_fee_denominator: u64,
    pub base_need_take_pnl: u64,
    pub quote_need_take_pnl: u64,
    pub quote_total_pnl: u64,
    pub base_total_pnl: u64,
    pub pool_open_time: u64,
    pub punish_pc_amount: u64,
    pub punish_coin_amount: u64,
    pub orderbook_to_init_time: u64,
    pub swap_base_in_amount: u128,
    pub swap_quote_out_amount: u128,
    pub swap_base2quote_fee: u64,
    pub swap_quote_in_amount: u128,
    pub swap_base_out_amount: u128,
    pub swap_quote2base_fee: u64,
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub open_orders: Pubkey,
    pub market_id: Pubkey,
    pub market_program_id: Pubkey,
    pub target_orders: Pubkey,
    pub withdraw_queue: Pubkey,
    pub lp_vault: Pubkey,
    pub owner: Pubkey,
    pub lp_reserve: u64,
    pub padding: [u64; 3],
}

#[derive(BorshSerialize, BorshDeserialize, Debug)]
pub(crate) struct AccountLayout {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    delegate_option: u32,
    delegate: Pubkey,
    state: u8,
    is_native_option: u32,
    is_native: u64,
    delegated_amount: u64,
    close_authority_option: u32,
    close_authority: Pubkey,
}

/// Token amount held by an SPL token account.
pub(crate) fn token_account_amount(data: &[u8]) -> anyhow::Result<u64> {
    let layout = AccountLayout::try_from_slice(data)
        .map_err(|e| anyhow!("Failed to decode token account: {:?}", e))?;
    Ok(layout.amount)
}

/// Reads AMM V4 pools from Solana RPC and their account keys from the
/// Raydium HTTP API.
///
/// Account keys never change for a pool, so they are fetched once and
/// remembered; reserves are read from chain on every call.
pub struct RaydiumPoolSource {
    reqwest_client: Client,
    base_url: String,
    rpc_client: Arc<RpcClient>,
    reference_mint: Pubkey,
    keys: DashMap<Pubkey, AmmKeys>,
}

impl RaydiumPoolSource {
    /// Creates a new pool source.
    ///
    /// # Arguments
    ///
    /// - `rpc_client`: the Solana RPC client to use.
    /// - `base_url`: Raydium API root, e.g. `https://api-v3.raydium.io`.
    /// - `reference_mint`: the mint pools are paired against when looking up
    ///   pools by token mint.
    pub fn new(
        rpc_client: Arc<RpcClient>,
        base_url: impl Into<String>,
        reference_mint: Pubkey,
    ) -> Self {
        Self {
            reqwest_client: Client::new(),
            base_url: base_url.into(),
            rpc_client,
            reference_mint,
            keys: DashMap::new(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: Option<&str>,
        query: Option<&[(&str, &str)]>,
    ) -> anyhow::Result<T> {
        let url = format!("{}{}", self.base_url, path.unwrap_or_default());
        let response = self
            .reqwest_client
            .get(&url)
            .query(query.unwrap_or(&[]))
            .send()
            .await
            .context("Raydium amm get failed")?
            .error_for_status()
            .context("Raydium non-200")?;

        Ok(response.json::<T>().await?)
    }

    /// Swap account keys for a pool, `None` if the API does not know it.
    pub async fn fetch_pool_keys(&self, id: &Pubkey) -> anyhow::Result<Option<AmmKeys>> {
        if let Some(keys) = self.keys.get(id) {
            return Ok(Some(*keys));
        }
        let id_str = id.to_string();
        let resp: PoolKeysResponse = self
            .get(Some("/pools/key/ids"), Some(&[("ids", id_str.as_str())]))
            .await?;
        if !resp.success {
            return Err(anyhow!("Raydium rejected key lookup for {id}"));
        }
        let Some(key) = resp.data.into_iter().flatten().next() else {
            return Ok(None);
        };
        let keys = AmmKeys::try_from(&key)?;
        self.keys.insert(*id, keys);
        Ok(Some(keys))
    }

    /// List standard pools trading `mint_1` against `mint_2`, deepest first.
    pub async fn fetch_pool_infos(
        &self,
        mint_1: &Pubkey,
        mint_2: &Pubkey,
        page_size: u32,
        page: u32,
    ) -> anyhow::Result<PoolInfosResponse> {
        let mint_1 = mint_1.to_string();
        let mint_2 = mint_2.to_string();
        let page_size = page_size.to_string();
        let page = page.to_string();
        let query = [
            ("mint1", mint_1.as_str()),
            ("mint2", mint_2.as_str()),
            ("poolType", "standard"),
            ("poolSortField", "liquidity"),
            ("sortType", "desc"),
            ("pageSize", page_size.as_str()),
            ("page", page.as_str()),
        ];
        self.get(Some("/pools/info/mint"), Some(&query)).await
    }

    /// Decode the AMM account, `None` if nothing lives at `pool_id`.
    pub async fn get_market_state(
        &self,
        pool_id: &Pubkey,
    ) -> anyhow::Result<Option<LiquidityStateLayoutV4>> {
        let Some(account) = self
            .rpc_client
            .get_account_with_commitment(pool_id, CommitmentConfig::confirmed())
            .await?
            .value
        else {
            return Ok(None);
        };
        if account.owner != Pubkey::from_str_const(AMM_V4) {
            warn!("Account {} is not owned by the AMM V4 program", pool_id);
            return Ok(None);
        }
        if account.data.len() != AMM_V4_ACCOUNT_LEN {
            return Err(anyhow!(
                "AMM account {} has {} bytes, expected {}",
                pool_id,
                account.data.len(),
                AMM_V4_ACCOUNT_LEN
            ));
        }
        let market_state = LiquidityStateLayoutV4::try_from_slice(&account.data)
            .map_err(|e| anyhow!("Failed to decode market state: {:?}", e))?;
        debug!("Market state {:?}", market_state);
        Ok(Some(market_state))
    }

    /// Retrieve tradable reserves (vault balance minus pending PnL) as
    /// `(coin, pc)`.
    pub async fn get_reserves(
        &self,
        market_state: &LiquidityStateLayoutV4,
    ) -> anyhow::Result<(u64, u64)> {
        let vaults = self
            .rpc_client
            .get_multiple_accounts_with_commitment(
                &[market_state.base_vault, market_state.quote_vault],
                CommitmentConfig::confirmed(),
            )
            .await?
            .value;
        let [Some(coin_vault), Some(pc_vault)] = vaults.as_slice() else {
            return Err(anyhow!("pool vault account not found"));
        };

        let coin_reserve = token_account_amount(&coin_vault.data)?
            .checked_sub(market_state.base_need_take_pnl)
            .ok_or(anyhow!("coin vault below pending pnl"))?;
        let pc_reserve = token_account_amount(&pc_vault.data)?
            .checked_sub(market_state.quote_need_take_pnl)
            .ok_or(anyhow!("pc vault below pending pnl"))?;
        Ok((coin_reserve, pc_reserve))
    }

    async fn load_pool(&self, address: &Pubkey) -> anyhow::Result<Option<RawPoolData>> {
        let Some(market_state) = self.get_market_state(address).await? else {
            return Ok(None);
        };
        let Some(keys) = self.fetch_pool_keys(address).await? else {
            return Ok(None);
        };
        let (coin_reserve, pc_reserve) = self.get_reserves(&market_state).await?;
        debug!("Reserves of {}: coin {} pc {}", address, coin_reserve, pc_reserve);

        Ok(Some(RawPoolData {
            address: *address,
            coin_mint: market_state.base_mint,
            pc_mint: market_state.quote_mint,
            coin_reserve,
            pc_reserve,
            coin_decimals: u8::try_from(market_state.base_decimal)?,
            pc_decimals: u8::try_from(market_state.quote_decimal)?,
            fee_numerator: market_state.swap_fee_numerator,
            fee_denominator: market_state.swap_fee_denominator,
            keys,
        }))
    }
}

#[async_trait]
impl PoolDataSource for RaydiumPoolSource {
    async fn fetch_pool_by_address(&self, address: &Pubkey) -> Result<Option<RawPoolData>> {
        self.load_pool(address)
            .await
            .map_err(|e| SwapError::transport(format!("{e:#}")))
    }

    async fn fetch_pools_by_mint(&self, mint: &Pubkey) -> Result<Vec<RawPoolData>> {
        let infos = collect_listing(|page| {
            self.fetch_pool_infos(mint, &self.reference_mint, MINT_PAGE_SIZE, page)
        })
        .await
        .map_err(|e| SwapError::transport(format!("pool listing for {mint}: {e:#}")))?;
        debug!("{} listed pools for mint {}", infos.len(), mint);

        let pools = load_candidates(&infos, |address| async move {
            self.load_pool(&address).await
        })
        .await;
        Ok(pools)
    }
}

/// Reads listing pages from the first one while the API reports more.
async fn collect_listing<F, Fut>(mut fetch_page: F) -> anyhow::Result<Vec<PoolInfoData>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = anyhow::Result<PoolInfosResponse>>,
{
    let mut infos = Vec::new();
    for page in 1..=MAX_MINT_PAGES {
        let resp = fetch_page(page).await?;
        if !resp.success {
            return Err(anyhow!("Raydium rejected pool listing page {page}"));
        }
        infos.extend(resp.data.data);
        if !resp.data.has_next_page {
            return Ok(infos);
        }
    }
    warn!("Pool listing cut off after {} pages", MAX_MINT_PAGES);
    Ok(infos)
}

/// Loads every listed AMM V4 pool. A candidate that fails to load is logged
/// and skipped so the healthy ones still compete.
async fn load_candidates<F, Fut>(infos: &[PoolInfoData], mut load: F) -> Vec<RawPoolData>
where
    F: FnMut(Pubkey) -> Fut,
    Fut: Future<Output = anyhow::Result<Option<RawPoolData>>>,
{
    let mut pools = Vec::new();
    for info in infos.iter().filter(|info| info.program_id == AMM_V4) {
        let address = match Pubkey::from_str(&info.id) {
            Ok(address) => address,
            Err(e) => {
                warn!("Skipping listed pool {:?}: {}", info.id, e);
                continue;
            }
        };
        debug!("Candidate pool {} (tvl {})", address, info.tvl);
        match load(address).await {
            Ok(Some(raw)) => pools.push(raw),
            Ok(None) => debug!("Listed pool {} has no AMM account", address),
            Err(e) => warn!("Skipping pool {}: {:#}", address, e),
        }
    }
    pools
}
