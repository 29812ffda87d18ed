//! Types for deserializing JSON responses from the Raydium HTTP API.

use crate::amm::AmmKeys;
use crate::error::SwapError;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Response from `/pools/info/mint`.
#[derive(Deserialize, Debug)]
pub struct PoolInfosResponse {
    /// Whether the API call was successful.
    pub success: bool,
    /// The payload data.
    pub data: PoolInfosResponseData,
}

/// Metadata and list of pools.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfosResponseData {
    pub count: Option<u32>,
    pub data: Vec<PoolInfoData>,
    #[serde(default)]
    pub has_next_page: bool,
}

/// Summary information for a single pool.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfoData {
    /// Type of pool (e.g., “Standard”).
    pub r#type: String,
    /// On‑chain program ID.
    pub program_id: String,
    /// Pool account address.
    pub id: String,
    pub mint_a: Mint,
    pub mint_b: Mint,
    /// Token B per token A.
    #[serde(default)]
    pub price: f64,
    /// Total value locked.
    #[serde(default)]
    pub tvl: f64,
}

/// Token mint metadata.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Mint {
    pub address: String,
    pub program_id: String,
    #[serde(default)]
    pub symbol: String,
    pub decimals: u32,
}

/// Response from `/pools/key/ids`.
#[derive(Deserialize, Debug)]
pub struct PoolKeysResponse {
    pub success: bool,
    pub data: Vec<Option<PoolKey>>,
}

/// On‑chain account addresses needed for swaps.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PoolKey {
    /// AMM program ID.
    pub program_id: String,
    /// Pool account address.
    pub id: String,
    pub mint_a: Mint,
    pub mint_b: Mint,
    pub vault: Vault,
    pub authority: String,
    pub open_orders: String,
    pub target_orders: String,
    pub market_program_id: String,
    pub market_id: String,
    pub market_authority: String,
    pub market_base_vault: String,
    pub market_quote_vault: String,
    pub market_bids: String,
    pub market_asks: String,
    pub market_event_queue: String,
}

/// Vault addresses for token A and B.
#[derive(Deserialize, Debug)]
pub struct Vault {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
}

fn parse_key(field: &str, value: &str) -> Result<Pubkey, SwapError> {
    Pubkey::from_str(value)
        .map_err(|e| SwapError::Transport(format!("invalid {field} address {value:?}: {e}")))
}

impl TryFrom<&PoolKey> for AmmKeys {
    type Error = SwapError;

    fn try_from(key: &PoolKey) -> Result<Self, Self::Error> {
        Ok(AmmKeys {
            amm_id: parse_key("id", &key.id)?,
            authority: parse_key("authority", &key.authority)?,
            open_orders: parse_key("openOrders", &key.open_orders)?,
            coin_vault: parse_key("vault.A", &key.vault.a)?,
            pc_vault: parse_key("vault.B", &key.vault.b)?,
            market_program: parse_key("marketProgramId", &key.market_program_id)?,
            market: parse_key("marketId", &key.market_id)?,
            market_bids: parse_key("marketBids", &key.market_bids)?,
            market_asks: parse_key("marketAsks", &key.market_asks)?,
            market_event_queue: parse_key("marketEventQueue", &key.market_event_queue)?,
            market_coin_vault: parse_key("marketBaseVault", &key.market_base_vault)?,
            market_pc_vault: parse_key("marketQuoteVault", &key.market_quote_vault)?,
            market_authority: parse_key("marketAuthority", &key.market_authority)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS_JSON: &str = r#"{
        "id": "b6b1c1e4-0000",
        "success": true,
        "data": [{
            "programId": "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8",
            "id": "58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2",
            "mintA": {"chainId": 101, "address": "So11111111111111111111111111111111111111112", "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA", "symbol": "WSOL", "decimals": 9, "tags": []},
            "mintB": {"chainId": 101, "address": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA", "symbol": "USDC", "decimals": 6, "tags": []},
            "lookupTableAccount": "3q8sZGGpPESLxurJjNmr7s7wcKS5RPCCHMagbuHP9U2W",
            "openTime": "0",
            "vault": {"A": "DQyrAcCrDXQ7NeoqGgDCZwBvWDcYmFCjSb9JtteuvPpz", "B": "HLmqeL62xR1QoZ1HKKbXRrdN1p3phKpxRMb2VVopvBBz"},
            "authority": "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1",
            "openOrders": "HmiHHzq4Fym9e1D4qzLS6LDDM3tNsCTBPDWHTLZ763jY",
            "targetOrders": "CZza3Ej4Mc58MnxWA385itCC9jCo3L1D7zc3LKy1bZMR",
            "mintLp": {"chainId": 101, "address": "8HoQnePLqPj4M7PUDzfw8e3Ymdwgc7NLGnaTUapubyvu", "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA", "symbol": "", "decimals": 9, "tags": []},
            "marketProgramId": "srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX",
            "marketId": "8BnEgHoWFysVcuFFX7QztDmzuH8r5ZFvyP3sYwn1XTh6",
            "marketAuthority": "CTz5UMLQm2SRWHzQnU62Pi4yJqbNGjgRBHqqp6oDHfF7",
            "marketBaseVault": "CKxTHwM9fPMRRvZmFnFoqKNd9pQR21c5Aq9bh5h9oghX",
            "marketQuoteVault": "6A5NHCj1yF6urc9wZNe6Bcjj4LVszQNj5DwAWG97yzMu",
            "marketBids": "5jWUncPNBMZJ3sTHKmMLszypVkoRK6bfEQMQUHweeQnh",
            "marketAsks": "EaXdHx7x3mdGA38j5RSmKYSXMzAFzzUXCLNBEDXDn1d5",
            "marketEventQueue": "8CvwxZ9Db6XbLD46NZwwmVDZZRDy7eydFcAGkXKh9axa"
        }]
    }"#;

    #[test]
    fn pool_keys_convert_to_amm_keys() {
        let resp: PoolKeysResponse = serde_json::from_str(KEYS_JSON).unwrap();
        assert!(resp.success);
        let key = resp.data[0].as_ref().unwrap();
        let keys = AmmKeys::try_from(key).unwrap();
        assert_eq!(
            keys.amm_id,
            Pubkey::from_str("58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2").unwrap()
        );
        assert_eq!(
            keys.coin_vault,
            Pubkey::from_str("DQyrAcCrDXQ7NeoqGgDCZwBvWDcYmFCjSb9JtteuvPpz").unwrap()
        );
        assert_eq!(key.mint_b.decimals, 6);
    }

    #[test]
    fn bad_address_is_a_transport_error() {
        let json = KEYS_JSON.replace("HmiHHzq4Fym9e1D4qzLS6LDDM3tNsCTBPDWHTLZ763jY", "not-a-key");
        let resp: PoolKeysResponse = serde_json::from_str(&json).unwrap();
        let err = AmmKeys::try_from(resp.data[0].as_ref().unwrap()).unwrap_err();
        assert!(matches!(err, SwapError::Transport(msg) if msg.contains("openOrders")));
    }

    #[test]
    fn pool_listing_parses() {
        let json = r#"{
            "id": "x",
            "success": true,
            "data": {
                "count": 1,
                "hasNextPage": false,
                "data": [{
                    "type": "Standard",
                    "programId": "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8",
                    "id": "58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2",
                    "mintA": {"address": "So11111111111111111111111111111111111111112", "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA", "symbol": "WSOL", "decimals": 9},
                    "mintB": {"address": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "programId": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA", "symbol": "USDC", "decimals": 6},
                    "price": 150.5,
                    "tvl": 12345678.9,
                    "feeRate": 0.0025
                }]
            }
        }"#;
        let resp: PoolInfosResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.count, Some(1));
        assert_eq!(resp.data.data[0].r#type, "Standard");
        assert_eq!(resp.data.data[0].mint_a.decimals, 9);
    }
}
