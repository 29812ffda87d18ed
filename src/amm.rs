//! Raydium AMM V4 instruction encoding.

use crate::consts::AMM_V4;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

const SWAP_BASE_IN_TAG: u8 = 9;

/// Swap a fixed input amount, failing on-chain if less than
/// `minimum_amount_out` comes back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapInstructionBaseIn {
    pub amount_in: u64,
    pub minimum_amount_out: u64,
}

impl SwapInstructionBaseIn {
    /// Packs the instruction into its wire form: a one byte tag followed by
    /// two little-endian u64 values.
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(17);
        buf.push(SWAP_BASE_IN_TAG);
        buf.extend_from_slice(&self.amount_in.to_le_bytes());
        buf.extend_from_slice(&self.minimum_amount_out.to_le_bytes());
        buf
    }
}

/// On-chain accounts an AMM V4 swap touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AmmKeys {
    pub amm_id: Pubkey,
    pub authority: Pubkey,
    pub open_orders: Pubkey,
    pub coin_vault: Pubkey,
    pub pc_vault: Pubkey,
    pub market_program: Pubkey,
    pub market: Pubkey,
    pub market_bids: Pubkey,
    pub market_asks: Pubkey,
    pub market_event_queue: Pubkey,
    pub market_coin_vault: Pubkey,
    pub market_pc_vault: Pubkey,
    pub market_authority: Pubkey,
}

/// Swap coin or pc from pool, base amount_in with a slippage of minimum_amount_out
///
///   0. `[]` Spl Token program id
///   1. `[writable]` AMM Account
///   2. `[]` $authority derived from `create_program_address(&[AUTHORITY_AMM, &[nonce]])`.
///   3. `[writable]` AMM open orders Account
///   4. `[writable]` AMM coin vault Account to swap FROM or To.
///   5. `[writable]` AMM pc vault Account to swap FROM or To.
///   6. `[]` Market program id
///   7. `[writable]` Market Account. Market program is the owner.
///   8. `[writable]` Market bids Account
///   9. `[writable]` Market asks Account
///   10. `[writable]` Market event queue Account
///   11. `[writable]` Market coin vault Account
///   12. `[writable]` Market pc vault Account
///   13. `[]` Market vault signer Account
///   14. `[writable]` User source token Account.
///   15. `[writable]` User destination token Account.
///   16. `[signer]` User wallet Account
///
/// The optional target orders account is omitted; the program no longer reads it.
pub fn swap_base_in(
    keys: &AmmKeys,
    user_source: &Pubkey,
    user_destination: &Pubkey,
    owner: &Pubkey,
    amount_in: u64,
    minimum_amount_out: u64,
) -> Instruction {
    let data = SwapInstructionBaseIn {
        amount_in,
        minimum_amount_out,
    }
    .pack();

    let accounts = vec![
        // spl token
        AccountMeta::new_readonly(spl_token::id(), false),
        // amm
        AccountMeta::new(keys.amm_id, false),
        AccountMeta::new_readonly(keys.authority, false),
        AccountMeta::new(keys.open_orders, false),
        AccountMeta::new(keys.coin_vault, false),
        AccountMeta::new(keys.pc_vault, false),
        // market
        AccountMeta::new_readonly(keys.market_program, false),
        AccountMeta::new(keys.market, false),
        AccountMeta::new(keys.market_bids, false),
        AccountMeta::new(keys.market_asks, false),
        AccountMeta::new(keys.market_event_queue, false),
        AccountMeta::new(keys.market_coin_vault, false),
        AccountMeta::new(keys.market_pc_vault, false),
        AccountMeta::new_readonly(keys.market_authority, false),
        // user
        AccountMeta::new(*user_source, false),
        AccountMeta::new(*user_destination, false),
        AccountMeta::new_readonly(*owner, true),
    ];

    Instruction {
        program_id: Pubkey::from_str_const(AMM_V4),
        accounts,
        data,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_keys() -> AmmKeys {
        AmmKeys {
            amm_id: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            open_orders: Pubkey::new_unique(),
            coin_vault: Pubkey::new_unique(),
            pc_vault: Pubkey::new_unique(),
            market_program: Pubkey::new_unique(),
            market: Pubkey::new_unique(),
            market_bids: Pubkey::new_unique(),
            market_asks: Pubkey::new_unique(),
            market_event_queue: Pubkey::new_unique(),
            market_coin_vault: Pubkey::new_unique(),
            market_pc_vault: Pubkey::new_unique(),
            market_authority: Pubkey::new_unique(),
        }
    }

    #[test]
    fn swap_base_in_layout() {
        let data = SwapInstructionBaseIn {
            amount_in: 1_000,
            minimum_amount_out: 0x0102_0304,
        }
        .pack();
        assert_eq!(data.len(), 17);
        assert_eq!(data[0], 9);
        assert_eq!(u64::from_le_bytes(data[1..9].try_into().unwrap()), 1_000);
        assert_eq!(
            u64::from_le_bytes(data[9..17].try_into().unwrap()),
            0x0102_0304
        );
    }

    #[test]
    fn only_the_owner_signs() {
        let keys = sample_keys();
        let source = Pubkey::new_unique();
        let destination = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let ix = swap_base_in(&keys, &source, &destination, &owner, 10, 9);

        assert_eq!(ix.program_id, Pubkey::from_str_const(AMM_V4));
        assert_eq!(ix.accounts.len(), 17);
        assert_eq!(ix.accounts[1].pubkey, keys.amm_id);
        assert_eq!(ix.accounts[14].pubkey, source);
        assert_eq!(ix.accounts[15].pubkey, destination);
        let signers: Vec<_> = ix.accounts.iter().filter(|a| a.is_signer).collect();
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].pubkey, owner);
        assert!(!ix.accounts[16].is_writable);
    }
}
