//! Turns a quote into an unsigned swap request, and a request into the
//! instructions of a swap transaction.

use crate::amm::{AmmKeys, swap_base_in};
use crate::consts::{DEFAULT_UNIT_BUDGET, DEFAULT_UNIT_PRICE};
use crate::error::{Result, SwapError};
use crate::pool::PoolState;
use crate::quote::{Quote, SwapDirection};
use crate::util::{
    associated_token_address, close_spl_account, create_ata_idempotent, wrap_sol_instructions,
};
use serde::Deserialize;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

/// Compute unit settings attached to every swap transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct ComputeBudget {
    pub unit_limit: u32,
    /// Micro-lamports per compute unit.
    pub unit_price: u64,
}

impl Default for ComputeBudget {
    fn default() -> Self {
        Self {
            unit_limit: DEFAULT_UNIT_BUDGET,
            unit_price: DEFAULT_UNIT_PRICE,
        }
    }
}

/// A fully specified, unsigned swap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapRequest {
    pub pair: Pubkey,
    pub keys: AmmKeys,
    pub direction: SwapDirection,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount_in: u64,
    pub min_amount_out: u64,
    pub payer: Pubkey,
    /// Close the payer's input token account once it has been emptied.
    pub close_input_account: bool,
}

/// Assembles a [`SwapRequest`] from a quote on `pool`.
///
/// # Errors
/// [`SwapError::InvalidIntent`] if the quote belongs to another pool or its
/// minimum output exceeds its expected output.
pub fn build(pool: &PoolState, quote: &Quote, payer: Pubkey) -> Result<SwapRequest> {
    if quote.pair != *pool.pair() {
        return Err(SwapError::invalid(format!(
            "quote for {} used with pool {}",
            quote.pair,
            pool.pair()
        )));
    }
    if quote.min_amount_out > quote.amount_out {
        return Err(SwapError::invalid(format!(
            "minimum output {} exceeds expected output {}",
            quote.min_amount_out, quote.amount_out
        )));
    }
    if quote.amount_in == 0 {
        return Err(SwapError::invalid("quote has no input"));
    }

    let (input_mint, output_mint) = match quote.direction {
        SwapDirection::BuyBaseWithQuote => (*pool.quote_mint(), *pool.base_mint()),
        SwapDirection::SellBaseForQuote => (*pool.base_mint(), *pool.quote_mint()),
    };

    Ok(SwapRequest {
        pair: *pool.pair(),
        keys: *pool.keys(),
        direction: quote.direction,
        input_mint,
        output_mint,
        amount_in: quote.amount_in,
        min_amount_out: quote.min_amount_out,
        payer,
        close_input_account: quote.spends_full_balance
            && quote.direction == SwapDirection::SellBaseForQuote,
    })
}

impl SwapRequest {
    pub fn input_token_account(&self) -> Pubkey {
        associated_token_address(&self.payer, &self.input_mint)
    }

    pub fn output_token_account(&self) -> Pubkey {
        associated_token_address(&self.payer, &self.output_mint)
    }

    /// Lowers the request into transaction instructions.
    ///
    /// Wrapped SOL on the input side is funded from the payer's lamports and
    /// closed after the swap; on the output side it is closed to unwrap.
    pub fn instructions(&self, budget: &ComputeBudget) -> anyhow::Result<Vec<Instruction>> {
        let native_mint = spl_token::native_mint::id();
        let input_account = self.input_token_account();
        let output_account = self.output_token_account();
        let input_is_sol = self.input_mint == native_mint;
        let output_is_sol = self.output_mint == native_mint;

        let mut instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(budget.unit_limit),
            ComputeBudgetInstruction::set_compute_unit_price(budget.unit_price),
        ];

        if input_is_sol {
            instructions.push(create_ata_idempotent(&self.payer, &self.payer, &self.input_mint));
            instructions.extend(wrap_sol_instructions(
                &self.payer,
                &input_account,
                self.amount_in,
            )?);
        }
        instructions.push(create_ata_idempotent(&self.payer, &self.payer, &self.output_mint));

        instructions.push(swap_base_in(
            &self.keys,
            &input_account,
            &output_account,
            &self.payer,
            self.amount_in,
            self.min_amount_out,
        ));

        if input_is_sol || self.close_input_account {
            instructions.push(close_spl_account(&input_account, &self.payer, &self.payer)?);
        }
        if output_is_sol {
            instructions.push(close_spl_account(&output_account, &self.payer, &self.payer)?);
        }

        Ok(instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{AMM_V4, SOL_MINT};
    use crate::pool::tests::raw_pool;
    use crate::quote::{AmountSpec, SwapIntent, compute_quote};
    use rust_decimal_macros::dec;

    fn sol_pool() -> PoolState {
        let sol = Pubkey::from_str_const(SOL_MINT);
        let raw = raw_pool(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            sol,
            1_000_000_000,
            50_000_000_000,
        );
        PoolState::from_raw(&raw, &sol).unwrap()
    }

    fn quote(pool: &PoolState, direction: SwapDirection, amount: AmountSpec) -> Quote {
        let intent = SwapIntent::new(direction, amount, dec!(5)).unwrap();
        compute_quote(pool, &intent).unwrap()
    }

    fn swap_data(instructions: &[Instruction]) -> &[u8] {
        let amm = Pubkey::from_str_const(AMM_V4);
        let swaps: Vec<_> = instructions.iter().filter(|ix| ix.program_id == amm).collect();
        assert_eq!(swaps.len(), 1);
        &swaps[0].data
    }

    #[test]
    fn buy_spends_quote_mint() {
        let pool = sol_pool();
        let payer = Pubkey::new_unique();
        let q = quote(&pool, SwapDirection::BuyBaseWithQuote, AmountSpec::Raw(1_000_000));
        let request = build(&pool, &q, payer).unwrap();

        assert_eq!(request.input_mint, *pool.quote_mint());
        assert_eq!(request.output_mint, *pool.base_mint());
        assert_eq!(request.amount_in, 1_000_000);
        assert_eq!(request.min_amount_out, q.min_amount_out);
        assert_eq!(request.keys, *pool.keys());
        assert!(!request.close_input_account);
    }

    #[test]
    fn full_sell_closes_input_account() {
        let pool = sol_pool();
        let q = quote(
            &pool,
            SwapDirection::SellBaseForQuote,
            AmountSpec::PercentOfBalance {
                percent: dec!(100),
                balance: 5_000,
            },
        );
        let request = build(&pool, &q, Pubkey::new_unique()).unwrap();
        assert!(request.close_input_account);
        assert_eq!(request.input_mint, *pool.base_mint());
    }

    #[test]
    fn rejects_inconsistent_quotes() {
        let pool = sol_pool();
        let mut q = quote(&pool, SwapDirection::BuyBaseWithQuote, AmountSpec::Raw(1_000_000));
        q.min_amount_out = q.amount_out + 1;
        assert!(matches!(
            build(&pool, &q, Pubkey::new_unique()),
            Err(SwapError::InvalidIntent(_))
        ));

        let mut q = quote(&pool, SwapDirection::BuyBaseWithQuote, AmountSpec::Raw(1_000_000));
        q.pair = Pubkey::new_unique();
        assert!(matches!(
            build(&pool, &q, Pubkey::new_unique()),
            Err(SwapError::InvalidIntent(_))
        ));
    }

    #[test]
    fn buy_wraps_and_unwraps_sol() {
        let pool = sol_pool();
        let q = quote(&pool, SwapDirection::BuyBaseWithQuote, AmountSpec::Raw(1_000_000));
        let request = build(&pool, &q, Pubkey::new_unique()).unwrap();
        let instructions = request.instructions(&ComputeBudget::default()).unwrap();

        // limit, price, create wsol ata, transfer, sync, create token ata, swap, close wsol
        assert_eq!(instructions.len(), 8);
        let data = swap_data(&instructions);
        assert_eq!(data[0], 9);
        assert_eq!(u64::from_le_bytes(data[1..9].try_into().unwrap()), 1_000_000);
        assert_eq!(
            u64::from_le_bytes(data[9..17].try_into().unwrap()),
            q.min_amount_out
        );
        let swap = &instructions[6];
        assert_eq!(swap.accounts[14].pubkey, request.input_token_account());
        assert_eq!(swap.accounts[15].pubkey, request.output_token_account());
    }

    #[test]
    fn partial_sell_keeps_token_account() {
        let pool = sol_pool();
        let q = quote(
            &pool,
            SwapDirection::SellBaseForQuote,
            AmountSpec::PercentOfBalance {
                percent: dec!(50),
                balance: 5_000,
            },
        );
        let request = build(&pool, &q, Pubkey::new_unique()).unwrap();
        let partial = request.instructions(&ComputeBudget::default()).unwrap();
        // limit, price, create wsol ata, swap, close wsol
        assert_eq!(partial.len(), 5);

        let full = SwapRequest {
            close_input_account: true,
            ..request
        };
        assert_eq!(full.instructions(&ComputeBudget::default()).unwrap().len(), 6);
    }
}
