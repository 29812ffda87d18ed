//! Constant-product quote engine.
//!
//! Everything on the reserve path is integer arithmetic (u128 intermediates)
//! or exact [`Decimal`] arithmetic, so the same pool snapshot and intent
//! always yield the same quote. `f64` only appears in the display prices.
//!
//! # Algorithm
//!
//! 1. `fee = ceil(amount_in × fee_num / fee_den)`
//! 2. `effective = amount_in − fee`
//! 3. `amount_out = reserve_out × effective / (reserve_in + effective)`
//! 4. `price_impact = 1 − (amount_out × reserve_in) / (amount_in × reserve_out)`
//! 5. `min_amount_out = floor(amount_out × (100 − slippage) / 100)`

use crate::error::{Result, SwapError};
use crate::pool::PoolState;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Largest magnitude a [`Decimal`] mantissa holds.
const DECIMAL_MANTISSA_MAX: u128 = (1u128 << 96) - 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SwapDirection {
    /// Spend the reference asset, receive the pool's token.
    BuyBaseWithQuote,
    /// Spend the pool's token, receive the reference asset.
    SellBaseForQuote,
}

/// How much of the input token to spend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AmountSpec {
    /// Human units of the input token, e.g. `0.5` SOL.
    Exact(Decimal),
    /// Smallest units of the input token.
    Raw(u64),
    /// A share of a held balance (smallest units).
    PercentOfBalance { percent: Decimal, balance: u64 },
}

impl AmountSpec {
    fn validate(&self) -> Result<()> {
        match self {
            AmountSpec::Exact(amount) if *amount <= Decimal::ZERO => Err(SwapError::invalid(
                format!("amount must be positive, got {amount}"),
            )),
            AmountSpec::Raw(0) => Err(SwapError::invalid("amount must be positive")),
            AmountSpec::PercentOfBalance { percent, .. }
                if *percent <= Decimal::ZERO || *percent > Decimal::ONE_HUNDRED =>
            {
                Err(SwapError::invalid(format!(
                    "percentage must be in (0, 100], got {percent}"
                )))
            }
            AmountSpec::PercentOfBalance { balance: 0, .. } => {
                Err(SwapError::invalid("held balance is zero"))
            }
            _ => Ok(()),
        }
    }

    /// Input amount in smallest units for a token with `decimals`.
    pub fn to_raw(&self, decimals: u8) -> Result<u64> {
        let raw = match self {
            AmountSpec::Raw(amount) => Some(*amount),
            AmountSpec::Exact(amount) => amount
                .checked_mul(Decimal::from(10u64.pow(decimals as u32)))
                .and_then(|scaled| scaled.floor().to_u64()),
            AmountSpec::PercentOfBalance { percent, balance } => Decimal::from(*balance)
                .checked_mul(*percent)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .and_then(|share| share.floor().to_u64()),
        };
        match raw {
            None => Err(SwapError::invalid(format!(
                "amount {self:?} does not fit in a token amount"
            ))),
            Some(0) => Err(SwapError::invalid(format!(
                "amount {self:?} rounds to zero"
            ))),
            Some(amount) => Ok(amount),
        }
    }
}

/// A validated trade request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapIntent {
    direction: SwapDirection,
    amount: AmountSpec,
    slippage: Decimal,
}

impl SwapIntent {
    /// # Errors
    /// [`SwapError::InvalidIntent`] when slippage is outside `[0, 100]`, the
    /// amount is not positive, the percentage is outside `(0, 100]` or the
    /// held balance is zero.
    pub fn new(direction: SwapDirection, amount: AmountSpec, slippage: Decimal) -> Result<Self> {
        if slippage < Decimal::ZERO || slippage > Decimal::ONE_HUNDRED {
            return Err(SwapError::invalid(format!(
                "slippage must be in [0, 100], got {slippage}"
            )));
        }
        amount.validate()?;
        Ok(Self {
            direction,
            amount,
            slippage,
        })
    }

    pub fn direction(&self) -> SwapDirection {
        self.direction
    }

    pub fn amount(&self) -> &AmountSpec {
        &self.amount
    }

    pub fn slippage(&self) -> Decimal {
        self.slippage
    }

    /// True when the intent sells everything that is held.
    pub fn spends_full_balance(&self) -> bool {
        matches!(self.amount, AmountSpec::PercentOfBalance { percent, .. } if percent == Decimal::ONE_HUNDRED)
    }
}

/// The result of applying an intent to a pool snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Quote {
    pub pair: Pubkey,
    pub direction: SwapDirection,
    /// Input in smallest units, fee included.
    pub amount_in: u64,
    /// Output before slippage.
    pub amount_out: u64,
    /// Output floor enforced on-chain.
    pub min_amount_out: u64,
    /// Fee deducted from the input.
    pub fee: u64,
    /// Deviation from the pool's instantaneous price, as a ratio.
    pub price_impact: Decimal,
    /// Pool price before the trade (quote per base), display only.
    pub current_price: f64,
    /// Average price of this trade (quote per base), display only.
    pub execution_price: f64,
    pub spends_full_balance: bool,
}

/// Computes a slippage-bounded quote.
///
/// # Errors
/// - [`SwapError::InvalidIntent`] if the amount resolves to zero smallest units.
/// - [`SwapError::InsufficientLiquidity`] if a reserve is empty, the output
///   rounds to zero or the output would drain the pool.
pub fn compute_quote(pool: &PoolState, intent: &SwapIntent) -> Result<Quote> {
    let (reserve_in, reserve_out, decimals_in) = match intent.direction {
        SwapDirection::BuyBaseWithQuote => (
            pool.quote_reserve(),
            pool.base_reserve(),
            pool.quote_decimals(),
        ),
        SwapDirection::SellBaseForQuote => (
            pool.base_reserve(),
            pool.quote_reserve(),
            pool.base_decimals(),
        ),
    };
    if reserve_in == 0 || reserve_out == 0 {
        return Err(SwapError::liquidity(format!(
            "pool {} has an empty reserve",
            pool.pair()
        )));
    }

    let amount_in = intent.amount.to_raw(decimals_in)?;

    let (fee_numerator, fee_denominator) = pool.fee();
    let fee = (amount_in as u128 * fee_numerator as u128).div_ceil(fee_denominator as u128) as u64;
    let effective_in = amount_in - fee;

    let amount_out = reserve_out as u128 * effective_in as u128
        / (reserve_in as u128 + effective_in as u128);
    if amount_out == 0 {
        return Err(SwapError::liquidity(format!(
            "output for {amount_in} rounds to zero"
        )));
    }
    if amount_out >= reserve_out as u128 {
        return Err(SwapError::liquidity(format!(
            "output {amount_out} would drain reserve {reserve_out}"
        )));
    }
    let amount_out = amount_out as u64;

    let price_impact = Decimal::ONE
        - ratio(
            amount_out as u128 * reserve_in as u128,
            amount_in as u128 * reserve_out as u128,
        );
    let min_amount_out = apply_slippage(amount_out, intent.slippage);

    let (current_price, execution_price) =
        display_prices(pool, intent.direction, amount_in, amount_out);

    debug!(
        "Quote {:?} on {}: in {} fee {} out {} min {} impact {}",
        intent.direction,
        pool.pair(),
        amount_in,
        fee,
        amount_out,
        min_amount_out,
        price_impact
    );

    Ok(Quote {
        pair: *pool.pair(),
        direction: intent.direction,
        amount_in,
        amount_out,
        min_amount_out,
        fee,
        price_impact,
        current_price,
        execution_price,
        spends_full_balance: intent.spends_full_balance(),
    })
}

/// `floor(amount × (100 − slippage) / 100)`, never above `amount`.
pub fn apply_slippage(amount: u64, slippage: Decimal) -> u64 {
    Decimal::from(amount)
        .checked_mul(Decimal::ONE_HUNDRED - slippage)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .and_then(|v| v.floor().to_u64())
        .unwrap_or(0)
        .min(amount)
}

/// `num / den` as a [`Decimal`], dropping low bits until both fit a mantissa.
fn ratio(mut num: u128, mut den: u128) -> Decimal {
    while num > DECIMAL_MANTISSA_MAX || den > DECIMAL_MANTISSA_MAX {
        num >>= 1;
        den >>= 1;
    }
    let num = Decimal::from_i128_with_scale(num as i128, 0);
    let den = Decimal::from_i128_with_scale(den.max(1) as i128, 0);
    num / den
}

fn display_prices(
    pool: &PoolState,
    direction: SwapDirection,
    amount_in: u64,
    amount_out: u64,
) -> (f64, f64) {
    let base_unit = 10f64.powi(pool.base_decimals() as i32);
    let quote_unit = 10f64.powi(pool.quote_decimals() as i32);
    let current =
        (pool.quote_reserve() as f64 / quote_unit) / (pool.base_reserve() as f64 / base_unit);
    let (base_amount, quote_amount) = match direction {
        SwapDirection::BuyBaseWithQuote => (amount_out, amount_in),
        SwapDirection::SellBaseForQuote => (amount_in, amount_out),
    };
    let execution = (quote_amount as f64 / quote_unit) / (base_amount as f64 / base_unit);
    (current, execution)
}
