// Uniswap V3 swap math within the current tick range, used to price concentrated pools
// held in a snapshot without a QuoterV2 round trip.
use ethers::types::{Address, U256, U512};

use crate::error::{HopError, MathError};

pub const MIN_SQRT_RATIO: U256 = U256([4295128739, 0, 0, 0]); // sqrt(1.0001^-887272) * 2^96
pub const MAX_SQRT_RATIO: U256 = U256([6743328256752651558, 17280870778742802505, 4294805859, 0]); // sqrt(1.0001^887272) * 2^96

/// Q96 fixed point constant
pub const Q96: U256 = U256([0, 1 << 32, 0, 0]); // 2^96

const FEE_DENOMINATOR: u32 = 1_000_000;

/// State of a concentrated pool at its current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V3PoolState {
    pub sqrt_price_x96: U256,
    pub liquidity: u128,
    /// Fee in hundredths of a bip (3000 = 0.3%).
    pub fee: u32,
}

/// Determine if swap is zero_for_one based on token addresses
pub fn is_zero_for_one(token_in: Address, token0: Address) -> bool {
    token_in == token0
}

fn to_u256(v: U512) -> Result<U256, MathError> {
    U256::try_from(v).map_err(|_| MathError::Overflow)
}

fn div_round_up(n: U512, d: U512) -> Result<U512, MathError> {
    if d.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let q = n / d;
    Ok(if (n % d).is_zero() { q } else { q + 1 })
}

fn amount0_delta(sqrt_a: U256, sqrt_b: U256, liquidity: u128, round_up: bool) -> Result<U256, MathError> {
    let (lower, upper) = if sqrt_a > sqrt_b { (sqrt_b, sqrt_a) } else { (sqrt_a, sqrt_b) };
    if lower.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let numerator = U512::from(liquidity) * U512::from(Q96) * U512::from(upper - lower);
    let denominator = U512::from(lower) * U512::from(upper);
    let amount = if round_up {
        div_round_up(numerator, denominator)?
    } else {
        numerator / denominator
    };
    to_u256(amount)
}

fn amount1_delta(sqrt_a: U256, sqrt_b: U256, liquidity: u128, round_up: bool) -> Result<U256, MathError> {
    let (lower, upper) = if sqrt_a > sqrt_b { (sqrt_b, sqrt_a) } else { (sqrt_a, sqrt_b) };
    let numerator = U512::from(liquidity) * U512::from(upper - lower);
    let amount = if round_up {
        div_round_up(numerator, U512::from(Q96))?
    } else {
        numerator / U512::from(Q96)
    };
    to_u256(amount)
}

fn check_price(sqrt_price: U256) -> Result<U256, HopError> {
    if sqrt_price <= MIN_SQRT_RATIO || sqrt_price >= MAX_SQRT_RATIO {
        return Err(HopError::InsufficientLiquidity);
    }
    Ok(sqrt_price)
}

/// Output of an exact-input swap that stays inside the current range.
pub fn swap_exact_input(
    state: &V3PoolState,
    amount_in: U256,
    zero_for_one: bool,
) -> Result<U256, HopError> {
    if state.liquidity == 0 {
        return Err(HopError::ZeroLiquidity);
    }
    let sqrt_p = state.sqrt_price_x96;
    let fee_factor = U512::from(FEE_DENOMINATOR.saturating_sub(state.fee));
    let amount = to_u256(U512::from(amount_in) * fee_factor / U512::from(FEE_DENOMINATOR))?;
    if amount.is_zero() {
        return Ok(U256::zero());
    }
    let liquidity = U512::from(state.liquidity);

    if zero_for_one {
        // price moves down: next = L*Q96*P / (L*Q96 + amount*P), rounded up
        let numerator1 = liquidity * U512::from(Q96);
        let denominator = numerator1 + U512::from(amount) * U512::from(sqrt_p);
        let next = check_price(to_u256(div_round_up(numerator1 * U512::from(sqrt_p), denominator)?)?)?;
        Ok(amount1_delta(next, sqrt_p, state.liquidity, false)?)
    } else {
        // price moves up: next = P + amount*Q96/L, rounded down
        let quotient = to_u256(U512::from(amount) * U512::from(Q96) / liquidity)?;
        let next = check_price(sqrt_p.checked_add(quotient).ok_or(MathError::Overflow)?)?;
        Ok(amount0_delta(sqrt_p, next, state.liquidity, false)?)
    }
}

/// Input (fee included) required for an exact-output swap inside the current range.
pub fn swap_exact_output(
    state: &V3PoolState,
    amount_out: U256,
    zero_for_one: bool,
) -> Result<U256, HopError> {
    if state.liquidity == 0 {
        return Err(HopError::ZeroLiquidity);
    }
    if amount_out.is_zero() {
        return Ok(U256::zero());
    }
    let sqrt_p = state.sqrt_price_x96;
    let liquidity = U512::from(state.liquidity);

    let net_in = if zero_for_one {
        // token1 out: next = P - ceil(out*Q96/L)
        let quotient = to_u256(div_round_up(U512::from(amount_out) * U512::from(Q96), liquidity)?)?;
        if quotient >= sqrt_p {
            return Err(HopError::InsufficientLiquidity);
        }
        let next = check_price(sqrt_p - quotient)?;
        amount0_delta(next, sqrt_p, state.liquidity, true)?
    } else {
        // token0 out: next = L*Q96*P / (L*Q96 - out*P), rounded up
        let numerator1 = liquidity * U512::from(Q96);
        let product = U512::from(amount_out) * U512::from(sqrt_p);
        if product >= numerator1 {
            return Err(HopError::InsufficientLiquidity);
        }
        let next = to_u256(div_round_up(numerator1 * U512::from(sqrt_p), numerator1 - product)?)?;
        let next = check_price(next)?;
        amount1_delta(sqrt_p, next, state.liquidity, true)?
    };

    let fee_factor = FEE_DENOMINATOR.saturating_sub(state.fee);
    let gross = div_round_up(
        U512::from(net_in) * U512::from(FEE_DENOMINATOR),
        U512::from(fee_factor),
    )?;
    Ok(to_u256(gross)?)
}
