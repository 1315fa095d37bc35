//! Closed-form pricing for the pool families priced locally: constant-product pairs and
//! Solidly stable/volatile pairs. Concentrated-liquidity pools are priced by the QuoterV2
//! (or by [`crate::v3_math`] against a snapshot).
//!
//! All functions work in raw token units and round the way the contracts round: outputs
//! down, required inputs up.

use ethers::types::{U256, U512};

use crate::error::{HopError, MathError};

pub const BPS_DENOMINATOR: u32 = 10_000;

/// 1e18, the fixed-point unit of the Solidly stable curve.
const ONE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);
const STABLE_MAX_ITERATIONS: usize = 255;

fn to_u256(v: U512) -> Result<U256, MathError> {
    U256::try_from(v).map_err(|_| MathError::Overflow)
}

fn mul(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

fn div(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_div(b).ok_or(MathError::DivisionByZero)
}

/// Constant-product output for an exact input, fee in basis points.
///
/// `out = in * (10000 - fee) * R_out / (R_in * 10000 + in * (10000 - fee))`
pub fn cp_amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u32,
) -> Result<U256, HopError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(HopError::ZeroLiquidity);
    }
    if amount_in.is_zero() {
        return Ok(U256::zero());
    }
    let fee_factor = U512::from(BPS_DENOMINATOR.saturating_sub(fee_bps));
    let in_with_fee = U512::from(amount_in) * fee_factor;
    let numerator = in_with_fee * U512::from(reserve_out);
    let denominator = U512::from(reserve_in) * U512::from(BPS_DENOMINATOR) + in_with_fee;
    Ok(to_u256(numerator / denominator)?)
}

/// Constant-product input required for an exact output, fee in basis points.
///
/// `in = R_in * out * 10000 / ((R_out - out) * (10000 - fee)) + 1`
pub fn cp_amount_in(
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
    fee_bps: u32,
) -> Result<U256, HopError> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(HopError::ZeroLiquidity);
    }
    if amount_out.is_zero() {
        return Ok(U256::zero());
    }
    if amount_out >= reserve_out {
        return Err(HopError::InsufficientLiquidity);
    }
    let fee_factor = BPS_DENOMINATOR.saturating_sub(fee_bps);
    if fee_factor == 0 {
        return Err(MathError::DivisionByZero.into());
    }
    let numerator =
        U512::from(reserve_in) * U512::from(amount_out) * U512::from(BPS_DENOMINATOR);
    let denominator = U512::from(reserve_out - amount_out) * U512::from(fee_factor);
    let amount_in = to_u256(numerator / denominator)?;
    amount_in
        .checked_add(U256::one())
        .ok_or_else(|| MathError::Overflow.into())
}

/// Reserves and decimals of one Solidly pair, already oriented for a swap direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidlyReserves {
    pub reserve_in: U256,
    pub reserve_out: U256,
    /// `10^decimals` of the input token.
    pub dec_in: U256,
    pub dec_out: U256,
    pub stable: bool,
    pub fee_bps: u32,
}

impl SolidlyReserves {
    fn check_liquidity(&self) -> Result<(), HopError> {
        if self.fee_bps > BPS_DENOMINATOR {
            return Err(MathError::InvalidFee(self.fee_bps).into());
        }
        if self.reserve_in.is_zero() || self.reserve_out.is_zero() {
            return Err(HopError::ZeroLiquidity);
        }
        if self.dec_in.is_zero() || self.dec_out.is_zero() {
            return Err(MathError::DivisionByZero.into());
        }
        Ok(())
    }
}

// x^3*y + y^3*x over 1e18-normalized reserves
fn stable_k(x: U256, y: U256) -> Result<U256, MathError> {
    let a = div(mul(x, y)?, ONE)?;
    let b = div(mul(x, x)?, ONE)? + div(mul(y, y)?, ONE)?;
    div(mul(a, b)?, ONE)
}

fn stable_f(x0: U256, y: U256) -> Result<U256, MathError> {
    let y3 = div(mul(div(mul(y, y)?, ONE)?, y)?, ONE)?;
    let x3 = div(mul(div(mul(x0, x0)?, ONE)?, x0)?, ONE)?;
    let left = div(mul(x0, y3)?, ONE)?;
    let right = div(mul(x3, y)?, ONE)?;
    left.checked_add(right).ok_or(MathError::Overflow)
}

fn stable_d(x0: U256, y: U256) -> Result<U256, MathError> {
    let y2 = div(mul(y, y)?, ONE)?;
    let x3 = div(mul(div(mul(x0, x0)?, ONE)?, x0)?, ONE)?;
    let left = div(mul(mul(U256::from(3u8), x0)?, y2)?, ONE)?;
    left.checked_add(x3).ok_or(MathError::Overflow)
}

/// Newton iteration for the `y` that keeps `f(x0, y) == xy`.
fn stable_get_y(x0: U256, xy: U256, mut y: U256) -> Result<U256, MathError> {
    for _ in 0..STABLE_MAX_ITERATIONS {
        let k = stable_f(x0, y)?;
        let d = stable_d(x0, y)?;
        if k < xy {
            let mut dy = div(mul(xy - k, ONE)?, d)?;
            if dy.is_zero() {
                if k == xy {
                    return Ok(y);
                }
                if stable_k(x0, y + 1)? > xy {
                    return Ok(y + 1);
                }
                dy = U256::one();
            }
            y = y.checked_add(dy).ok_or(MathError::Overflow)?;
        } else {
            let mut dy = div(mul(k - xy, ONE)?, d)?;
            if dy.is_zero() {
                if k == xy || stable_f(x0, y.saturating_sub(U256::one()))? < xy {
                    return Ok(y);
                }
                dy = U256::one();
            }
            y = y.checked_sub(dy).ok_or(MathError::Overflow)?;
        }
    }
    Err(MathError::NoConvergence)
}

/// Solidly pair output for an exact input. The fee is taken from the input first.
pub fn solidly_amount_out(amount_in: U256, pool: &SolidlyReserves) -> Result<U256, HopError> {
    pool.check_liquidity()?;
    if amount_in.is_zero() {
        return Ok(U256::zero());
    }
    let fee = mul(amount_in, U256::from(pool.fee_bps))? / U256::from(BPS_DENOMINATOR);
    let amount_in = amount_in.checked_sub(fee).ok_or(MathError::InvalidFee(pool.fee_bps))?;

    if !pool.stable {
        let numerator = U512::from(amount_in) * U512::from(pool.reserve_out);
        let denominator = U512::from(pool.reserve_in) + U512::from(amount_in);
        return Ok(to_u256(numerator / denominator)?);
    }

    let x = div(mul(pool.reserve_in, ONE)?, pool.dec_in)?;
    let y = div(mul(pool.reserve_out, ONE)?, pool.dec_out)?;
    let xy = stable_k(x, y)?;
    let normalized_in = div(mul(amount_in, ONE)?, pool.dec_in)?;
    let x0 = x.checked_add(normalized_in).ok_or(MathError::Overflow)?;
    let new_y = stable_get_y(x0, xy, y)?;
    let dy = y.saturating_sub(new_y);
    Ok(div(mul(dy, pool.dec_out)?, ONE)?)
}

/// Smallest input whose [`solidly_amount_out`] reaches `amount_out`.
///
/// Volatile pairs use the closed form (then step up past fee rounding); stable pairs have
/// no closed form and are searched by bisection.
pub fn solidly_amount_in(amount_out: U256, pool: &SolidlyReserves) -> Result<U256, HopError> {
    pool.check_liquidity()?;
    if amount_out.is_zero() {
        return Ok(U256::zero());
    }
    if amount_out >= pool.reserve_out {
        return Err(HopError::InsufficientLiquidity);
    }

    let fee_factor = BPS_DENOMINATOR.saturating_sub(pool.fee_bps);
    if fee_factor == 0 {
        return Err(MathError::DivisionByZero.into());
    }

    if !pool.stable {
        // smallest post-fee input, rounded up
        let numerator = U512::from(pool.reserve_in) * U512::from(amount_out);
        let denominator = U512::from(pool.reserve_out - amount_out);
        let net = to_u256((numerator + denominator - 1) / denominator)?;
        // lower bound on the gross input; the fee's floor division decides the last unit
        let mut amount_in = to_u256(
            U512::from(net - 1) * U512::from(BPS_DENOMINATOR) / U512::from(fee_factor),
        )?;
        for _ in 0..4 {
            if solidly_amount_out(amount_in, pool)? >= amount_out {
                return Ok(amount_in);
            }
            amount_in = amount_in.checked_add(U256::one()).ok_or(MathError::Overflow)?;
        }
        return Err(MathError::NoConvergence.into());
    }

    // seed at the output converted to input units; grow, then bisect for the smallest
    // sufficient input. An overflowing trial counts as "too large".
    let reaches = |amount: U256| -> Result<Option<bool>, HopError> {
        match solidly_amount_out(amount, pool) {
            Ok(out) => Ok(Some(out >= amount_out)),
            Err(HopError::Math(MathError::Overflow)) => Ok(None),
            Err(e) => Err(e),
        }
    };
    let seed = U512::from(amount_out) * U512::from(pool.dec_in) / U512::from(pool.dec_out);
    let mut lo = U256::zero();
    let mut hi = to_u256(seed)?.saturating_add(U256::one());
    loop {
        match reaches(hi)? {
            Some(true) | None => break,
            Some(false) => {
                lo = hi;
                hi = hi.checked_mul(U256::from(2u8)).ok_or(HopError::InsufficientLiquidity)?;
            }
        }
    }
    while hi - lo > U256::one() {
        let mid = lo + (hi - lo) / 2;
        match reaches(mid)? {
            Some(true) | None => hi = mid,
            Some(false) => lo = mid,
        }
    }
    match reaches(hi)? {
        Some(true) => Ok(hi),
        _ => Err(HopError::InsufficientLiquidity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e18(n: u64) -> U256 {
        U256::from(n) * ONE
    }

    fn e6(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000u64)
    }

    #[test]
    fn test_cp_amount_out_matches_formula() {
        // 1 token into a 100/200 pool at 30 bps
        let out = cp_amount_out(e18(1), e18(100), e18(200), 30).unwrap();
        let expected = U256::from_dec_str("1974316068794122597").unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_cp_amount_in_covers_output() {
        let (rin, rout) = (e18(1_000), e6(2_000_000));
        let want = e6(1_500);
        let amount_in = cp_amount_in(want, rin, rout, 30).unwrap();
        assert!(cp_amount_out(amount_in, rin, rout, 30).unwrap() >= want);
        assert!(cp_amount_out(amount_in - 2, rin, rout, 30).unwrap() < want);
    }

    #[test]
    fn test_cp_limits() {
        assert_eq!(
            cp_amount_out(e18(1), U256::zero(), e18(1), 30).unwrap_err(),
            HopError::ZeroLiquidity
        );
        assert_eq!(
            cp_amount_in(e18(5), e18(10), e18(5), 30).unwrap_err(),
            HopError::InsufficientLiquidity
        );
    }

    fn stable_pool() -> SolidlyReserves {
        SolidlyReserves {
            reserve_in: e6(10_000_000),
            reserve_out: e18(10_000_000),
            dec_in: U256::from(1_000_000u64),
            dec_out: ONE,
            stable: true,
            fee_bps: 5,
        }
    }

    #[test]
    fn test_stable_curve_is_flat_near_peg() {
        let out = solidly_amount_out(e6(1_000), &stable_pool()).unwrap();
        // 1000 in, 0.05% fee, almost no slippage on a 10M/10M stable pool
        assert!(out < e18(1_000));
        assert!(out > e18(999) * 99 / 100);
    }

    #[test]
    fn test_volatile_round_trip_bounds() {
        let pool = SolidlyReserves {
            stable: false,
            fee_bps: 30,
            ..stable_pool()
        };
        let want = e18(500);
        let amount_in = solidly_amount_in(want, &pool).unwrap();
        assert!(solidly_amount_out(amount_in, &pool).unwrap() >= want);
        assert!(solidly_amount_out(amount_in - 1, &pool).unwrap() < want);
    }

    #[test]
    fn test_stable_reverse_across_decimals() {
        let want = e18(2_500);
        for (dec_in, dec_out) in [(6u32, 18u32), (18, 18), (18, 6)] {
            let pool = SolidlyReserves {
                reserve_in: U256::from(10_000_000u64) * U256::exp10(dec_in as usize),
                reserve_out: U256::from(10_000_000u64) * U256::exp10(dec_out as usize),
                dec_in: U256::exp10(dec_in as usize),
                dec_out: U256::exp10(dec_out as usize),
                stable: true,
                fee_bps: 5,
            };
            let want = want * U256::exp10(dec_out as usize) / ONE;
            let amount_in = solidly_amount_in(want, &pool)
                .unwrap_or_else(|e| panic!("{}/{} decimals: {}", dec_in, dec_out, e));
            assert!(solidly_amount_out(amount_in, &pool).unwrap() >= want);
            assert!(solidly_amount_out(amount_in - 1, &pool).unwrap() < want);
        }
    }

    #[test]
    fn test_fee_above_denominator_is_rejected() {
        let pool = SolidlyReserves {
            fee_bps: 20_000,
            ..stable_pool()
        };
        assert_eq!(
            solidly_amount_out(e6(1_000), &pool).unwrap_err(),
            HopError::Math(MathError::InvalidFee(20_000))
        );
        let volatile = SolidlyReserves { stable: false, ..pool };
        assert!(solidly_amount_in(e18(1), &volatile).is_err());
    }

    #[test]
    fn test_stable_reverse_is_minimal() {
        let pool = stable_pool();
        let want = e18(2_500);
        let amount_in = solidly_amount_in(want, &pool).unwrap();
        assert!(solidly_amount_out(amount_in, &pool).unwrap() >= want);
        assert!(solidly_amount_out(amount_in - 1, &pool).unwrap() < want);
    }
}
