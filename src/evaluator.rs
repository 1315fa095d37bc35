//! # Quote Evaluator
//!
//! Prices one candidate route for a fixed input (forward) or a fixed output (reverse).
//! Forward walks the hops in order, reverse walks them backwards, each hop feeding the
//! next. Any hop failure turns the whole candidate into a failed [`Quote`]; failures are
//! values here, never errors, so one dead pool cannot abort a request.
//!
//! [`evaluate_all`] fans candidates out with `buffer_unordered` and waits for every one of
//! them to settle before returning.

use ethers::types::U256;
use futures::stream::{self, StreamExt};

use crate::amm_math::{self, SolidlyReserves};
use crate::error::{HopError, MathError, ReadError};
use crate::metrics;
use crate::prober::{PoolHandle, PoolProber, ProbeParams};
use crate::registry::DexDeployment;
use crate::router::{
    CandidateHop, Direction, HopSpec, PoolParams, Quote, ResolvedHop, RouteCandidate,
};
use crate::types::conversions::rescale_decimals;

/// Amount on the other side of one hop, plus the pool that produced it.
struct HopQuote {
    resolved: ResolvedHop,
    amount: U256,
}

fn absent(probe: Result<Option<PoolHandle>, ReadError>) -> Result<PoolHandle, HopError> {
    probe?.ok_or(HopError::PoolAbsent)
}

async fn quote_hop(
    deployment: &DexDeployment,
    hop: &CandidateHop,
    amount: U256,
    direction: Direction,
    prober: &PoolProber,
) -> Result<HopQuote, HopError> {
    let (token_in, token_out) = (hop.token_in.address, hop.token_out.address);
    let resolved = |pool, params| ResolvedHop {
        token_in: hop.token_in.clone(),
        token_out: hop.token_out.clone(),
        pool,
        params,
    };

    match (deployment, hop.spec) {
        (DexDeployment::Wrapped { contract }, HopSpec::Wrap(action)) => {
            let (from, to) = match direction {
                Direction::Forward => (hop.token_in.decimals, hop.token_out.decimals),
                Direction::Reverse => (hop.token_out.decimals, hop.token_in.decimals),
            };
            let amount = rescale_decimals(amount, from, to).map_err(|_| MathError::Overflow)?;
            Ok(HopQuote {
                resolved: resolved(*contract, PoolParams::Wrap(action)),
                amount,
            })
        }

        (DexDeployment::ConstantProduct(_), HopSpec::Plain) => {
            let handle = absent(prober.probe(deployment, token_in, token_out, ProbeParams::Plain).await)?;
            let PoolHandle::ConstantProduct { pair, token0, reserves, fee_bps } = handle else {
                return Err(HopError::PoolAbsent);
            };
            let (reserve_in, reserve_out) = if token_in == token0 {
                (reserves.reserve0, reserves.reserve1)
            } else {
                (reserves.reserve1, reserves.reserve0)
            };
            let amount = match direction {
                Direction::Forward => amm_math::cp_amount_out(amount, reserve_in, reserve_out, fee_bps)?,
                Direction::Reverse => amm_math::cp_amount_in(amount, reserve_in, reserve_out, fee_bps)?,
            };
            Ok(HopQuote {
                resolved: resolved(pair, PoolParams::Plain { fee_bps }),
                amount,
            })
        }

        (DexDeployment::Concentrated(dex), HopSpec::FeeTier(fee)) => {
            let handle = absent(prober.probe(deployment, token_in, token_out, ProbeParams::FeeTier(fee)).await)?;
            let amount = match direction {
                Direction::Forward => {
                    prober.quote_exact_input(dex.quoter, token_in, token_out, fee, amount).await?
                }
                Direction::Reverse => {
                    prober.quote_exact_output(dex.quoter, token_in, token_out, fee, amount).await?
                }
            };
            Ok(HopQuote {
                resolved: resolved(handle.address(), PoolParams::FeeTier(fee)),
                amount,
            })
        }

        (DexDeployment::DualPool(_), HopSpec::DualPool) => {
            let (volatile, stable) = futures::join!(
                prober.probe(deployment, token_in, token_out, ProbeParams::Stable(false)),
                prober.probe(deployment, token_in, token_out, ProbeParams::Stable(true)),
            );

            let mut best: Option<HopQuote> = None;
            let mut last_error = HopError::PoolAbsent;
            for probe in [volatile, stable] {
                let handle = match absent(probe) {
                    Ok(h) => h,
                    Err(e) => {
                        if e != HopError::PoolAbsent {
                            last_error = e;
                        }
                        continue;
                    }
                };
                let PoolHandle::DualPool { pair, stable, fee_bps, metadata } = handle else {
                    continue;
                };
                let forward_side = token_in == metadata.token0;
                let reserves = SolidlyReserves {
                    reserve_in: if forward_side { metadata.reserve0 } else { metadata.reserve1 },
                    reserve_out: if forward_side { metadata.reserve1 } else { metadata.reserve0 },
                    dec_in: if forward_side { metadata.dec0 } else { metadata.dec1 },
                    dec_out: if forward_side { metadata.dec1 } else { metadata.dec0 },
                    stable,
                    fee_bps,
                };
                let priced = match direction {
                    Direction::Forward => amm_math::solidly_amount_out(amount, &reserves),
                    Direction::Reverse => amm_math::solidly_amount_in(amount, &reserves),
                };
                let amount = match priced {
                    Ok(a) => a,
                    Err(e) => {
                        last_error = e;
                        continue;
                    }
                };
                let better = match (&best, direction) {
                    (None, _) => true,
                    (Some(b), Direction::Forward) => amount > b.amount,
                    (Some(b), Direction::Reverse) => amount < b.amount,
                };
                if better {
                    best = Some(HopQuote {
                        resolved: resolved(pair, PoolParams::Stable { stable, fee_bps }),
                        amount,
                    });
                }
            }
            best.ok_or(last_error)
        }

        _ => Err(HopError::PoolAbsent),
    }
}

async fn walk(
    candidate: &RouteCandidate,
    amount: U256,
    direction: Direction,
    prober: &PoolProber,
) -> Result<(Vec<ResolvedHop>, U256), HopError> {
    let mut resolved = Vec::with_capacity(candidate.hops.len());
    let mut current = amount;

    let hops: Vec<&CandidateHop> = match direction {
        Direction::Forward => candidate.hops.iter().collect(),
        Direction::Reverse => candidate.hops.iter().rev().collect(),
    };
    for hop in hops {
        let quote = quote_hop(&candidate.deployment, hop, current, direction, prober).await?;
        if quote.amount.is_zero() {
            return Err(HopError::InsufficientLiquidity);
        }
        current = quote.amount;
        resolved.push(quote.resolved);
    }
    if direction == Direction::Reverse {
        resolved.reverse();
    }
    Ok((resolved, current))
}

/// Prices one candidate. `index` is the candidate's enumeration position.
pub async fn evaluate(
    index: usize,
    candidate: RouteCandidate,
    amount: U256,
    direction: Direction,
    prober: &PoolProber,
) -> Quote {
    match walk(&candidate, amount, direction, prober).await {
        Ok((resolved, result)) => {
            let (amount_in, amount_out) = match direction {
                Direction::Forward => (amount, result),
                Direction::Reverse => (result, amount),
            };
            Quote {
                index,
                candidate,
                resolved,
                direction,
                amount_in,
                amount_out,
                success: true,
                failure: None,
            }
        }
        Err(error) => {
            log::debug!("Candidate {} failed: {}", candidate.get_id(), error);
            metrics::increment_quote_failure(&candidate.dex().to_string(), error.kind());
            Quote::failed(index, candidate, direction, amount, error)
        }
    }
}

/// Evaluates every candidate with at most `max_concurrency` in flight. Returns one quote
/// per candidate, in completion order.
pub async fn evaluate_all(
    candidates: Vec<RouteCandidate>,
    amount: U256,
    direction: Direction,
    prober: &PoolProber,
    max_concurrency: usize,
) -> Vec<Quote> {
    stream::iter(candidates.into_iter().enumerate())
        .map(|(index, candidate)| evaluate(index, candidate, amount, direction, prober))
        .buffer_unordered(max_concurrency.max(1))
        .collect()
        .await
}
