//! # Best-Route Selector
//!
//! Reduces a request's quotes to one [`RoutingResult`]. Forward requests maximise output,
//! reverse requests minimise input. Equal amounts are broken by fewer hops, then registry
//! precedence (the wrapped-native contract first), then enumeration order, so the result
//! does not depend on the order in which concurrent evaluations completed.

use std::cmp::Ordering;

use crate::error::RouteError;
use crate::router::{Direction, PoolParams, Quote, RoutingResult};

/// `Ordering::Less` means `a` is the better quote.
fn compare(a: &Quote, b: &Quote) -> Ordering {
    let by_amount = match a.direction {
        Direction::Forward => b.amount_out.cmp(&a.amount_out),
        Direction::Reverse => a.amount_in.cmp(&b.amount_in),
    };
    by_amount
        .then_with(|| a.candidate.hops.len().cmp(&b.candidate.hops.len()))
        .then_with(|| a.candidate.precedence.cmp(&b.candidate.precedence))
        .then_with(|| a.index.cmp(&b.index))
}

/// Fee reported to the caller: the tier for a single concentrated-liquidity hop, the pair
/// fee in basis points for a single constant-product or dual-pool hop, nothing otherwise.
fn route_fee(quote: &Quote) -> Option<u32> {
    if quote.resolved.len() != 1 {
        return None;
    }
    match quote.resolved[0].params {
        PoolParams::FeeTier(fee) => Some(fee),
        PoolParams::Plain { fee_bps } => Some(fee_bps),
        PoolParams::Stable { fee_bps, .. } => Some(fee_bps),
        PoolParams::Wrap(_) => None,
    }
}

/// Picks the best successful quote. Failed quotes are never selected.
pub fn select(quotes: Vec<Quote>) -> Result<RoutingResult, RouteError> {
    let best = quotes
        .into_iter()
        .filter(|q| q.success && q.failure.is_none())
        .min_by(compare)
        .ok_or(RouteError::NoRoute)?;

    let fee = route_fee(&best);
    let deployment = &best.candidate.deployment;
    // the wrapped-native contract has no factory; `factory()` reports zero for it
    let (router, factory) = (deployment.router(), deployment.factory());

    Ok(RoutingResult {
        best_dex: best.candidate.dex(),
        direction: best.direction,
        router,
        factory,
        fee,
        token_in: best.candidate.token_in,
        token_out: best.candidate.token_out,
        amount_in: best.amount_in,
        amount_out: best.amount_out,
        route: best.resolved,
    })
}
