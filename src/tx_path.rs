//! # Transaction Path Builder
//!
//! Turns a [`RoutingResult`] into what a wallet needs to prepare the swap: the token path
//! to show the user and a protocol-specific [`CallRoute`] carrying every argument of the
//! router call, slippage limit included. Nothing here reads the chain or signs anything.

use ethers::types::{Address, Bytes, U256, U512};
use serde::{Deserialize, Serialize};

use crate::amm_math::BPS_DENOMINATOR;
use crate::error::TxPathError;
use crate::router::{Direction, PoolParams, ResolvedHop, RoutingResult, WrapAction};
use crate::types::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapKind {
    ExactInput,
    ExactOutput,
}

impl From<Direction> for SwapKind {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => SwapKind::ExactInput,
            Direction::Reverse => SwapKind::ExactOutput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub recipient: Address,
    pub slippage_bps: u32,
}

/// One leg of a dual-pool router call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualPoolLeg {
    pub from: Address,
    pub to: Address,
    pub stable: bool,
    pub factory: Address,
}

/// Protocol-specific router call.
///
/// `amount` is the fixed side of the swap (input for exact-input, output for exact-output)
/// and `amount_limit` the slippage-protected bound on the other side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallRoute {
    ConstantProduct {
        router: Address,
        factory: Address,
        path: Vec<Address>,
        kind: SwapKind,
        native_in: bool,
        swap_to_native: bool,
        amount: U256,
        amount_limit: U256,
    },
    ConcentratedSingle {
        router: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        recipient: Address,
        kind: SwapKind,
        native_in: bool,
        swap_to_native: bool,
        amount: U256,
        amount_limit: U256,
        sqrt_price_limit_x96: U256,
    },
    ConcentratedMulti {
        router: Address,
        /// `token(20) fee(3) token(20) ...`, output-first for exact-output swaps.
        path: Bytes,
        recipient: Address,
        kind: SwapKind,
        native_in: bool,
        swap_to_native: bool,
        amount: U256,
        amount_limit: U256,
    },
    DualPool {
        router: Address,
        routes: Vec<DualPoolLeg>,
        kind: SwapKind,
        native_in: bool,
        swap_to_native: bool,
        amount: U256,
        amount_limit: U256,
    },
    Wrap {
        contract: Address,
        action: WrapAction,
        amount: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPath {
    /// Caller's input token (possibly native), intermediates, caller's output token.
    pub display_path: Vec<Token>,
    pub call_route: CallRoute,
}

/// Minimum output (forward) or maximum input (reverse, rounded up) under `slippage_bps`.
pub fn amount_limit(result: &RoutingResult, slippage_bps: u32) -> U256 {
    let slippage = slippage_bps.min(BPS_DENOMINATOR);
    let denominator = U512::from(BPS_DENOMINATOR);
    let limit = match result.direction {
        Direction::Forward => {
            result.amount_out.full_mul(U256::from(BPS_DENOMINATOR - slippage)) / denominator
        }
        Direction::Reverse => {
            let numerator = result.amount_in.full_mul(U256::from(BPS_DENOMINATOR + slippage));
            let (quotient, remainder) = numerator.div_mod(denominator);
            if remainder.is_zero() {
                quotient
            } else {
                quotient + 1
            }
        }
    };
    U256::try_from(limit).unwrap_or(U256::MAX)
}

/// Packed concentrated-liquidity path. Exact-output paths start at the output token.
pub fn encode_packed_path(hops: &[ResolvedHop], kind: SwapKind) -> Result<Bytes, TxPathError> {
    let first = hops.first().ok_or(TxPathError::EmptyRoute)?;
    let mut legs: Vec<(Address, u32, Address)> = Vec::with_capacity(hops.len());
    for hop in hops {
        let PoolParams::FeeTier(fee) = hop.params else {
            return Err(TxPathError::MixedRoute);
        };
        legs.push((hop.token_in.address, fee, hop.token_out.address));
    }

    let mut encoded = Vec::with_capacity(20 + legs.len() * 23);
    match kind {
        SwapKind::ExactInput => {
            encoded.extend_from_slice(first.token_in.address.as_bytes());
            for (_, fee, token_out) in &legs {
                // fee is a uint24
                encoded.extend_from_slice(&fee.to_be_bytes()[1..]);
                encoded.extend_from_slice(token_out.as_bytes());
            }
        }
        SwapKind::ExactOutput => {
            let last = legs.last().map(|l| l.2).unwrap_or(first.token_out.address);
            encoded.extend_from_slice(last.as_bytes());
            for (token_in, fee, _) in legs.iter().rev() {
                encoded.extend_from_slice(&fee.to_be_bytes()[1..]);
                encoded.extend_from_slice(token_in.as_bytes());
            }
        }
    }
    Ok(Bytes::from(encoded))
}

fn display_path(result: &RoutingResult) -> Vec<Token> {
    let mut path = vec![result.token_in.clone()];
    if result.route.len() > 1 {
        path.extend(result.route[..result.route.len() - 1].iter().map(|h| h.token_out.clone()));
    }
    path.push(result.token_out.clone());
    path
}

/// Builds the display path and router call for `result`.
pub fn build(result: &RoutingResult, options: &BuildOptions) -> Result<TransactionPath, TxPathError> {
    let first = result.route.first().ok_or(TxPathError::EmptyRoute)?;
    let same_family = result
        .route
        .iter()
        .all(|h| std::mem::discriminant(&h.params) == std::mem::discriminant(&first.params));
    if !same_family {
        return Err(TxPathError::MixedRoute);
    }

    let kind = SwapKind::from(result.direction);
    let native_in = result.token_in.is_native();
    let swap_to_native = result.token_out.is_native();
    let amount = match result.direction {
        Direction::Forward => result.amount_in,
        Direction::Reverse => result.amount_out,
    };
    let amount_limit = amount_limit(result, options.slippage_bps);

    let call_route = match first.params {
        PoolParams::Wrap(action) => CallRoute::Wrap {
            contract: result.router,
            action,
            amount: result.amount_in,
        },
        PoolParams::Plain { .. } => {
            let mut path = vec![first.token_in.address];
            path.extend(result.route.iter().map(|h| h.token_out.address));
            CallRoute::ConstantProduct {
                router: result.router,
                factory: result.factory,
                path,
                kind,
                native_in,
                swap_to_native,
                amount,
                amount_limit,
            }
        }
        PoolParams::FeeTier(fee) if result.route.len() == 1 => CallRoute::ConcentratedSingle {
            router: result.router,
            token_in: first.token_in.address,
            token_out: first.token_out.address,
            fee,
            recipient: options.recipient,
            kind,
            native_in,
            swap_to_native,
            amount,
            amount_limit,
            sqrt_price_limit_x96: U256::zero(),
        },
        PoolParams::FeeTier(_) => CallRoute::ConcentratedMulti {
            router: result.router,
            path: encode_packed_path(&result.route, kind)?,
            recipient: options.recipient,
            kind,
            native_in,
            swap_to_native,
            amount,
            amount_limit,
        },
        PoolParams::Stable { .. } => {
            let routes = result
                .route
                .iter()
                .map(|h| DualPoolLeg {
                    from: h.token_in.address,
                    to: h.token_out.address,
                    stable: matches!(h.params, PoolParams::Stable { stable: true, .. }),
                    factory: result.factory,
                })
                .collect();
            CallRoute::DualPool {
                router: result.router,
                routes,
                kind,
                native_in,
                swap_to_native,
                amount,
                amount_limit,
            }
        }
    };

    Ok(TransactionPath {
        display_path: display_path(result),
        call_route,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::DexId;

    fn tok(n: u64) -> Token {
        Token::new(1, Address::from_low_u64_be(n), 18, format!("T{}", n))
    }

    fn hop(a: u64, b: u64, params: PoolParams) -> ResolvedHop {
        ResolvedHop {
            token_in: tok(a),
            token_out: tok(b),
            pool: Address::from_low_u64_be(1000 + a),
            params,
        }
    }

    fn result(route: Vec<ResolvedHop>, direction: Direction) -> RoutingResult {
        RoutingResult {
            best_dex: DexId::UniswapV3,
            direction,
            token_in: route[0].token_in.clone(),
            token_out: route[route.len() - 1].token_out.clone(),
            amount_in: U256::from(10_000),
            amount_out: U256::from(20_000),
            route,
            router: Address::from_low_u64_be(7),
            factory: Address::from_low_u64_be(8),
            fee: None,
        }
    }

    fn options() -> BuildOptions {
        BuildOptions {
            recipient: Address::from_low_u64_be(42),
            slippage_bps: 50,
        }
    }

    #[test]
    fn test_packed_path_layout() {
        let route = vec![hop(1, 2, PoolParams::FeeTier(500)), hop(2, 3, PoolParams::FeeTier(3000))];
        let forward = encode_packed_path(&route, SwapKind::ExactInput).unwrap();
        assert_eq!(forward.len(), 20 + 3 + 20 + 3 + 20);
        assert_eq!(&forward[0..20], tok(1).address.as_bytes());
        assert_eq!(&forward[20..23], &[0x00, 0x01, 0xf4]);
        assert_eq!(&forward[43..46], &[0x00, 0x0b, 0xb8]);
        assert_eq!(&forward[46..66], tok(3).address.as_bytes());

        let reverse = encode_packed_path(&route, SwapKind::ExactOutput).unwrap();
        assert_eq!(&reverse[0..20], tok(3).address.as_bytes());
        assert_eq!(&reverse[20..23], &[0x00, 0x0b, 0xb8]);
        assert_eq!(&reverse[46..66], tok(1).address.as_bytes());
    }

    #[test]
    fn test_slippage_limits() {
        let route = vec![hop(1, 2, PoolParams::Plain { fee_bps: 30 })];
        let forward = result(route.clone(), Direction::Forward);
        // 20000 * 9950 / 10000
        assert_eq!(amount_limit(&forward, 50), U256::from(19_900));

        let mut reverse = result(route, Direction::Reverse);
        reverse.amount_in = U256::from(10_001);
        // 10001 * 10050 / 10000 = 10051.005, rounded up
        assert_eq!(amount_limit(&reverse, 50), U256::from(10_052));
    }

    #[test]
    fn test_multi_hop_call_route() {
        let route = vec![hop(1, 2, PoolParams::FeeTier(500)), hop(2, 3, PoolParams::FeeTier(500))];
        let built = build(&result(route, Direction::Reverse), &options()).unwrap();
        assert_eq!(built.display_path, vec![tok(1), tok(2), tok(3)]);
        match built.call_route {
            CallRoute::ConcentratedMulti { kind, amount, path, recipient, .. } => {
                assert_eq!(kind, SwapKind::ExactOutput);
                assert_eq!(amount, U256::from(20_000));
                assert_eq!(&path[0..20], tok(3).address.as_bytes());
                assert_eq!(recipient, Address::from_low_u64_be(42));
            }
            other => panic!("unexpected call route {:?}", other),
        }
    }

    #[test]
    fn test_native_flags_and_single_hop() {
        let mut routing = result(vec![hop(1, 2, PoolParams::FeeTier(3000))], Direction::Forward);
        routing.token_in = Token::native(1, "ETH");
        let built = build(&routing, &options()).unwrap();
        assert!(built.display_path[0].is_native());
        match built.call_route {
            CallRoute::ConcentratedSingle { native_in, swap_to_native, sqrt_price_limit_x96, fee, .. } => {
                assert!(native_in);
                assert!(!swap_to_native);
                assert!(sqrt_price_limit_x96.is_zero());
                assert_eq!(fee, 3000);
            }
            other => panic!("unexpected call route {:?}", other),
        }
    }

    #[test]
    fn test_dual_pool_legs_and_mixed_routes() {
        let route = vec![
            hop(1, 2, PoolParams::Stable { stable: true, fee_bps: 5 }),
            hop(2, 3, PoolParams::Stable { stable: false, fee_bps: 30 }),
        ];
        let built = build(&result(route, Direction::Forward), &options()).unwrap();
        let CallRoute::DualPool { routes, .. } = built.call_route else {
            panic!("expected dual pool route");
        };
        assert_eq!(routes.iter().map(|r| r.stable).collect::<Vec<_>>(), vec![true, false]);
        assert!(routes.iter().all(|r| r.factory == Address::from_low_u64_be(8)));

        let mixed = vec![hop(1, 2, PoolParams::Plain { fee_bps: 30 }), hop(2, 3, PoolParams::FeeTier(500))];
        assert_eq!(build(&result(mixed, Direction::Forward), &options()).unwrap_err(), TxPathError::MixedRoute);
    }
}
