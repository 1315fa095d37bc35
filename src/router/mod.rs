//! # Router Module
//!
//! Routing primitives shared by the enumerator, evaluator, selector and path builder:
//! protocol tags, candidate routes, resolved hops, quotes and the final routing result.

use ethers::prelude::Address;
use ethers::types::U256;
use serde::{Deserialize, Serialize};

use crate::error::HopError;
use crate::registry::DexDeployment;
use crate::types::Token;

/// Protocol tag for a deployment. `Display` yields the tag consumers match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DexId {
    /// Native <-> wrapped-native deposit/withdraw, no pool involved.
    WrappedContract,
    #[default]
    UniswapV2,
    SushiSwapV2,
    QuickSwapV2,
    PancakeSwapV2,
    UniswapV3,
    PancakeSwapV3,
    Velodrome,
    Aerodrome,
}

impl std::fmt::Display for DexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DexId::WrappedContract => write!(f, "WrappedContract"),
            DexId::UniswapV2 => write!(f, "Uniswapv2"),
            DexId::SushiSwapV2 => write!(f, "Sushiswapv2"),
            DexId::QuickSwapV2 => write!(f, "Quickswapv2"),
            DexId::PancakeSwapV2 => write!(f, "Pancakeswapv2"),
            DexId::UniswapV3 => write!(f, "Uniswapv3"),
            DexId::PancakeSwapV3 => write!(f, "Pancakeswapv3"),
            DexId::Velodrome => write!(f, "Velodrome"),
            DexId::Aerodrome => write!(f, "Aerodrome"),
        }
    }
}

/// Whether the request fixes the input (`Forward`) or the output (`Reverse`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapAction {
    Deposit,
    Withdraw,
}

/// Pool parameters a candidate hop asks for, before any chain read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HopSpec {
    /// Constant-product pair, one pool per token pair.
    Plain,
    /// Concentrated-liquidity pool at a specific fee tier.
    FeeTier(u32),
    /// Stable/volatile dual-pool pair; the flag is resolved during evaluation.
    DualPool,
    Wrap(WrapAction),
}

/// One leg of a candidate, expressed over pool-level tokens (native already replaced by
/// the wrapped token).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateHop {
    pub token_in: Token,
    pub token_out: Token,
    pub spec: HopSpec,
}

/// A path the evaluator should price.
#[derive(Debug, Clone)]
pub struct RouteCandidate {
    pub deployment: DexDeployment,
    /// Position of the deployment in the chain's precedence order.
    pub precedence: usize,
    /// Request endpoints as the caller gave them (may be native).
    pub token_in: Token,
    pub token_out: Token,
    pub hops: Vec<CandidateHop>,
}

impl RouteCandidate {
    pub fn dex(&self) -> DexId {
        self.deployment.dex()
    }

    pub fn is_valid(&self) -> bool {
        !self.hops.is_empty()
            && self.hops.iter().all(|h| h.token_in != h.token_out)
            && self
                .hops
                .windows(2)
                .all(|w| w[0].token_out == w[1].token_in && w[0].token_in != w[1].token_out)
    }

    /// Identifier built from the protocol and hop parameters, used for dedup and logs.
    pub fn get_id(&self) -> String {
        let hops = self
            .hops
            .iter()
            .map(|h| match h.spec {
                HopSpec::Plain => format!("{}>{}", h.token_in.symbol, h.token_out.symbol),
                HopSpec::FeeTier(fee) => {
                    format!("{}>{}@{}", h.token_in.symbol, h.token_out.symbol, fee)
                }
                HopSpec::DualPool => format!("{}>{}~", h.token_in.symbol, h.token_out.symbol),
                HopSpec::Wrap(action) => format!("{:?}", action),
            })
            .collect::<Vec<_>>()
            .join("-");
        format!("{}:{}", self.dex(), hops)
    }
}

/// Concrete pool parameters once a hop has been priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolParams {
    Plain { fee_bps: u32 },
    FeeTier(u32),
    Stable { stable: bool, fee_bps: u32 },
    Wrap(WrapAction),
}

/// A priced hop: which pool executes it and with which parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedHop {
    pub token_in: Token,
    pub token_out: Token,
    pub pool: Address,
    pub params: PoolParams,
}

/// Outcome of evaluating one candidate. Failure is a value, not an error.
#[derive(Debug, Clone)]
pub struct Quote {
    /// Enumeration index, last-resort tie-break.
    pub index: usize,
    pub candidate: RouteCandidate,
    pub resolved: Vec<ResolvedHop>,
    pub direction: Direction,
    pub amount_in: U256,
    pub amount_out: U256,
    pub success: bool,
    pub failure: Option<HopError>,
}

impl Quote {
    pub fn failed(
        index: usize,
        candidate: RouteCandidate,
        direction: Direction,
        amount: U256,
        error: HopError,
    ) -> Self {
        let (amount_in, amount_out) = match direction {
            Direction::Forward => (amount, U256::zero()),
            Direction::Reverse => (U256::zero(), amount),
        };
        Self {
            index,
            candidate,
            resolved: Vec::new(),
            direction,
            amount_in,
            amount_out,
            success: false,
            failure: Some(error),
        }
    }
}

/// The only value the engine hands back to the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingResult {
    pub best_dex: DexId,
    pub direction: Direction,
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: U256,
    pub amount_out: U256,
    pub route: Vec<ResolvedHop>,
    pub router: Address,
    pub factory: Address,
    pub fee: Option<u32>,
}

impl RoutingResult {
    /// `amount_out` for forward requests, `amount_in` for reverse ones.
    pub fn best_amount(&self) -> U256 {
        match self.direction {
            Direction::Forward => self.amount_out,
            Direction::Reverse => self.amount_in,
        }
    }

    pub fn hop_count(&self) -> usize {
        self.route.len()
    }
}

/// Lifecycle of a single routing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePhase {
    Enumerating,
    Evaluating,
    Selecting,
    Resolved,
    NoRoute,
    RegistryError,
}

impl std::fmt::Display for RoutePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RoutePhase::Enumerating => "enumerating",
            RoutePhase::Evaluating => "evaluating",
            RoutePhase::Selecting => "selecting",
            RoutePhase::Resolved => "resolved",
            RoutePhase::NoRoute => "no_route",
            RoutePhase::RegistryError => "registry_error",
        };
        f.write_str(s)
    }
}
