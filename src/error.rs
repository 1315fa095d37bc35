//! Error taxonomy.
//!
//! Only [`RouteError`] crosses the engine boundary. [`ReadError`] and [`HopError`] are
//! candidate-level: they fail a single quote and are logged, never surfaced to callers.

use ethers::types::Address;
use thiserror::Error;

/// Errors returned by the routing engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("chain {0} is not registered")]
    ChainNotRegistered(u64),
    #[error("token in and token out are the same token ({0:#x})")]
    InvalidTokenPair(Address),
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("token {token:#x} belongs to chain {token_chain}, request is for chain {chain_id}")]
    ChainMismatch {
        chain_id: u64,
        token: Address,
        token_chain: u64,
    },
    #[error("no route/liquidity available")]
    NoRoute,
}

/// Invalid registry data, detected when a registry is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("chain {chain_id}: {field} is the zero address")]
    ZeroAddress { chain_id: u64, field: String },
    #[error("chain {0}: bridge token list is empty")]
    NoBridgeTokens(u64),
    #[error("chain {0}: no constant-product deployment")]
    NoConstantProduct(u64),
    #[error("chain {0}: more than one dual-pool deployment")]
    MultipleDualPool(u64),
    #[error("chain {chain_id}: {dex} has no fee tiers")]
    NoFeeTiers { chain_id: u64, dex: String },
    #[error("chain {0}: wrapped token must not be the native sentinel")]
    WrappedIsNative(u64),
    #[error("chain {0} registered twice")]
    Duplicate(u64),
}

/// A single read-only chain call that did not produce a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("call reverted: {0}")]
    Reverted(String),
    #[error("call timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

impl ReadError {
    /// Only a revert is a definite answer from the chain; the rest say nothing about the pool.
    pub fn is_definite(&self) -> bool {
        matches!(self, ReadError::Reverted(_))
    }
}

/// Why a hop (and therefore its whole candidate) could not be priced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HopError {
    #[error("pool absent")]
    PoolAbsent,
    #[error("pool has no liquidity")]
    ZeroLiquidity,
    #[error("insufficient liquidity for requested amount")]
    InsufficientLiquidity,
    #[error("chain read failed: {0}")]
    Read(#[from] ReadError),
    #[error("math error: {0}")]
    Math(#[from] MathError),
}

impl HopError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            HopError::PoolAbsent => "pool_absent",
            HopError::ZeroLiquidity => "zero_liquidity",
            HopError::InsufficientLiquidity => "insufficient_liquidity",
            HopError::Read(ReadError::Timeout) => "timeout",
            HopError::Read(ReadError::Reverted(_)) => "reverted",
            HopError::Read(ReadError::Transport(_)) => "transport",
            HopError::Math(_) => "math",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("stable curve did not converge")]
    NoConvergence,
    #[error("fee of {0} bps exceeds 100%")]
    InvalidFee(u32),
}

/// A routing result that cannot be turned into a call route.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TxPathError {
    #[error("routing result has no hops")]
    EmptyRoute,
    #[error("routing result mixes pool families")]
    MixedRoute,
}
