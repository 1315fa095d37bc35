//! # Chain Reader
//!
//! The single seam between the routing engine and the blockchain. Every value the engine
//! needs (pair addresses, reserves, quoter results, dual-pool metadata) comes through the
//! [`ChainReader`] trait, so the engine can run against a live node
//! ([`EthersChainReader`]) or an in-memory snapshot ([`crate::snapshot::InMemoryChain`]).
//!
//! ## Conventions
//!
//! - All calls are read-only.
//! - An absent pool is reported as `Ok(Address::zero())` by the `get_*` lookups, the same
//!   way the factories themselves answer.
//! - Timeouts are not applied here; the prober wraps each call in `tokio::time::timeout`.

use async_trait::async_trait;
use ethers::contract::ContractError;
use ethers::prelude::*;
use std::sync::Arc;

use crate::contracts::{
    IUniswapV2Factory, IUniswapV2Pair, IUniswapV3Factory, IUniswapV3Pool, ISolidlyFactory,
    ISolidlyPair, QuoteExactInputSingleParams, QuoteExactOutputSingleParams, QuoterV2,
};
use crate::error::ReadError;

/// Reserves of a constant-product pair, in token0/token1 order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairReserves {
    pub reserve0: U256,
    pub reserve1: U256,
}

/// Result of a Solidly pair's `metadata()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualPairMetadata {
    /// 10^decimals of token0, as the pair reports it.
    pub dec0: U256,
    pub dec1: U256,
    pub reserve0: U256,
    pub reserve1: U256,
    pub stable: bool,
    pub token0: Address,
    pub token1: Address,
}

/// Orders two addresses the way pair contracts do.
pub fn sort_tokens(a: Address, b: Address) -> (Address, Address) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Read-only access to the on-chain state the engine prices against.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the evaluator issues calls for many candidates
/// concurrently through a shared `Arc<dyn ChainReader>`.
///
/// # Errors
///
/// A call that reverts is `ReadError::Reverted` and counts as a definite answer (for the
/// quoter, it means the pool cannot serve the amount). Transport failures say nothing about
/// the pool and are never cached.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `IUniswapV2Factory.getPair`. Zero address when no pair exists.
    async fn get_pair(&self, factory: Address, a: Address, b: Address) -> Result<Address, ReadError>;

    /// `IUniswapV2Pair.getReserves`.
    async fn get_reserves(&self, pair: Address) -> Result<PairReserves, ReadError>;

    /// `IUniswapV3Factory.getPool`. Zero address when the tier has no pool.
    async fn get_pool(
        &self,
        factory: Address,
        a: Address,
        b: Address,
        fee: u32,
    ) -> Result<Address, ReadError>;

    /// In-range liquidity of a concentrated pool.
    async fn pool_liquidity(&self, pool: Address) -> Result<u128, ReadError>;

    /// `QuoterV2.quoteExactInputSingle`, returning the output amount.
    async fn quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> Result<U256, ReadError>;

    /// `QuoterV2.quoteExactOutputSingle`, returning the required input amount.
    async fn quote_exact_output_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_out: U256,
    ) -> Result<U256, ReadError>;

    /// Solidly factory `getPair(a, b, stable)`. Zero address when absent.
    async fn get_dual_pair(
        &self,
        factory: Address,
        a: Address,
        b: Address,
        stable: bool,
    ) -> Result<Address, ReadError>;

    async fn dual_pair_metadata(&self, pair: Address) -> Result<DualPairMetadata, ReadError>;

    /// Solidly factory `getFee(pool, stable)` in basis points.
    async fn dual_pair_fee(
        &self,
        factory: Address,
        pair: Address,
        stable: bool,
    ) -> Result<u32, ReadError>;
}

fn classify<M: Middleware>(err: ContractError<M>) -> ReadError {
    if err.is_revert() {
        return ReadError::Reverted(err.to_string());
    }
    let msg = err.to_string();
    // nodes report reverted eth_calls as JSON-RPC errors rather than revert data
    if msg.to_lowercase().contains("revert") {
        ReadError::Reverted(msg)
    } else {
        ReadError::Transport(msg)
    }
}

/// [`ChainReader`] backed by an ethers middleware (usually `Provider<Http>`).
pub struct EthersChainReader<M> {
    provider: Arc<M>,
}

impl<M: Middleware + 'static> EthersChainReader<M> {
    pub fn new(provider: Arc<M>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> Arc<M> {
        Arc::clone(&self.provider)
    }
}

impl EthersChainReader<Provider<Http>> {
    /// Reader over a plain HTTP JSON-RPC endpoint.
    pub fn from_http(url: &str) -> anyhow::Result<Self> {
        let provider = Provider::<Http>::try_from(url)?;
        Ok(Self::new(Arc::new(provider)))
    }
}

#[async_trait]
impl<M: Middleware + 'static> ChainReader for EthersChainReader<M> {
    async fn get_pair(&self, factory: Address, a: Address, b: Address) -> Result<Address, ReadError> {
        IUniswapV2Factory::new(factory, self.provider())
            .get_pair(a, b)
            .call()
            .await
            .map_err(classify)
    }

    async fn get_reserves(&self, pair: Address) -> Result<PairReserves, ReadError> {
        let (r0, r1, _) = IUniswapV2Pair::new(pair, self.provider())
            .get_reserves()
            .call()
            .await
            .map_err(classify)?;
        Ok(PairReserves {
            reserve0: U256::from(r0),
            reserve1: U256::from(r1),
        })
    }

    async fn get_pool(
        &self,
        factory: Address,
        a: Address,
        b: Address,
        fee: u32,
    ) -> Result<Address, ReadError> {
        IUniswapV3Factory::new(factory, self.provider())
            .get_pool(a, b, fee)
            .call()
            .await
            .map_err(classify)
    }

    async fn pool_liquidity(&self, pool: Address) -> Result<u128, ReadError> {
        IUniswapV3Pool::new(pool, self.provider())
            .liquidity()
            .call()
            .await
            .map_err(classify)
    }

    async fn quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> Result<U256, ReadError> {
        let params = QuoteExactInputSingleParams {
            token_in,
            token_out,
            amount_in,
            fee,
            sqrt_price_limit_x96: U256::zero(),
        };
        let (amount_out, _, _, _) = QuoterV2::new(quoter, self.provider())
            .quote_exact_input_single(params)
            .call()
            .await
            .map_err(classify)?;
        Ok(amount_out)
    }

    async fn quote_exact_output_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_out: U256,
    ) -> Result<U256, ReadError> {
        let params = QuoteExactOutputSingleParams {
            token_in,
            token_out,
            amount: amount_out,
            fee,
            sqrt_price_limit_x96: U256::zero(),
        };
        let (amount_in, _, _, _) = QuoterV2::new(quoter, self.provider())
            .quote_exact_output_single(params)
            .call()
            .await
            .map_err(classify)?;
        Ok(amount_in)
    }

    async fn get_dual_pair(
        &self,
        factory: Address,
        a: Address,
        b: Address,
        stable: bool,
    ) -> Result<Address, ReadError> {
        ISolidlyFactory::new(factory, self.provider())
            .get_pair(a, b, stable)
            .call()
            .await
            .map_err(classify)
    }

    async fn dual_pair_metadata(&self, pair: Address) -> Result<DualPairMetadata, ReadError> {
        let (dec0, dec1, reserve0, reserve1, stable, token0, token1) =
            ISolidlyPair::new(pair, self.provider())
                .metadata()
                .call()
                .await
                .map_err(classify)?;
        Ok(DualPairMetadata {
            dec0,
            dec1,
            reserve0,
            reserve1,
            stable,
            token0,
            token1,
        })
    }

    async fn dual_pair_fee(
        &self,
        factory: Address,
        pair: Address,
        stable: bool,
    ) -> Result<u32, ReadError> {
        let fee = ISolidlyFactory::new(factory, self.provider())
            .get_fee(pair, stable)
            .call()
            .await
            .map_err(classify)?;
        if fee > U256::from(10_000u32) {
            return Err(ReadError::Reverted(format!("fee {} out of range", fee)));
        }
        Ok(fee.as_u32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_tokens() {
        let a = Address::from_low_u64_be(2);
        let b = Address::from_low_u64_be(1);
        assert_eq!(sort_tokens(a, b), (b, a));
        assert_eq!(sort_tokens(b, a), (b, a));
    }
}
