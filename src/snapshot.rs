//! # Snapshot Chain Reader
//!
//! [`InMemoryChain`] answers every [`ChainReader`] call from a fixed set of pool records.
//! It backs the offline mode of the `route_quote` binary (`--snapshot state.json`) and the
//! integration tests, which also use its fault injection (per-contract reverts and delays)
//! and call counter.
//!
//! Behavior mirrors the contracts: factories return the zero address for unknown pairs, the
//! quoter reverts for a missing pool or an amount the range cannot fill.

use async_trait::async_trait;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::chain_reader::{sort_tokens, ChainReader, DualPairMetadata, PairReserves};
use crate::error::ReadError;
use crate::v3_math::{self, V3PoolState};

/// A constant-product pair, reserves in token0/token1 order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRecord {
    pub factory: Address,
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcentratedRecord {
    pub factory: Address,
    pub quoter: Address,
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub sqrt_price_x96: U256,
    pub liquidity: u128,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DualPairRecord {
    pub factory: Address,
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub stable: bool,
    pub reserve0: U256,
    pub reserve1: U256,
    pub decimals0: u8,
    pub decimals1: u8,
    pub fee_bps: u32,
}

/// Serializable pool state for one chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub pairs: Vec<PairRecord>,
    #[serde(default)]
    pub concentrated: Vec<ConcentratedRecord>,
    #[serde(default)]
    pub dual_pairs: Vec<DualPairRecord>,
}

fn same_pair(t0: Address, t1: Address, a: Address, b: Address) -> bool {
    (t0, t1) == sort_tokens(a, b)
}

/// [`ChainReader`] over a [`Snapshot`].
#[derive(Debug, Default)]
pub struct InMemoryChain {
    snapshot: Snapshot,
    reverting: HashSet<Address>,
    delays: HashMap<Address, Duration>,
    next_address: u64,
    calls: AtomicUsize,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        log::info!(
            "Loaded snapshot {}: {} pairs, {} concentrated pools, {} dual pairs",
            path.as_ref().display(),
            snapshot.pairs.len(),
            snapshot.concentrated.len(),
            snapshot.dual_pairs.len()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn fresh_address(&mut self) -> Address {
        self.next_address += 1;
        Address::from_low_u64_be(0xa000_0000 + self.next_address)
    }

    /// Adds a constant-product pair; reserves are given in `(a, b)` order.
    pub fn add_pair(
        &mut self,
        factory: Address,
        a: Address,
        b: Address,
        reserve_a: U256,
        reserve_b: U256,
    ) -> Address {
        let address = self.fresh_address();
        let (token0, token1) = sort_tokens(a, b);
        let (reserve0, reserve1) = if token0 == a { (reserve_a, reserve_b) } else { (reserve_b, reserve_a) };
        self.snapshot.pairs.push(PairRecord {
            factory,
            address,
            token0,
            token1,
            reserve0,
            reserve1,
        });
        address
    }

    /// Adds a concentrated pool. `sqrt_price_x96` is token1/token0 as the pool stores it.
    #[allow(clippy::too_many_arguments)]
    pub fn add_concentrated_pool(
        &mut self,
        factory: Address,
        quoter: Address,
        a: Address,
        b: Address,
        fee: u32,
        sqrt_price_x96: U256,
        liquidity: u128,
    ) -> Address {
        let address = self.fresh_address();
        let (token0, token1) = sort_tokens(a, b);
        self.snapshot.concentrated.push(ConcentratedRecord {
            factory,
            quoter,
            address,
            token0,
            token1,
            fee,
            sqrt_price_x96,
            liquidity,
        });
        address
    }

    /// Adds one side (stable or volatile) of a dual-pool pair; reserves and decimals in
    /// `(a, b)` order.
    #[allow(clippy::too_many_arguments)]
    pub fn add_dual_pair(
        &mut self,
        factory: Address,
        a: Address,
        b: Address,
        stable: bool,
        (reserve_a, reserve_b): (U256, U256),
        (decimals_a, decimals_b): (u8, u8),
        fee_bps: u32,
    ) -> Address {
        let address = self.fresh_address();
        let (token0, token1) = sort_tokens(a, b);
        let flip = token0 != a;
        let (reserve0, reserve1) = if flip { (reserve_b, reserve_a) } else { (reserve_a, reserve_b) };
        let (decimals0, decimals1) = if flip { (decimals_b, decimals_a) } else { (decimals_a, decimals_b) };
        self.snapshot.dual_pairs.push(DualPairRecord {
            factory,
            address,
            token0,
            token1,
            stable,
            reserve0,
            reserve1,
            decimals0,
            decimals1,
            fee_bps,
        });
        address
    }

    /// Every call addressed to `contract` reverts.
    pub fn revert_on(&mut self, contract: Address) {
        self.reverting.insert(contract);
    }

    /// Every call addressed to `contract` waits `delay` before answering.
    pub fn delay_on(&mut self, contract: Address, delay: Duration) {
        self.delays.insert(contract, delay);
    }

    /// Number of calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    async fn enter(&self, contract: Address) -> Result<(), ReadError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Some(delay) = self.delays.get(&contract) {
            tokio::time::sleep(*delay).await;
        }
        if self.reverting.contains(&contract) {
            return Err(ReadError::Reverted(format!("forced revert at {:#x}", contract)));
        }
        Ok(())
    }

    fn concentrated_for_quote(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
    ) -> Result<(&ConcentratedRecord, bool), ReadError> {
        let pool = self
            .snapshot
            .concentrated
            .iter()
            .find(|p| p.quoter == quoter && p.fee == fee && same_pair(p.token0, p.token1, token_in, token_out))
            .ok_or_else(|| ReadError::Reverted("pool not found".to_string()))?;
        if self.reverting.contains(&pool.address) {
            return Err(ReadError::Reverted(format!("forced revert at {:#x}", pool.address)));
        }
        Ok((pool, v3_math::is_zero_for_one(token_in, pool.token0)))
    }
}

fn pool_state(p: &ConcentratedRecord) -> V3PoolState {
    V3PoolState {
        sqrt_price_x96: p.sqrt_price_x96,
        liquidity: p.liquidity,
        fee: p.fee,
    }
}

#[async_trait]
impl ChainReader for InMemoryChain {
    async fn get_pair(&self, factory: Address, a: Address, b: Address) -> Result<Address, ReadError> {
        self.enter(factory).await?;
        Ok(self
            .snapshot
            .pairs
            .iter()
            .find(|p| p.factory == factory && same_pair(p.token0, p.token1, a, b))
            .map(|p| p.address)
            .unwrap_or_else(Address::zero))
    }

    async fn get_reserves(&self, pair: Address) -> Result<PairReserves, ReadError> {
        self.enter(pair).await?;
        self.snapshot
            .pairs
            .iter()
            .find(|p| p.address == pair)
            .map(|p| PairReserves {
                reserve0: p.reserve0,
                reserve1: p.reserve1,
            })
            .ok_or_else(|| ReadError::Reverted("not a pair".to_string()))
    }

    async fn get_pool(
        &self,
        factory: Address,
        a: Address,
        b: Address,
        fee: u32,
    ) -> Result<Address, ReadError> {
        self.enter(factory).await?;
        Ok(self
            .snapshot
            .concentrated
            .iter()
            .find(|p| p.factory == factory && p.fee == fee && same_pair(p.token0, p.token1, a, b))
            .map(|p| p.address)
            .unwrap_or_else(Address::zero))
    }

    async fn pool_liquidity(&self, pool: Address) -> Result<u128, ReadError> {
        self.enter(pool).await?;
        self.snapshot
            .concentrated
            .iter()
            .find(|p| p.address == pool)
            .map(|p| p.liquidity)
            .ok_or_else(|| ReadError::Reverted("not a pool".to_string()))
    }

    async fn quote_exact_input_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> Result<U256, ReadError> {
        self.enter(quoter).await?;
        let (pool, zero_for_one) = self.concentrated_for_quote(quoter, token_in, token_out, fee)?;
        v3_math::swap_exact_input(&pool_state(pool), amount_in, zero_for_one)
            .map_err(|e| ReadError::Reverted(e.to_string()))
    }

    async fn quote_exact_output_single(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_out: U256,
    ) -> Result<U256, ReadError> {
        self.enter(quoter).await?;
        let (pool, zero_for_one) = self.concentrated_for_quote(quoter, token_in, token_out, fee)?;
        v3_math::swap_exact_output(&pool_state(pool), amount_out, zero_for_one)
            .map_err(|e| ReadError::Reverted(e.to_string()))
    }

    async fn get_dual_pair(
        &self,
        factory: Address,
        a: Address,
        b: Address,
        stable: bool,
    ) -> Result<Address, ReadError> {
        self.enter(factory).await?;
        Ok(self
            .snapshot
            .dual_pairs
            .iter()
            .find(|p| p.factory == factory && p.stable == stable && same_pair(p.token0, p.token1, a, b))
            .map(|p| p.address)
            .unwrap_or_else(Address::zero))
    }

    async fn dual_pair_metadata(&self, pair: Address) -> Result<DualPairMetadata, ReadError> {
        self.enter(pair).await?;
        self.snapshot
            .dual_pairs
            .iter()
            .find(|p| p.address == pair)
            .map(|p| DualPairMetadata {
                dec0: U256::exp10(p.decimals0 as usize),
                dec1: U256::exp10(p.decimals1 as usize),
                reserve0: p.reserve0,
                reserve1: p.reserve1,
                stable: p.stable,
                token0: p.token0,
                token1: p.token1,
            })
            .ok_or_else(|| ReadError::Reverted("not a pair".to_string()))
    }

    async fn dual_pair_fee(
        &self,
        factory: Address,
        pair: Address,
        _stable: bool,
    ) -> Result<u32, ReadError> {
        self.enter(factory).await?;
        self.snapshot
            .dual_pairs
            .iter()
            .find(|p| p.address == pair)
            .map(|p| p.fee_bps)
            .ok_or_else(|| ReadError::Reverted("not a pair".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    #[tokio::test]
    async fn test_pair_lookup_is_order_independent() {
        let mut chain = InMemoryChain::new();
        let factory = addr(1);
        let pair = chain.add_pair(factory, addr(20), addr(10), U256::from(5), U256::from(7));

        assert_eq!(chain.get_pair(factory, addr(10), addr(20)).await.unwrap(), pair);
        assert_eq!(chain.get_pair(factory, addr(20), addr(10)).await.unwrap(), pair);
        assert!(chain.get_pair(factory, addr(10), addr(30)).await.unwrap().is_zero());

        // token0 is addr(10), so its reserve comes first
        let reserves = chain.get_reserves(pair).await.unwrap();
        assert_eq!(reserves.reserve0, U256::from(7));
        assert_eq!(reserves.reserve1, U256::from(5));
        assert_eq!(chain.calls(), 4);
    }

    #[tokio::test]
    async fn test_quoter_reverts_without_pool() {
        let chain = InMemoryChain::new();
        let err = chain
            .quote_exact_input_single(addr(2), addr(10), addr(20), 500, U256::exp10(18))
            .await
            .unwrap_err();
        assert!(err.is_definite());
    }

    #[tokio::test]
    async fn test_forced_revert() {
        let mut chain = InMemoryChain::new();
        chain.revert_on(addr(1));
        assert!(matches!(
            chain.get_pair(addr(1), addr(10), addr(20)).await,
            Err(ReadError::Reverted(_))
        ));
    }

    #[test]
    fn test_snapshot_json_round_trip() {
        let mut chain = InMemoryChain::new();
        chain.add_dual_pair(
            addr(1),
            addr(10),
            addr(20),
            true,
            (U256::from(100), U256::from(200)),
            (6, 18),
            5,
        );
        let json = serde_json::to_string(chain.snapshot()).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dual_pairs.len(), 1);
        assert_eq!(back.dual_pairs[0].decimals0, 6);
    }
}
