//! # Pool Existence Prober
//!
//! Answers "is there a usable pool for this protocol, token pair and parameter?" and hands
//! back what the evaluator needs to price it ([`PoolHandle`]).
//!
//! - A [`PoolProber`] lives for one request. Its memo guarantees that a pool shared by many
//!   candidates is read once, even when those candidates are evaluated concurrently.
//! - [`PoolAddressCache`] optionally outlives requests. It only remembers *definite*
//!   answers about pool addresses (present or absent). Reserves, liquidity and quotes are
//!   always read fresh, and a timeout is never remembered as "absent".
//! - Every read is bounded by the configured timeout. A timeout fails the probe (and the
//!   candidate), nothing more.

use dashmap::DashMap;
use ethers::types::{Address, U256};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::warn;

use crate::chain_reader::{sort_tokens, ChainReader, DualPairMetadata, PairReserves};
use crate::error::ReadError;
use crate::metrics;
use crate::registry::{ConcentratedDex, ConstantProductDex, DexDeployment, DualPoolDex};

/// Which pool of a protocol instance to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeParams {
    Plain,
    FeeTier(u32),
    Stable(bool),
}

/// A pool that exists and has liquidity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolHandle {
    ConstantProduct {
        pair: Address,
        token0: Address,
        reserves: PairReserves,
        fee_bps: u32,
    },
    Concentrated {
        pool: Address,
        fee: u32,
        liquidity: u128,
    },
    DualPool {
        pair: Address,
        stable: bool,
        fee_bps: u32,
        metadata: DualPairMetadata,
    },
}

impl PoolHandle {
    pub fn address(&self) -> Address {
        match self {
            PoolHandle::ConstantProduct { pair, .. } => *pair,
            PoolHandle::Concentrated { pool, .. } => *pool,
            PoolHandle::DualPool { pair, .. } => *pair,
        }
    }
}

/// `Ok(None)` is a definite "no usable pool"; `Err` means the chain did not answer.
pub type ProbeResult = Result<Option<PoolHandle>, ReadError>;

/// Identity of a pool lookup. Tokens are stored sorted so `(a, b)` and `(b, a)` coincide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeKey {
    pub chain_id: u64,
    pub factory: Address,
    pub token0: Address,
    pub token1: Address,
    pub params: ProbeParams,
}

impl ProbeKey {
    pub fn new(chain_id: u64, factory: Address, a: Address, b: Address, params: ProbeParams) -> Self {
        let (token0, token1) = sort_tokens(a, b);
        Self {
            chain_id,
            factory,
            token0,
            token1,
            params,
        }
    }
}

/// Default entry ceiling of [`PoolAddressCache::new`].
pub const DEFAULT_POOL_CACHE_CAPACITY: usize = 10_000;

/// Cross-request cache of definite pool-address answers.
///
/// Expired entries are swept once the cache reaches its capacity. If every entry is still
/// live after the sweep, the insert is dropped.
#[derive(Debug)]
pub struct PoolAddressCache {
    ttl: Duration,
    capacity: usize,
    entries: DashMap<ProbeKey, (Option<Address>, Instant)>,
}

impl PoolAddressCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_POOL_CACHE_CAPACITY)
    }

    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: DashMap::new(),
        }
    }

    /// `Some(None)` is a cached "absent"; `None` is a miss.
    pub fn get(&self, key: &ProbeKey) -> Option<Option<Address>> {
        let hit = self.entries.get(key).map(|e| *e.value());
        match hit {
            Some((address, stored)) if stored.elapsed() < self.ttl => {
                metrics::increment_pool_cache(true);
                Some(address)
            }
            Some(_) => {
                self.entries.remove(key);
                metrics::increment_pool_cache(false);
                None
            }
            None => {
                metrics::increment_pool_cache(false);
                None
            }
        }
    }

    pub fn insert(&self, key: ProbeKey, address: Option<Address>) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.invalidate_stale();
            if self.entries.len() >= self.capacity {
                log::debug!("pool address cache full ({} entries), skipping insert", self.capacity);
                return;
            }
        }
        self.entries.insert(key, (address, Instant::now()));
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn invalidate_stale(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, (_, stored)| stored.elapsed() < ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Per-request prober; also the timed entry point for quoter calls.
pub struct PoolProber {
    chain_id: u64,
    reader: Arc<dyn ChainReader>,
    read_timeout: Duration,
    memo: DashMap<ProbeKey, Arc<OnceCell<ProbeResult>>>,
    cache: Option<Arc<PoolAddressCache>>,
}

impl PoolProber {
    pub fn new(chain_id: u64, reader: Arc<dyn ChainReader>, read_timeout: Duration) -> Self {
        Self {
            chain_id,
            reader,
            read_timeout,
            memo: DashMap::new(),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<PoolAddressCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn reader(&self) -> &Arc<dyn ChainReader> {
        &self.reader
    }

    /// Number of distinct pools probed by this request.
    pub fn probed(&self) -> usize {
        self.memo.len()
    }

    /// Runs a chain read under the request's read timeout.
    pub async fn timed<T>(
        &self,
        call: &'static str,
        target: Address,
        fut: impl Future<Output = Result<T, ReadError>>,
    ) -> Result<T, ReadError> {
        match timeout(self.read_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{} timeout for {:?}", call, target);
                metrics::increment_read_timeout(call);
                Err(ReadError::Timeout)
            }
        }
    }

    /// Looks for a pool of `deployment` between `a` and `b`. `params` must match the
    /// deployment's family; a mismatched combination is reported absent.
    pub async fn probe(
        &self,
        deployment: &DexDeployment,
        a: Address,
        b: Address,
        params: ProbeParams,
    ) -> ProbeResult {
        let key = ProbeKey::new(self.chain_id, deployment.factory(), a, b, params);
        let cell = self
            .memo
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        cell.get_or_init(|| self.probe_uncached(deployment, key))
            .await
            .clone()
    }

    async fn probe_uncached(&self, deployment: &DexDeployment, key: ProbeKey) -> ProbeResult {
        let result = match (deployment, key.params) {
            (DexDeployment::ConstantProduct(dex), ProbeParams::Plain) => {
                self.probe_constant_product(dex, &key).await
            }
            (DexDeployment::Concentrated(dex), ProbeParams::FeeTier(fee)) => {
                self.probe_concentrated(dex, &key, fee).await
            }
            (DexDeployment::DualPool(dex), ProbeParams::Stable(stable)) => {
                self.probe_dual(dex, &key, stable).await
            }
            _ => Ok(None),
        };
        match &result {
            Ok(Some(handle)) => log::debug!("Probe {:?} found {:#x}", key.params, handle.address()),
            Ok(None) => log::debug!(
                "Probe {:?} {:#x}/{:#x}: absent",
                key.params,
                key.token0,
                key.token1
            ),
            Err(e) => log::debug!("Probe {:?} {:#x}/{:#x} failed: {}", key.params, key.token0, key.token1, e),
        }
        result
    }

    /// Resolves a pool address through the cache, then the factory. Reverts and the zero
    /// address are both a definite "absent".
    async fn pool_address(
        &self,
        key: &ProbeKey,
        call: &'static str,
        lookup: impl Future<Output = Result<Address, ReadError>>,
    ) -> Result<Option<Address>, ReadError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(key) {
                return Ok(hit);
            }
        }
        let address = match self.timed(call, key.factory, lookup).await {
            Ok(address) if address.is_zero() => None,
            Ok(address) => Some(address),
            Err(e) if e.is_definite() => None,
            Err(e) => return Err(e),
        };
        if let Some(cache) = &self.cache {
            cache.insert(key.clone(), address);
        }
        Ok(address)
    }

    async fn probe_constant_product(&self, dex: &ConstantProductDex, key: &ProbeKey) -> ProbeResult {
        let lookup = self.reader.get_pair(dex.factory, key.token0, key.token1);
        let Some(pair) = self.pool_address(key, "getPair", lookup).await? else {
            return Ok(None);
        };
        let reserves = match self.timed("getReserves", pair, self.reader.get_reserves(pair)).await {
            Ok(r) => r,
            Err(e) if e.is_definite() => return Ok(None),
            Err(e) => return Err(e),
        };
        if reserves.reserve0.is_zero() || reserves.reserve1.is_zero() {
            return Ok(None);
        }
        Ok(Some(PoolHandle::ConstantProduct {
            pair,
            token0: key.token0,
            reserves,
            fee_bps: dex.fee_bps,
        }))
    }

    async fn probe_concentrated(&self, dex: &ConcentratedDex, key: &ProbeKey, fee: u32) -> ProbeResult {
        let lookup = self.reader.get_pool(dex.factory, key.token0, key.token1, fee);
        let Some(pool) = self.pool_address(key, "getPool", lookup).await? else {
            return Ok(None);
        };
        let liquidity = match self.timed("liquidity", pool, self.reader.pool_liquidity(pool)).await {
            Ok(l) => l,
            Err(e) if e.is_definite() => return Ok(None),
            Err(e) => return Err(e),
        };
        if liquidity == 0 {
            return Ok(None);
        }
        Ok(Some(PoolHandle::Concentrated { pool, fee, liquidity }))
    }

    async fn probe_dual(&self, dex: &DualPoolDex, key: &ProbeKey, stable: bool) -> ProbeResult {
        let lookup = self.reader.get_dual_pair(dex.factory, key.token0, key.token1, stable);
        let Some(pair) = self.pool_address(key, "getPair", lookup).await? else {
            return Ok(None);
        };
        let metadata = match self.timed("metadata", pair, self.reader.dual_pair_metadata(pair)).await {
            Ok(m) => m,
            Err(e) if e.is_definite() => return Ok(None),
            Err(e) => return Err(e),
        };
        if metadata.reserve0.is_zero() || metadata.reserve1.is_zero() {
            return Ok(None);
        }
        let fee_bps = match self
            .timed("getFee", dex.factory, self.reader.dual_pair_fee(dex.factory, pair, stable))
            .await
        {
            Ok(fee) => fee,
            Err(e) if e.is_definite() => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(PoolHandle::DualPool {
            pair,
            stable,
            fee_bps,
            metadata,
        }))
    }

    /// QuoterV2 exact-input simulation under the read timeout.
    pub async fn quote_exact_input(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_in: U256,
    ) -> Result<U256, ReadError> {
        let call = self
            .reader
            .quote_exact_input_single(quoter, token_in, token_out, fee, amount_in);
        self.timed("quoteExactInputSingle", quoter, call).await
    }

    /// QuoterV2 exact-output simulation under the read timeout.
    pub async fn quote_exact_output(
        &self,
        quoter: Address,
        token_in: Address,
        token_out: Address,
        fee: u32,
        amount_out: U256,
    ) -> Result<U256, ReadError> {
        let call = self
            .reader
            .quote_exact_output_single(quoter, token_in, token_out, fee, amount_out);
        self.timed("quoteExactOutputSingle", quoter, call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::DexId;
    use crate::snapshot::InMemoryChain;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn v2() -> DexDeployment {
        DexDeployment::ConstantProduct(ConstantProductDex {
            dex: DexId::UniswapV2,
            factory: addr(1),
            router: addr(2),
            fee_bps: 30,
        })
    }

    #[tokio::test]
    async fn test_probe_is_memoized() {
        let mut chain = InMemoryChain::new();
        let pair = chain.add_pair(addr(1), addr(10), addr(20), U256::from(1000), U256::from(1000));
        let chain = Arc::new(chain);
        let prober = PoolProber::new(1, chain.clone(), Duration::from_secs(1));

        let first = prober.probe(&v2(), addr(10), addr(20), ProbeParams::Plain).await.unwrap();
        let second = prober.probe(&v2(), addr(20), addr(10), ProbeParams::Plain).await.unwrap();
        assert_eq!(first.as_ref().map(|h| h.address()), Some(pair));
        assert_eq!(first, second);
        // getPair + getReserves, once
        assert_eq!(chain.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_reserves_are_absent() {
        let mut chain = InMemoryChain::new();
        chain.add_pair(addr(1), addr(10), addr(20), U256::zero(), U256::from(1000));
        let prober = PoolProber::new(1, Arc::new(chain), Duration::from_secs(1));
        let probe = prober.probe(&v2(), addr(10), addr(20), ProbeParams::Plain).await;
        assert_eq!(probe, Ok(None));
    }

    #[tokio::test]
    async fn test_timeout_is_not_cached() {
        let mut chain = InMemoryChain::new();
        chain.add_pair(addr(1), addr(10), addr(20), U256::from(5), U256::from(5));
        chain.delay_on(addr(1), Duration::from_millis(200));
        let chain = Arc::new(chain);
        let cache = Arc::new(PoolAddressCache::new(Duration::from_secs(60)));

        let prober = PoolProber::new(1, chain, Duration::from_millis(20)).with_cache(cache.clone());
        let probe = prober.probe(&v2(), addr(10), addr(20), ProbeParams::Plain).await;
        assert_eq!(probe, Err(ReadError::Timeout));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_remembers_absent_pools() {
        let chain = Arc::new(InMemoryChain::new());
        let cache = Arc::new(PoolAddressCache::new(Duration::from_secs(60)));

        let prober = PoolProber::new(1, chain.clone(), Duration::from_secs(1)).with_cache(cache.clone());
        assert_eq!(prober.probe(&v2(), addr(10), addr(20), ProbeParams::Plain).await, Ok(None));
        assert_eq!(chain.calls(), 1);

        // a new request reuses the definite answer
        let prober = PoolProber::new(1, chain.clone(), Duration::from_secs(1)).with_cache(cache.clone());
        assert_eq!(prober.probe(&v2(), addr(10), addr(20), ProbeParams::Plain).await, Ok(None));
        assert_eq!(chain.calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_stays_bounded() {
        let cache = PoolAddressCache::with_capacity(Duration::from_millis(1), 1_000);
        for n in 0..50_000u64 {
            let key = ProbeKey::new(1, addr(1), addr(n + 10), addr(n + 100_000), ProbeParams::Plain);
            cache.insert(key, None);
        }
        assert!(cache.len() <= 1_000, "{} entries", cache.len());

        std::thread::sleep(Duration::from_millis(20));
        cache.invalidate_stale();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_full_cache_sweeps_expired_entries() {
        let cache = PoolAddressCache::with_capacity(Duration::from_millis(0), 2);
        for n in 0..3u64 {
            cache.insert(ProbeKey::new(1, addr(1), addr(10 + n), addr(20 + n), ProbeParams::Plain), None);
        }
        // the third insert swept both expired answers
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_full_cache_keeps_live_entries() {
        let cache = PoolAddressCache::with_capacity(Duration::from_secs(60), 2);
        let keys: Vec<_> = (0..3u64)
            .map(|n| ProbeKey::new(1, addr(1), addr(10 + n), addr(20 + n), ProbeParams::Plain))
            .collect();
        for key in &keys {
            cache.insert(key.clone(), Some(addr(5)));
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&keys[0]), Some(Some(addr(5))));
        assert_eq!(cache.get(&keys[2]), None);
        assert_eq!(cache.invalidate_stale(), 0);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = PoolAddressCache::new(Duration::from_millis(0));
        let key = ProbeKey::new(1, addr(1), addr(2), addr(3), ProbeParams::Plain);
        cache.insert(key.clone(), Some(addr(9)));
        assert_eq!(cache.get(&key), None);
        assert!(cache.is_empty());
    }
}
