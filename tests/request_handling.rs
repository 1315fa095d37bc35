//! Request-level behavior of the routing engine.
//!
//! Tests cover:
//! - Input rejection before any chain call
//! - Read timeouts failing only their own candidate
//! - Constant-product monotonicity and zero-fee round trips
//! - Pool-address cache reuse across requests
//! - Last-request-wins generations
//! - Loading liquidity from a snapshot file

use amm_route_sdk::prober::PoolAddressCache;
use amm_route_sdk::registry::ConstantProductDex;
use amm_route_sdk::{
    ChainContractData, ChainRegistry, DexDeployment, DexId, EngineOptions, InMemoryChain,
    RouteEngine, RouteError, RouteRequest, RouteSession, Token, REGISTRY,
};
use ethers::types::{Address, U256};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

fn e18(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

fn token(chain_id: u64, n: u64) -> Token {
    Token::new(chain_id, Address::from_low_u64_be(0x1000 + n), 18, format!("T{}", n))
}

fn factory_of(chain_id: u64, dex: DexId) -> Address {
    REGISTRY
        .lookup(chain_id)
        .unwrap()
        .protocols
        .iter()
        .find(|p| p.dex() == dex)
        .unwrap()
        .factory()
}

/// Single-chain registry with one zero-fee constant-product deployment.
fn zero_fee_registry() -> ChainRegistry {
    let id = 31337;
    let wrapped = Token::new(id, Address::from_low_u64_be(0xfeed), 18, "WNAT");
    ChainRegistry::from_chains(vec![ChainContractData {
        chain_id: id,
        name: "Devnet".to_string(),
        native: Token::native(id, "NAT"),
        wrapped: wrapped.clone(),
        protocols: vec![DexDeployment::ConstantProduct(ConstantProductDex {
            dex: DexId::UniswapV2,
            factory: Address::from_low_u64_be(0xf00),
            router: Address::from_low_u64_be(0xf01),
            fee_bps: 0,
        })],
        bridge_tokens: vec![wrapped],
    }])
    .unwrap()
}

#[tokio::test]
async fn test_invalid_requests_never_reach_the_chain() {
    let chain = Arc::new(InMemoryChain::new());
    let engine = RouteEngine::new(chain.clone(), EngineOptions::default());
    let a = token(1, 1);

    let same = RouteRequest::forward(1, a.clone(), a.clone(), e18(1));
    assert_eq!(
        engine.route(&same).await.unwrap_err(),
        RouteError::InvalidTokenPair(a.address)
    );

    let zero = RouteRequest::forward(1, a.clone(), token(1, 2), U256::zero());
    assert_eq!(engine.route(&zero).await.unwrap_err(), RouteError::ZeroAmount);

    let mismatch = RouteRequest::forward(1, a.clone(), token(10, 2), e18(1));
    assert!(matches!(
        engine.route(&mismatch).await.unwrap_err(),
        RouteError::ChainMismatch { token_chain: 10, .. }
    ));

    // identical tokens are rejected even on an unknown chain
    let unknown = RouteRequest::forward(424242, token(424242, 1), token(424242, 1), e18(1));
    assert!(matches!(
        engine.route(&unknown).await.unwrap_err(),
        RouteError::InvalidTokenPair(_)
    ));

    assert_eq!(chain.calls(), 0);
}

#[tokio::test]
async fn test_timeout_fails_only_its_candidate() {
    let (a, b) = (token(1, 1), token(1, 2));
    let mut chain = InMemoryChain::new();
    // the deeper pair hangs; the shallower one answers
    let slow = chain.add_pair(factory_of(1, DexId::UniswapV2), a.address, b.address, e18(10_000), e18(10_000));
    chain.add_pair(factory_of(1, DexId::SushiSwapV2), a.address, b.address, e18(100), e18(100));
    chain.delay_on(slow, Duration::from_millis(500));

    let options = EngineOptions {
        read_timeout: Duration::from_millis(50),
        ..EngineOptions::default()
    };
    let engine = RouteEngine::new(Arc::new(chain), options);
    let result = engine
        .route(&RouteRequest::forward(1, a, b, e18(1)))
        .await
        .unwrap();
    assert_eq!(result.best_dex, DexId::SushiSwapV2);
}

#[tokio::test]
async fn test_constant_product_quotes_are_monotonic() {
    let (a, b) = (token(1, 1), token(1, 2));
    let mut chain = InMemoryChain::new();
    chain.add_pair(factory_of(1, DexId::UniswapV2), a.address, b.address, e18(5_000), e18(7_000));
    let engine = RouteEngine::new(Arc::new(chain), EngineOptions::default());

    let mut previous = U256::zero();
    for amount in [U256::from(1_000u64), e18(1) / 1000, e18(1), e18(10), e18(500), e18(4_000)] {
        let out = engine
            .route(&RouteRequest::forward(1, a.clone(), b.clone(), amount))
            .await
            .unwrap()
            .amount_out;
        assert!(out >= previous, "{} produced {} < {}", amount, out, previous);
        previous = out;
    }
}

#[tokio::test]
async fn test_zero_fee_round_trip() {
    let registry = zero_fee_registry();
    let (a, b) = (token(31337, 1), token(31337, 2));
    let mut chain = InMemoryChain::new();
    chain.add_pair(Address::from_low_u64_be(0xf00), a.address, b.address, e18(1_000_000), e18(2_000_000));
    let engine = RouteEngine::new(Arc::new(chain), EngineOptions::default()).with_registry(registry);

    let amount_in = e18(3);
    let forward = engine
        .route(&RouteRequest::forward(31337, a.clone(), b.clone(), amount_in))
        .await
        .unwrap();
    let reverse = engine
        .route(&RouteRequest::reverse(31337, a, b, forward.amount_out))
        .await
        .unwrap();
    assert_eq!(forward.fee, Some(0));
    let diff = if reverse.amount_in > amount_in {
        reverse.amount_in - amount_in
    } else {
        amount_in - reverse.amount_in
    };
    assert!(diff <= U256::from(2), "round trip drifted by {}", diff);
}

#[tokio::test]
async fn test_pool_cache_saves_lookups_across_requests() {
    let (a, b) = (token(1, 1), token(1, 2));
    let mut chain = InMemoryChain::new();
    chain.add_pair(factory_of(1, DexId::UniswapV2), a.address, b.address, e18(1_000), e18(1_000));
    let chain = Arc::new(chain);
    let cache = Arc::new(PoolAddressCache::new(Duration::from_secs(60)));
    let engine = RouteEngine::new(chain.clone(), EngineOptions::default()).with_pool_cache(cache.clone());
    let request = RouteRequest::forward(1, a, b, e18(1));

    let first = engine.route(&request).await.unwrap();
    let after_first = chain.calls();
    assert!(!cache.is_empty());

    let second = engine.route(&request).await.unwrap();
    let second_calls = chain.calls() - after_first;
    assert_eq!(first.amount_out, second.amount_out);
    // only reserves are read again
    assert!(second_calls < after_first, "{} >= {}", second_calls, after_first);
}

#[tokio::test]
async fn test_last_request_wins() {
    let (a, b) = (token(1, 1), token(1, 2));
    let mut chain = InMemoryChain::new();
    chain.add_pair(factory_of(1, DexId::UniswapV2), a.address, b.address, e18(1_000), e18(1_000));
    let engine = Arc::new(RouteEngine::new(Arc::new(chain), EngineOptions::default()));
    let session = Arc::new(RouteSession::new());

    let spawn = |amount: U256| {
        let (engine, session) = (engine.clone(), session.clone());
        let request = RouteRequest::forward(1, a.clone(), b.clone(), amount);
        let generation = session.begin();
        tokio::spawn(async move {
            let result = engine.route(&request).await;
            session.accept(generation, result)
        })
    };
    let stale = spawn(e18(1));
    let fresh = spawn(e18(2));

    assert!(stale.await.unwrap().is_none());
    let result = fresh.await.unwrap().expect("latest request is kept").unwrap();
    assert_eq!(result.amount_in, e18(2));
}

#[tokio::test]
async fn test_route_from_snapshot_file() {
    let (a, b) = (token(1, 1), token(1, 2));
    let mut chain = InMemoryChain::new();
    chain.add_pair(factory_of(1, DexId::SushiSwapV2), a.address, b.address, e18(300), e18(900));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", serde_json::to_string(chain.snapshot()).unwrap()).unwrap();

    let loaded = InMemoryChain::from_json_file(file.path()).unwrap();
    let engine = RouteEngine::new(Arc::new(loaded), EngineOptions::default());
    let result = engine
        .route(&RouteRequest::forward(1, a, b, e18(1)))
        .await
        .unwrap();
    assert_eq!(result.best_dex, DexId::SushiSwapV2);
}
