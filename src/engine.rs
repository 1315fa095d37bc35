//! # Routing Engine
//!
//! Entry point of the crate. [`RouteEngine::route`] drives one request through
//! `Enumerating -> Evaluating -> Selecting` and ends in `Resolved`, `NoRoute` or
//! `RegistryError`. Input errors are rejected before the registry is consulted, so an
//! invalid request never reaches the chain.

use ethers::types::{Address, U256};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::chain_reader::ChainReader;
use crate::enumerator::{enumerate, EnumerationOptions};
use crate::error::{RouteError, TxPathError};
use crate::evaluator::evaluate_all;
use crate::metrics;
use crate::prober::{PoolAddressCache, PoolProber};
use crate::registry::{ChainRegistry, REGISTRY};
use crate::router::{Direction, RoutePhase, RoutingResult};
use crate::selector::select;
use crate::settings::Settings;
use crate::tx_path::{self, BuildOptions, TransactionPath};
use crate::types::Token;

/// What the application asks for. `amount` is the input for forward requests and the
/// desired output for reverse ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRequest {
    pub chain_id: u64,
    pub token_in: Token,
    pub token_out: Token,
    pub amount: U256,
    #[serde(default)]
    pub direction: Direction,
}

impl RouteRequest {
    pub fn forward(chain_id: u64, token_in: Token, token_out: Token, amount: U256) -> Self {
        Self {
            chain_id,
            token_in,
            token_out,
            amount,
            direction: Direction::Forward,
        }
    }

    pub fn reverse(chain_id: u64, token_in: Token, token_out: Token, amount_out: U256) -> Self {
        Self {
            direction: Direction::Reverse,
            ..Self::forward(chain_id, token_in, token_out, amount_out)
        }
    }

    /// Input checks that need neither the registry nor the chain.
    pub fn validate(&self) -> Result<(), RouteError> {
        if self.token_in == self.token_out {
            return Err(RouteError::InvalidTokenPair(self.token_in.address));
        }
        if self.amount.is_zero() {
            return Err(RouteError::ZeroAmount);
        }
        for token in [&self.token_in, &self.token_out] {
            if token.chain_id != self.chain_id {
                return Err(RouteError::ChainMismatch {
                    chain_id: self.chain_id,
                    token: token.address,
                    token_chain: token.chain_id,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub read_timeout: Duration,
    pub max_concurrency: usize,
    pub enumeration: EnumerationOptions,
    pub slippage_bps: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for EngineOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            read_timeout: settings.read_timeout(),
            max_concurrency: settings.routing.max_concurrency.max(1),
            enumeration: settings.enumeration_options(),
            slippage_bps: settings.routing.slippage_bps,
        }
    }
}

pub struct RouteEngine {
    reader: Arc<dyn ChainReader>,
    registry: Arc<ChainRegistry>,
    options: EngineOptions,
    pool_cache: Option<Arc<PoolAddressCache>>,
}

impl RouteEngine {
    /// Engine over the built-in registry.
    pub fn new(reader: Arc<dyn ChainReader>, options: EngineOptions) -> Self {
        Self {
            reader,
            registry: Arc::new(REGISTRY.clone()),
            options,
            pool_cache: None,
        }
    }

    pub fn from_settings(reader: Arc<dyn ChainReader>, settings: &Settings) -> Self {
        let engine = Self::new(reader, EngineOptions::from(settings));
        match settings.pool_cache_ttl() {
            Some(ttl) => engine.with_pool_cache(Arc::new(PoolAddressCache::with_capacity(
                ttl,
                settings.routing.pool_cache_capacity,
            ))),
            None => engine,
        }
    }

    pub fn with_registry(mut self, registry: ChainRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn with_pool_cache(mut self, cache: Arc<PoolAddressCache>) -> Self {
        self.pool_cache = Some(cache);
        self
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn pool_cache(&self) -> Option<&Arc<PoolAddressCache>> {
        self.pool_cache.as_ref()
    }

    /// Finds the best route for `request`.
    pub async fn route(&self, request: &RouteRequest) -> Result<RoutingResult, RouteError> {
        let started = Instant::now();
        let outcome = self.run(request).await;
        let label = match &outcome {
            Ok(_) => RoutePhase::Resolved.to_string(),
            Err(RouteError::NoRoute) => RoutePhase::NoRoute.to_string(),
            Err(RouteError::ChainNotRegistered(_)) => RoutePhase::RegistryError.to_string(),
            Err(_) => "rejected".to_string(),
        };
        metrics::increment_route_request(request.chain_id, &label);
        metrics::record_route_duration(request.chain_id, started.elapsed());
        outcome
    }

    async fn run(&self, request: &RouteRequest) -> Result<RoutingResult, RouteError> {
        request.validate()?;

        let chain = match self.registry.lookup(request.chain_id) {
            Ok(chain) => chain,
            Err(e) => {
                info!("[{}] chain {}: {}", RoutePhase::RegistryError, request.chain_id, e);
                return Err(e);
            }
        };

        debug!(
            "[{}] {} -> {} on {}",
            RoutePhase::Enumerating,
            request.token_in.symbol,
            request.token_out.symbol,
            chain.name
        );
        let candidates = enumerate(
            &request.token_in,
            &request.token_out,
            chain,
            &self.options.enumeration,
        );
        metrics::record_candidates(chain.chain_id, candidates.len());

        debug!("[{}] {} candidates", RoutePhase::Evaluating, candidates.len());
        let mut prober = PoolProber::new(chain.chain_id, self.reader.clone(), self.options.read_timeout);
        if let Some(cache) = &self.pool_cache {
            prober = prober.with_cache(cache.clone());
        }
        let quotes = evaluate_all(
            candidates,
            request.amount,
            request.direction,
            &prober,
            self.options.max_concurrency,
        )
        .await;

        let succeeded = quotes.iter().filter(|q| q.success).count();
        debug!(
            "[{}] {}/{} quotes succeeded, {} pools probed",
            RoutePhase::Selecting,
            succeeded,
            quotes.len(),
            prober.probed()
        );

        match select(quotes) {
            Ok(result) => {
                info!(
                    "[{}] {} {} -> {} via {} ({} hops): in={} out={}",
                    RoutePhase::Resolved,
                    chain.name,
                    request.token_in.symbol,
                    request.token_out.symbol,
                    result.best_dex,
                    result.hop_count(),
                    result.amount_in,
                    result.amount_out
                );
                Ok(result)
            }
            Err(e) => {
                info!(
                    "[{}] {} {} -> {}",
                    RoutePhase::NoRoute,
                    chain.name,
                    request.token_in.symbol,
                    request.token_out.symbol
                );
                Err(e)
            }
        }
    }

    /// Builds the transaction path for `result` using the engine's slippage setting.
    pub fn build_path(
        &self,
        result: &RoutingResult,
        recipient: Address,
    ) -> Result<TransactionPath, TxPathError> {
        tx_path::build(
            result,
            &BuildOptions {
                recipient,
                slippage_bps: self.options.slippage_bps,
            },
        )
    }
}
