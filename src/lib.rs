//! # AMM Route SDK
//!
//! Multi-protocol swap routing and quoting. Given a token pair, a chain and an amount, the
//! engine finds the best on-chain exchange path across constant-product pairs,
//! concentrated-liquidity pools with discrete fee tiers, stable/volatile dual-pool systems
//! and the wrapped-native contract, and reports the counter-amount together with a route
//! precise enough to be encoded into a router call.
//!
//! ## Overview
//!
//! A request flows through:
//!
//! - **Registry**: static per-chain catalogue of deployments, bridge tokens and the
//!   native/wrapped pair
//! - **Enumerator**: direct, 2-hop and 3-hop candidates per protocol family
//! - **Evaluator**: concurrent forward or reverse pricing of every candidate
//! - **Selector**: best quote with a deterministic tie-break
//! - **Transaction path**: display path plus a protocol-specific call route
//!
//! All chain access goes through the read-only [`ChainReader`] trait. [`EthersChainReader`]
//! talks to a JSON-RPC node; [`InMemoryChain`] serves a captured liquidity snapshot.
//!
//! ```no_run
//! use amm_route_sdk::{EthersChainReader, RouteEngine, RouteRequest, Settings, REGISTRY};
//! use std::sync::Arc;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let settings = Settings::new()?;
//! let reader = Arc::new(EthersChainReader::from_http(&settings.rpc.http_url)?);
//! let engine = RouteEngine::from_settings(reader, &settings);
//!
//! let chain = REGISTRY.lookup(1)?;
//! let usdc = chain.bridge_tokens[1].clone();
//! let request = RouteRequest::forward(1, chain.native.clone(), usdc, 10u64.pow(18).into());
//! let result = engine.route(&request).await?;
//! println!("{} -> {}", result.best_dex, result.amount_out);
//! # Ok(())
//! # }
//! ```

// Core Types
/// Tokens and amount conversions
pub mod types;
/// Routing primitives (DexId, candidates, quotes, RoutingResult)
pub mod router;
/// Error taxonomy
pub mod error;

// Registry & Chain Access
/// Per-chain protocol deployments
pub mod registry;
/// Contract ABIs (read-only)
pub mod contracts;
/// Read-only chain access seam
pub mod chain_reader;
/// In-memory liquidity snapshot reader
pub mod snapshot;

// Pricing
/// Constant-product and stable-curve math
pub mod amm_math;
/// Concentrated-liquidity swap math
pub mod v3_math;

// Routing Pipeline
/// Pool existence probing and pool-address cache
pub mod prober;
/// Candidate path enumeration
pub mod enumerator;
/// Candidate pricing
pub mod evaluator;
/// Best-route selection
pub mod selector;
/// Call route construction
pub mod tx_path;
/// Request state machine
pub mod engine;
/// Last-request-wins generations
pub mod session;

// Infrastructure
/// Metrics and observability
pub mod metrics;
/// Configuration management
pub mod settings;

// Re-exports for convenience
pub use chain_reader::{ChainReader, EthersChainReader};
pub use engine::{EngineOptions, RouteEngine, RouteRequest};
pub use error::{RouteError, TxPathError};
pub use registry::{ChainContractData, ChainRegistry, DexDeployment, REGISTRY};
pub use router::{DexId, Direction, RoutingResult};
pub use session::RouteSession;
pub use settings::Settings;
pub use snapshot::InMemoryChain;
pub use tx_path::{BuildOptions, CallRoute, TransactionPath};
pub use types::Token;
