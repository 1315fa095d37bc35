//! # Chain Registry
//!
//! Static, per-chain catalogue of protocol deployments, native/wrapped token identity and
//! the curated bridge tokens used as intermediate hops.
//!
//! The registry is built once ([`REGISTRY`]) and only ever read afterwards. The order of
//! [`ChainContractData::protocols`] is the chain's precedence order, which the selector
//! uses to break ties between identical quotes.

mod chains;

use ethers::types::Address;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{RegistryError, RouteError};
use crate::router::DexId;
use crate::types::{Token, NATIVE_TOKEN_ADDRESS};

/// Process-wide registry of the built-in chains.
pub static REGISTRY: Lazy<ChainRegistry> = Lazy::new(|| {
    log::debug!("Chain registry initialized");
    ChainRegistry::builtin()
});

/// Uniswap V2 style deployment: one pair per token pair, fixed fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantProductDex {
    pub dex: DexId,
    pub factory: Address,
    pub router: Address,
    /// Swap fee in basis points (30 = 0.3%).
    pub fee_bps: u32,
}

/// Uniswap V3 style deployment with discrete fee tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentratedDex {
    pub dex: DexId,
    pub factory: Address,
    pub quoter: Address,
    pub router: Address,
    /// Fee tiers in the protocol's own units, in probe order. Multi-hop legs only use the
    /// lowest tiers of this list.
    pub fee_tiers: Vec<u32>,
}

/// Solidly style deployment with a stable and a volatile pool per token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualPoolDex {
    pub dex: DexId,
    pub factory: Address,
    pub router: Address,
}

/// One protocol instance on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DexDeployment {
    ConstantProduct(ConstantProductDex),
    Concentrated(ConcentratedDex),
    DualPool(DualPoolDex),
    /// The wrapped-native contract itself; factory is unused.
    Wrapped { contract: Address },
}

impl DexDeployment {
    pub fn dex(&self) -> DexId {
        match self {
            DexDeployment::ConstantProduct(d) => d.dex,
            DexDeployment::Concentrated(d) => d.dex,
            DexDeployment::DualPool(d) => d.dex,
            DexDeployment::Wrapped { .. } => DexId::WrappedContract,
        }
    }

    pub fn router(&self) -> Address {
        match self {
            DexDeployment::ConstantProduct(d) => d.router,
            DexDeployment::Concentrated(d) => d.router,
            DexDeployment::DualPool(d) => d.router,
            DexDeployment::Wrapped { contract } => *contract,
        }
    }

    pub fn factory(&self) -> Address {
        match self {
            DexDeployment::ConstantProduct(d) => d.factory,
            DexDeployment::Concentrated(d) => d.factory,
            DexDeployment::DualPool(d) => d.factory,
            DexDeployment::Wrapped { .. } => Address::zero(),
        }
    }
}

/// Everything the engine needs to know about one chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainContractData {
    pub chain_id: u64,
    pub name: String,
    pub native: Token,
    pub wrapped: Token,
    pub protocols: Vec<DexDeployment>,
    pub bridge_tokens: Vec<Token>,
}

impl ChainContractData {
    /// The first constant-product deployment; every registered chain has one.
    pub fn default_constant_product(&self) -> Option<&ConstantProductDex> {
        self.protocols.iter().find_map(|p| match p {
            DexDeployment::ConstantProduct(d) => Some(d),
            _ => None,
        })
    }

    pub fn dual_pool(&self) -> Option<&DualPoolDex> {
        self.protocols.iter().find_map(|p| match p {
            DexDeployment::DualPool(d) => Some(d),
            _ => None,
        })
    }

    pub fn concentrated(&self) -> impl Iterator<Item = &ConcentratedDex> {
        self.protocols.iter().filter_map(|p| match p {
            DexDeployment::Concentrated(d) => Some(d),
            _ => None,
        })
    }

    /// Position of a protocol in the precedence order. The wrapped contract always comes first.
    pub fn precedence_of(&self, dex: DexId) -> usize {
        if dex == DexId::WrappedContract {
            return 0;
        }
        self.protocols
            .iter()
            .position(|p| p.dex() == dex)
            .map(|i| i + 1)
            .unwrap_or(usize::MAX)
    }

    /// Maps the native sentinel to the wrapped token; any other token is returned as is.
    pub fn pool_token(&self, token: &Token) -> Token {
        if token.is_native() {
            self.wrapped.clone()
        } else {
            token.clone()
        }
    }

    pub fn is_wrapped_native(&self, token: &Token) -> bool {
        token.address == self.wrapped.address
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        let chain_id = self.chain_id;
        let zero = |field: String| RegistryError::ZeroAddress { chain_id, field };

        if self.wrapped.address.is_zero() {
            return Err(zero("wrapped".to_string()));
        }
        if self.wrapped.address == NATIVE_TOKEN_ADDRESS {
            return Err(RegistryError::WrappedIsNative(chain_id));
        }
        if self.bridge_tokens.is_empty() {
            return Err(RegistryError::NoBridgeTokens(chain_id));
        }
        if let Some(t) = self.bridge_tokens.iter().find(|t| t.address.is_zero()) {
            return Err(zero(format!("bridge token {}", t.symbol)));
        }
        if self.default_constant_product().is_none() {
            return Err(RegistryError::NoConstantProduct(chain_id));
        }
        if self.protocols.iter().filter(|p| matches!(p, DexDeployment::DualPool(_))).count() > 1 {
            return Err(RegistryError::MultipleDualPool(chain_id));
        }

        for protocol in &self.protocols {
            let dex = protocol.dex();
            if protocol.router().is_zero() {
                return Err(zero(format!("{} router", dex)));
            }
            if protocol.factory().is_zero() && !matches!(protocol, DexDeployment::Wrapped { .. }) {
                return Err(zero(format!("{} factory", dex)));
            }
            if let DexDeployment::Concentrated(d) = protocol {
                if d.quoter.is_zero() {
                    return Err(zero(format!("{} quoter", dex)));
                }
                if d.fee_tiers.is_empty() {
                    return Err(RegistryError::NoFeeTiers {
                        chain_id,
                        dex: dex.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Immutable chain-id keyed catalogue.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<u64, ChainContractData>,
}

impl ChainRegistry {
    /// Registry of the built-in chains.
    pub fn builtin() -> Self {
        let chains = chains::builtin_chains()
            .into_iter()
            .map(|c| (c.chain_id, c))
            .collect();
        Self { chains }
    }

    /// Builds a registry from explicit chain data, validating every entry.
    pub fn from_chains(chains: Vec<ChainContractData>) -> Result<Self, RegistryError> {
        let mut map = HashMap::with_capacity(chains.len());
        for chain in chains {
            chain.validate()?;
            let id = chain.chain_id;
            if map.insert(id, chain).is_some() {
                return Err(RegistryError::Duplicate(id));
            }
        }
        Ok(Self { chains: map })
    }

    pub fn lookup(&self, chain_id: u64) -> Result<&ChainContractData, RouteError> {
        self.chains
            .get(&chain_id)
            .ok_or(RouteError::ChainNotRegistered(chain_id))
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn chains(&self) -> impl Iterator<Item = &ChainContractData> {
        self.chains.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_chains_are_valid() {
        let registry = ChainRegistry::builtin();
        assert!(registry.chain_ids().len() >= 6);
        for chain in registry.chains() {
            chain.validate().unwrap_or_else(|e| panic!("{}: {}", chain.name, e));
            assert!((3..=6).contains(&chain.bridge_tokens.len()), "{}", chain.name);
            assert!(chain.bridge_tokens.iter().any(|t| t == &chain.wrapped));
        }
    }

    #[test]
    fn test_unknown_chain() {
        assert_eq!(
            REGISTRY.lookup(999_999).unwrap_err(),
            RouteError::ChainNotRegistered(999_999)
        );
    }

    #[test]
    fn test_precedence_order() {
        let base = REGISTRY.lookup(8453).unwrap();
        assert_eq!(base.precedence_of(DexId::WrappedContract), 0);
        assert!(base.precedence_of(DexId::UniswapV2) < base.precedence_of(DexId::UniswapV3));
        assert_eq!(base.precedence_of(DexId::PancakeSwapV3), usize::MAX);
        assert_eq!(base.dual_pool().map(|d| d.dex), Some(DexId::Aerodrome));
    }

    #[test]
    fn test_native_maps_to_wrapped() {
        let eth = REGISTRY.lookup(1).unwrap();
        let mapped = eth.pool_token(&eth.native);
        assert_eq!(mapped, eth.wrapped);
        assert!(eth.is_wrapped_native(&mapped));
    }

    #[test]
    fn test_from_chains_rejects_invalid() {
        let mut chain = REGISTRY.lookup(1).unwrap().clone();
        chain.bridge_tokens.clear();
        assert_eq!(
            ChainRegistry::from_chains(vec![chain]).unwrap_err(),
            RegistryError::NoBridgeTokens(1)
        );

        let chain = REGISTRY.lookup(1).unwrap().clone();
        assert_eq!(
            ChainRegistry::from_chains(vec![chain.clone(), chain]).unwrap_err(),
            RegistryError::Duplicate(1)
        );
    }
}
