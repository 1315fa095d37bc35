//! # Path Enumerator
//!
//! Turns a token pair into the list of candidate routes worth pricing: a direct hop and
//! paths through the chain's bridge tokens, for every protocol deployment on the chain.
//!
//! Enumeration is pure: it never touches the chain. Native endpoints are swapped for the
//! wrapped token at the pool level while the candidate keeps the caller's endpoints, and
//! the native <-> wrapped pair short-circuits to a single deposit/withdraw candidate.

use ethers::types::Address;
use indexmap::IndexMap;

use crate::registry::{ChainContractData, DexDeployment};
use crate::router::{CandidateHop, DexId, HopSpec, RouteCandidate, WrapAction};
use crate::types::Token;

type CandidateKey = (DexId, Vec<(Address, Address, HopSpec)>);

/// Limits on how far the enumerator searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationOptions {
    /// 1 = direct only, 2 = one bridge token, 3 = two bridge tokens.
    pub max_hops: usize,
    /// How many of a deployment's lowest fee tiers each leg of a 2-hop
    /// concentrated-liquidity path may use. 3-hop legs always use the lowest tier only.
    pub multihop_fee_tier_cap: usize,
}

impl Default for EnumerationOptions {
    fn default() -> Self {
        Self {
            max_hops: 3,
            multihop_fee_tier_cap: 2,
        }
    }
}

/// Token paths at the pool level (native already mapped to wrapped), shortest first.
fn token_paths(a: &Token, b: &Token, bridges: &[Token], max_hops: usize) -> Vec<Vec<Token>> {
    let mut paths = vec![vec![a.clone(), b.clone()]];
    let usable: Vec<&Token> = bridges.iter().filter(|t| *t != a && *t != b).collect();

    if max_hops >= 2 {
        for bridge in &usable {
            paths.push(vec![a.clone(), (*bridge).clone(), b.clone()]);
        }
    }
    if max_hops >= 3 {
        for first in &usable {
            for second in &usable {
                if first != second {
                    paths.push(vec![a.clone(), (*first).clone(), (*second).clone(), b.clone()]);
                }
            }
        }
    }
    paths
}

/// Fee-tier assignments for the legs of a concentrated-liquidity path. Direct paths keep
/// the registry order; multi-hop legs are capped to the lowest tiers.
fn fee_tier_combinations(tiers: &[u32], legs: usize, cap: usize) -> Vec<Vec<u32>> {
    let mut ascending = tiers.to_vec();
    ascending.sort_unstable();
    ascending.dedup();
    let allowed: &[u32] = match legs {
        1 => tiers,
        2 => &ascending[..cap.max(1).min(ascending.len())],
        _ => &ascending[..ascending.len().min(1)],
    };
    let mut combos: Vec<Vec<u32>> = vec![Vec::new()];
    for _ in 0..legs {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                allowed.iter().map(move |fee| {
                    let mut next = prefix.clone();
                    next.push(*fee);
                    next
                })
            })
            .collect();
    }
    combos
}

fn hops_for(path: &[Token], specs: &[HopSpec]) -> Vec<CandidateHop> {
    path.windows(2)
        .zip(specs)
        .map(|(pair, spec)| CandidateHop {
            token_in: pair[0].clone(),
            token_out: pair[1].clone(),
            spec: *spec,
        })
        .collect()
}

fn wrap_candidate(token_in: &Token, token_out: &Token, chain: &ChainContractData) -> RouteCandidate {
    let action = if token_in.is_native() {
        WrapAction::Deposit
    } else {
        WrapAction::Withdraw
    };
    RouteCandidate {
        deployment: DexDeployment::Wrapped {
            contract: chain.wrapped.address,
        },
        precedence: chain.precedence_of(DexId::WrappedContract),
        token_in: token_in.clone(),
        token_out: token_out.clone(),
        hops: vec![CandidateHop {
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            spec: HopSpec::Wrap(action),
        }],
    }
}

/// All candidate routes for `token_in -> token_out` on `chain`, deduplicated, in
/// deployment order then bridge order.
pub fn enumerate(
    token_in: &Token,
    token_out: &Token,
    chain: &ChainContractData,
    options: &EnumerationOptions,
) -> Vec<RouteCandidate> {
    let a = chain.pool_token(token_in);
    let b = chain.pool_token(token_out);

    if a == b {
        // native <-> wrapped is a deposit/withdraw and nothing else
        if token_in != token_out && (token_in.is_native() || token_out.is_native()) {
            return vec![wrap_candidate(token_in, token_out, chain)];
        }
        return Vec::new();
    }

    let paths = token_paths(&a, &b, &chain.bridge_tokens, options.max_hops.max(1));
    let mut unique: IndexMap<CandidateKey, RouteCandidate> = IndexMap::new();

    for deployment in &chain.protocols {
        let precedence = chain.precedence_of(deployment.dex());
        let spec_sets: Vec<(usize, Vec<HopSpec>)> = paths
            .iter()
            .enumerate()
            .flat_map(|(i, path)| {
                let legs = path.len() - 1;
                let specs: Vec<Vec<HopSpec>> = match deployment {
                    DexDeployment::ConstantProduct(_) => vec![vec![HopSpec::Plain; legs]],
                    DexDeployment::DualPool(_) => vec![vec![HopSpec::DualPool; legs]],
                    DexDeployment::Concentrated(d) => {
                        fee_tier_combinations(&d.fee_tiers, legs, options.multihop_fee_tier_cap)
                            .into_iter()
                            .map(|fees| fees.into_iter().map(HopSpec::FeeTier).collect())
                            .collect()
                    }
                    DexDeployment::Wrapped { .. } => Vec::new(),
                };
                specs.into_iter().map(move |s| (i, s))
            })
            .collect();

        for (path_index, specs) in spec_sets {
            let candidate = RouteCandidate {
                deployment: deployment.clone(),
                precedence,
                token_in: token_in.clone(),
                token_out: token_out.clone(),
                hops: hops_for(&paths[path_index], &specs),
            };
            if !candidate.is_valid() {
                continue;
            }
            let key = (
                candidate.dex(),
                candidate
                    .hops
                    .iter()
                    .map(|h| (h.token_in.address, h.token_out.address, h.spec))
                    .collect(),
            );
            unique.entry(key).or_insert(candidate);
        }
    }

    let candidates: Vec<RouteCandidate> = unique.into_values().collect();
    log::debug!(
        "Enumerated {} candidates for {} -> {} on chain {}",
        candidates.len(),
        token_in.symbol,
        token_out.symbol,
        chain.chain_id
    );
    candidates
}
