//! Built-in chain data.
//!
//! Addresses are `const` items decoded at compile time, so a malformed literal fails the
//! build instead of the first lookup.

use ethers::types::{Address, H160};

use super::{ChainContractData, ConcentratedDex, ConstantProductDex, DexDeployment, DualPoolDex};
use crate::router::DexId;
use crate::types::Token;

const fn hex_nibble(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => panic!("invalid hex digit in address literal"),
    }
}

/// Decodes a `0x`-prefixed, 40 digit hex address in a const context.
const fn addr(s: &str) -> Address {
    let bytes = s.as_bytes();
    assert!(bytes.len() == 42 && bytes[0] == b'0' && bytes[1] == b'x');
    let mut out = [0u8; 20];
    let mut i = 0;
    while i < 20 {
        out[i] = (hex_nibble(bytes[2 + 2 * i]) << 4) | hex_nibble(bytes[3 + 2 * i]);
        i += 1;
    }
    H160(out)
}

// Uniswap, shared across most EVM chains
const UNIV3_FACTORY: Address = addr("0x1F98431c8aD98523631AE4a59f267346ea31F984");
const UNIV3_QUOTER_V2: Address = addr("0x61fFE014bA17989E743c5F6cB21bF9697530B21e");
const UNIV3_SWAP_ROUTER_02: Address = addr("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45");
const UNIV3_FEE_TIERS: [u32; 4] = [500, 3000, 100, 10000];

// Ethereum
const ETH_WETH: Address = addr("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
const ETH_USDC: Address = addr("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
const ETH_USDT: Address = addr("0xdAC17F958D2ee523a2206206994597C13D831ec7");
const ETH_DAI: Address = addr("0x6B175474E89094C44Da98b954EedeAC495271d0F");
const ETH_WBTC: Address = addr("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599");
const ETH_UNIV2_FACTORY: Address = addr("0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
const ETH_UNIV2_ROUTER: Address = addr("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
const ETH_SUSHI_FACTORY: Address = addr("0xC0AEe478e3658e2610c5F7A4A2E1777cE9e4f2Ac");
const ETH_SUSHI_ROUTER: Address = addr("0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F");

// Optimism
const OP_WETH: Address = addr("0x4200000000000000000000000000000000000006");
const OP_USDC: Address = addr("0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85");
const OP_USDT: Address = addr("0x94b008aA00579c1307B0EF2c499aD98a8ce58e58");
const OP_DAI: Address = addr("0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1");
const OP_WBTC: Address = addr("0x68f180fcCe6836688e9084f035309E29Bf0A2095");
const OP_UNIV2_FACTORY: Address = addr("0x0c3c1c532F1e39EdF36BE9Fe0bE1410313E074Bf");
const OP_UNIV2_ROUTER: Address = addr("0x4A7b5Da61326A6379179b40d00F57E5bbDC962c2");
const OP_VELO_FACTORY: Address = addr("0xF1046053aa5682b4F9a81b5481394DA16BE5FF5a");
const OP_VELO_ROUTER: Address = addr("0xa062aE8A9c5e11aaA026fc2670B0D65cCc8B2858");

// BNB Smart Chain
const BSC_WBNB: Address = addr("0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");
const BSC_USDT: Address = addr("0x55d398326f99059fF775485246999027B3197955");
const BSC_USDC: Address = addr("0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d");
const BSC_BTCB: Address = addr("0x7130d2A12B9BCbFAe4f2634d864A1Ee1Ce3Ead9c");
const BSC_ETH: Address = addr("0x2170Ed0880ac9A755fd29B2688956BD959F933F8");
const BSC_PCS_V2_FACTORY: Address = addr("0xcA143Ce32Fe78f1f7019d7d551a6402fC5350c73");
const BSC_PCS_V2_ROUTER: Address = addr("0x10ED43C718714eb63d5aA57B78B54704E256024E");
const BSC_PCS_V3_FACTORY: Address = addr("0x0BFbCF9fa4f9C56B0F40a671Ad40E0805A091865");
const BSC_PCS_V3_QUOTER: Address = addr("0xB048Bbc1Ee6b733FFfCFb9e9CeF7375518e25997");
const BSC_PCS_V3_ROUTER: Address = addr("0x13f4EA83D0bd40E75C8222255bc855a974568Dd4");

// Polygon
const POLY_WPOL: Address = addr("0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270");
const POLY_USDC: Address = addr("0x3c499c542cEF5E3811e1192ce70d8cC03d5c3359");
const POLY_USDT: Address = addr("0xc2132D05D31c914a87C6611C10748AEb04B58e8F");
const POLY_WETH: Address = addr("0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619");
const POLY_WBTC: Address = addr("0x1BFD67037B42Cf73acF2047067bd4F2C47D9BfD6");
const POLY_QUICK_FACTORY: Address = addr("0x5757371414417b8C6CAad45bAeF941aBc7d3Ab32");
const POLY_QUICK_ROUTER: Address = addr("0xa5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff");

// Base
const BASE_WETH: Address = addr("0x4200000000000000000000000000000000000006");
const BASE_USDC: Address = addr("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
const BASE_DAI: Address = addr("0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb");
const BASE_CBBTC: Address = addr("0xcbB7C0000aB88B473b1f5aFd9ef808440eed33Bf");
const BASE_UNIV2_FACTORY: Address = addr("0x8909Dc15e40173Ff4699343b6eB8132c65e18eC6");
const BASE_UNIV2_ROUTER: Address = addr("0x4752ba5DBc23f44D87826276BF6Fd6b1C372aD24");
const BASE_UNIV3_FACTORY: Address = addr("0x33128a8fC17869897dcE68Ed026d694621f6FDfD");
const BASE_UNIV3_QUOTER_V2: Address = addr("0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a");
const BASE_UNIV3_ROUTER: Address = addr("0x2626664c2603336E57B271c5C0b26F421741e481");
const BASE_AERO_FACTORY: Address = addr("0x420DD381b31aEf6683db6B902084cB0FFECe40Da");
const BASE_AERO_ROUTER: Address = addr("0xcF77a3Ba9A5CA399B7c97c74d54e5b1Beb874E43");

// Arbitrum One
const ARB_WETH: Address = addr("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1");
const ARB_USDC: Address = addr("0xaf88d065e77c8cC2239327C5EDb3A432268e5831");
const ARB_USDT: Address = addr("0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9");
const ARB_WBTC: Address = addr("0x2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f");
const ARB_DAI: Address = addr("0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1");
const ARB_UNIV2_FACTORY: Address = addr("0xf1D7CC64Fb4452F05c498126312eBE29f30Fbcf9");
const ARB_UNIV2_ROUTER: Address = addr("0x4752ba5DBc23f44D87826276BF6Fd6b1C372aD24");
const ARB_SUSHI_FACTORY: Address = addr("0xc35DADB65012eC5796536bD9864eD8773aBc74C4");
const ARB_SUSHI_ROUTER: Address = addr("0x1b02dA8Cb0d097eB8D57A175b88c7D8b47997506");

fn constant_product(dex: DexId, factory: Address, router: Address, fee_bps: u32) -> DexDeployment {
    DexDeployment::ConstantProduct(ConstantProductDex {
        dex,
        factory,
        router,
        fee_bps,
    })
}

fn uniswap_v3(factory: Address, quoter: Address, router: Address) -> DexDeployment {
    DexDeployment::Concentrated(ConcentratedDex {
        dex: DexId::UniswapV3,
        factory,
        quoter,
        router,
        fee_tiers: UNIV3_FEE_TIERS.to_vec(),
    })
}

fn ethereum() -> ChainContractData {
    let id = 1;
    let weth = Token::new(id, ETH_WETH, 18, "WETH");
    ChainContractData {
        chain_id: id,
        name: "Ethereum".to_string(),
        native: Token::native(id, "ETH"),
        wrapped: weth.clone(),
        protocols: vec![
            constant_product(DexId::UniswapV2, ETH_UNIV2_FACTORY, ETH_UNIV2_ROUTER, 30),
            constant_product(DexId::SushiSwapV2, ETH_SUSHI_FACTORY, ETH_SUSHI_ROUTER, 30),
            uniswap_v3(UNIV3_FACTORY, UNIV3_QUOTER_V2, UNIV3_SWAP_ROUTER_02),
        ],
        bridge_tokens: vec![
            weth,
            Token::new(id, ETH_USDC, 6, "USDC"),
            Token::new(id, ETH_USDT, 6, "USDT"),
            Token::new(id, ETH_DAI, 18, "DAI"),
            Token::new(id, ETH_WBTC, 8, "WBTC"),
        ],
    }
}

fn optimism() -> ChainContractData {
    let id = 10;
    let weth = Token::new(id, OP_WETH, 18, "WETH");
    ChainContractData {
        chain_id: id,
        name: "Optimism".to_string(),
        native: Token::native(id, "ETH"),
        wrapped: weth.clone(),
        protocols: vec![
            constant_product(DexId::UniswapV2, OP_UNIV2_FACTORY, OP_UNIV2_ROUTER, 30),
            uniswap_v3(UNIV3_FACTORY, UNIV3_QUOTER_V2, UNIV3_SWAP_ROUTER_02),
            DexDeployment::DualPool(DualPoolDex {
                dex: DexId::Velodrome,
                factory: OP_VELO_FACTORY,
                router: OP_VELO_ROUTER,
            }),
        ],
        bridge_tokens: vec![
            weth,
            Token::new(id, OP_USDC, 6, "USDC"),
            Token::new(id, OP_USDT, 6, "USDT"),
            Token::new(id, OP_DAI, 18, "DAI"),
            Token::new(id, OP_WBTC, 8, "WBTC"),
        ],
    }
}

fn bsc() -> ChainContractData {
    let id = 56;
    let wbnb = Token::new(id, BSC_WBNB, 18, "WBNB");
    ChainContractData {
        chain_id: id,
        name: "BNB Smart Chain".to_string(),
        native: Token::native(id, "BNB"),
        wrapped: wbnb.clone(),
        protocols: vec![
            constant_product(DexId::PancakeSwapV2, BSC_PCS_V2_FACTORY, BSC_PCS_V2_ROUTER, 25),
            DexDeployment::Concentrated(ConcentratedDex {
                dex: DexId::PancakeSwapV3,
                factory: BSC_PCS_V3_FACTORY,
                quoter: BSC_PCS_V3_QUOTER,
                router: BSC_PCS_V3_ROUTER,
                fee_tiers: vec![500, 2500, 100, 10000],
            }),
        ],
        bridge_tokens: vec![
            wbnb,
            Token::new(id, BSC_USDT, 18, "USDT"),
            Token::new(id, BSC_USDC, 18, "USDC"),
            Token::new(id, BSC_BTCB, 18, "BTCB"),
            Token::new(id, BSC_ETH, 18, "ETH"),
        ],
    }
}

fn polygon() -> ChainContractData {
    let id = 137;
    let wpol = Token::new(id, POLY_WPOL, 18, "WPOL");
    ChainContractData {
        chain_id: id,
        name: "Polygon".to_string(),
        native: Token::native(id, "POL"),
        wrapped: wpol.clone(),
        protocols: vec![
            constant_product(DexId::QuickSwapV2, POLY_QUICK_FACTORY, POLY_QUICK_ROUTER, 30),
            uniswap_v3(UNIV3_FACTORY, UNIV3_QUOTER_V2, UNIV3_SWAP_ROUTER_02),
        ],
        bridge_tokens: vec![
            wpol,
            Token::new(id, POLY_USDC, 6, "USDC"),
            Token::new(id, POLY_USDT, 6, "USDT"),
            Token::new(id, POLY_WETH, 18, "WETH"),
            Token::new(id, POLY_WBTC, 8, "WBTC"),
        ],
    }
}

fn base() -> ChainContractData {
    let id = 8453;
    let weth = Token::new(id, BASE_WETH, 18, "WETH");
    ChainContractData {
        chain_id: id,
        name: "Base".to_string(),
        native: Token::native(id, "ETH"),
        wrapped: weth.clone(),
        protocols: vec![
            constant_product(DexId::UniswapV2, BASE_UNIV2_FACTORY, BASE_UNIV2_ROUTER, 30),
            uniswap_v3(BASE_UNIV3_FACTORY, BASE_UNIV3_QUOTER_V2, BASE_UNIV3_ROUTER),
            DexDeployment::DualPool(DualPoolDex {
                dex: DexId::Aerodrome,
                factory: BASE_AERO_FACTORY,
                router: BASE_AERO_ROUTER,
            }),
        ],
        bridge_tokens: vec![
            weth,
            Token::new(id, BASE_USDC, 6, "USDC"),
            Token::new(id, BASE_DAI, 18, "DAI"),
            Token::new(id, BASE_CBBTC, 8, "cbBTC"),
        ],
    }
}

fn arbitrum() -> ChainContractData {
    let id = 42161;
    let weth = Token::new(id, ARB_WETH, 18, "WETH");
    ChainContractData {
        chain_id: id,
        name: "Arbitrum One".to_string(),
        native: Token::native(id, "ETH"),
        wrapped: weth.clone(),
        protocols: vec![
            constant_product(DexId::UniswapV2, ARB_UNIV2_FACTORY, ARB_UNIV2_ROUTER, 30),
            constant_product(DexId::SushiSwapV2, ARB_SUSHI_FACTORY, ARB_SUSHI_ROUTER, 30),
            uniswap_v3(UNIV3_FACTORY, UNIV3_QUOTER_V2, UNIV3_SWAP_ROUTER_02),
        ],
        bridge_tokens: vec![
            weth,
            Token::new(id, ARB_USDC, 6, "USDC"),
            Token::new(id, ARB_USDT, 6, "USDT"),
            Token::new(id, ARB_WBTC, 8, "WBTC"),
            Token::new(id, ARB_DAI, 18, "DAI"),
        ],
    }
}

pub(super) fn builtin_chains() -> Vec<ChainContractData> {
    vec![ethereum(), optimism(), bsc(), polygon(), base(), arbitrum()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_const_address_decoding() {
        let parsed = Address::from_str("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2").unwrap();
        assert_eq!(ETH_WETH, parsed);
        assert_eq!(OP_WETH.as_bytes()[0], 0x42);
        assert_eq!(OP_WETH.as_bytes()[19], 0x06);
        assert_eq!(OP_WETH, BASE_WETH);
    }
}
