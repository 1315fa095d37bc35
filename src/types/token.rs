use ethers::types::{Address, H160, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::types::conversions::{u256_to_decimal, ConversionError};

/// Sentinel address standing in for a chain's gas token (ETH, BNB, POL, ...).
pub const NATIVE_TOKEN_ADDRESS: Address = H160([0xee; 20]);

/// A token as the application knows it.
///
/// Identity is the `(chain_id, address)` pair. Addresses are parsed into raw bytes, so
/// differently-cased hex strings for the same address compare equal. `symbol`,
/// `decimals` and `display_image` are descriptive and do not take part in equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
    #[serde(default)]
    pub display_image: Option<String>,
}

impl Token {
    pub fn new(chain_id: u64, address: Address, decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            chain_id,
            address,
            decimals,
            symbol: symbol.into(),
            display_image: None,
        }
    }

    pub fn native(chain_id: u64, symbol: impl Into<String>) -> Self {
        Self::new(chain_id, NATIVE_TOKEN_ADDRESS, 18, symbol)
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.display_image = Some(url.into());
        self
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN_ADDRESS
    }

    /// Formats a raw amount of this token for display.
    pub fn format_amount(&self, raw: U256) -> Result<Decimal, ConversionError> {
        u256_to_decimal(raw, self.decimals)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#x})", self.symbol, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;

    #[test]
    fn test_identity_ignores_descriptive_fields() {
        let a = Token::new(1, Address::from_low_u64_be(7), 18, "AAA");
        let b = Token::new(1, Address::from_low_u64_be(7), 6, "renamed").with_image("x.png");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_identity_includes_chain() {
        let a = Token::new(1, Address::from_low_u64_be(7), 18, "AAA");
        let b = Token::new(10, Address::from_low_u64_be(7), 18, "AAA");
        assert_ne!(a, b);
    }

    #[test]
    fn test_native_sentinel() {
        let parsed = Address::from_str("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE").unwrap();
        assert_eq!(parsed, NATIVE_TOKEN_ADDRESS);
        assert!(Token::native(1, "ETH").is_native());
    }
}
