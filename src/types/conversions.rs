use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Renders a raw token amount as a human-readable decimal (e.g. `1500000` with 6 decimals → `1.5`).
pub fn u256_to_decimal(value: U256, decimals: u8) -> Result<Decimal, ConversionError> {
    let mut decimal_value = Decimal::from_str(&value.to_string())
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))?;

    // Decimal tops out at 28 digits of scale
    if decimals > 28 {
        return Err(ConversionError::Overflow);
    }
    decimal_value
        .set_scale(decimals as u32)
        .map_err(|e| ConversionError::InvalidDecimal(e.to_string()))?;
    Ok(decimal_value.normalize())
}

/// Parses a human-readable amount ("1.5") into raw units for a token with `decimals`.
pub fn decimal_str_to_u256(value: &str, decimals: u8) -> Result<U256, ConversionError> {
    let trimmed = value.trim();
    let (whole, frac) = match trimmed.split_once('.') {
        Some((w, f)) => (w, f),
        None => (trimmed, ""),
    };
    if frac.len() > decimals as usize {
        return Err(ConversionError::InvalidDecimal(format!(
            "{} has more than {} fractional digits",
            trimmed, decimals
        )));
    }
    let whole = if whole.is_empty() { "0" } else { whole };
    let padded = format!("{}{:0<width$}", whole, frac, width = decimals as usize);
    U256::from_dec_str(&padded).map_err(|e| ConversionError::InvalidDecimal(e.to_string()))
}

/// Moves an amount between decimal bases, truncating when scaling down.
pub fn rescale_decimals(amount: U256, from: u8, to: u8) -> Result<U256, ConversionError> {
    if from == to {
        return Ok(amount);
    }
    if to > from {
        let factor = U256::exp10((to - from) as usize);
        amount.checked_mul(factor).ok_or(ConversionError::Overflow)
    } else {
        Ok(amount / U256::exp10((from - to) as usize))
    }
}

pub fn string_to_address(s: &str) -> Result<Address, ConversionError> {
    Address::from_str(s.trim()).map_err(|e| ConversionError::InvalidAddress(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),
    #[error("Overflow in conversion")]
    Overflow,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
