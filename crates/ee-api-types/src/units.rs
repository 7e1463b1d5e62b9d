use alloy_primitives::{U256, utils};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must not be negative")]
    Negative,
    #[error("amount is not a decimal number: {0}")]
    Malformed(String),
}

/// Converts a human decimal amount ("2.5") to wei.
pub fn parse_ether(input: &str) -> Result<U256, UnitsError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UnitsError::Empty);
    }
    if trimmed.starts_with('-') {
        return Err(UnitsError::Negative);
    }
    utils::parse_ether(trimmed).map_err(|err| UnitsError::Malformed(format!("{trimmed}: {err}")))
}

/// Inverse of [`parse_ether`], without trailing zeros but always with one
/// decimal place, so one ether renders as `"1.0"`.
pub fn format_ether(amount: U256) -> String {
    let full = utils::format_ether(amount);
    let Some((whole, fraction)) = full.split_once('.') else {
        return format!("{full}.0");
    };
    match fraction.trim_end_matches('0') {
        "" => format!("{whole}.0"),
        fraction => format!("{whole}.{fraction}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn decimal_price_round_trips() -> Result<(), UnitsError> {
        let wei = parse_ether("2.5")?;
        assert_eq!(wei, U256::from(5 * ONE_ETHER / 2));
        assert_eq!(format_ether(wei), "2.5");
        Ok(())
    }

    #[test]
    fn whole_amounts_keep_one_decimal() -> Result<(), UnitsError> {
        assert_eq!(format_ether(parse_ether("1")?), "1.0");
        assert_eq!(format_ether(U256::ZERO), "0.0");
        Ok(())
    }

    #[test]
    fn smallest_unit_is_representable() -> Result<(), UnitsError> {
        assert_eq!(parse_ether("0.000000000000000001")?, U256::from(1));
        assert_eq!(format_ether(U256::from(1)), "0.000000000000000001");
        Ok(())
    }

    #[test]
    fn amounts_beyond_128_bits_format() {
        let huge = U256::from(1) << 128;
        assert_eq!(format_ether(huge), "340282366920938463463.374607431768211456");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_ether("  "), Err(UnitsError::Empty));
        assert_eq!(parse_ether("-1"), Err(UnitsError::Negative));
        assert!(matches!(parse_ether("abc"), Err(UnitsError::Malformed(_))));
    }
}
