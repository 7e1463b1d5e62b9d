use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("malformed address: {0}")]
    Malformed(String),
    #[error("mixed-case address fails its checksum")]
    BadChecksum,
}

/// Parses user or wallet input. All-lowercase and all-uppercase spellings
/// are taken as-is; a mixed-case spelling must carry a valid EIP-55
/// checksum.
pub fn parse_address(input: &str) -> Result<Address, AddressError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());

    if has_lower && has_upper {
        return Address::parse_checksummed(format!("0x{digits}"), None).map_err(|err| match err {
            alloy_primitives::AddressError::InvalidChecksum => AddressError::BadChecksum,
            other => AddressError::Malformed(other.to_string()),
        });
    }
    digits
        .parse::<Address>()
        .map_err(|err| AddressError::Malformed(err.to_string()))
}

/// `0x1234...abcd`, the form used in headers and badges.
pub fn short_address(address: &Address) -> String {
    let full = address.to_checksum(None);
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKSUMMED: [&str; 4] = [
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn lowercase_input_renders_checksummed() -> Result<(), AddressError> {
        for expected in CHECKSUMMED {
            let address = parse_address(&expected.to_lowercase())?;
            assert_eq!(address.to_checksum(None), expected);
        }
        Ok(())
    }

    #[test]
    fn checksummed_and_uppercase_spellings_agree() -> Result<(), AddressError> {
        let upper = format!("0x{}", CHECKSUMMED[0][2..].to_uppercase());
        assert_eq!(parse_address(CHECKSUMMED[0])?, parse_address(&upper)?);
        assert_eq!(parse_address(&format!("  {}  ", CHECKSUMMED[1]))?, parse_address(CHECKSUMMED[1])?);
        Ok(())
    }

    #[test]
    fn mixed_case_with_bad_checksum_is_rejected() {
        let broken = "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert_eq!(parse_address(broken), Err(AddressError::BadChecksum));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(parse_address("  "), Err(AddressError::Empty));
        assert!(matches!(parse_address("0x1234"), Err(AddressError::Malformed(_))));
        assert!(matches!(
            parse_address("0xzz5aeb6053f3e94c9b9a09f33669435e7ef1beae"),
            Err(AddressError::Malformed(_))
        ));
    }

    #[test]
    fn short_form_keeps_prefix_and_tail() -> Result<(), AddressError> {
        let address = parse_address(CHECKSUMMED[0])?;
        assert_eq!(short_address(&address), "0x5aAe...eAed");
        Ok(())
    }
}
