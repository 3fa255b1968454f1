//! Ethereum account address parsing and EIP-55 checksum encoding.

pub use alloy_primitives::Address;

/// Parse a `0x`-prefixed, 40 hex digit address. Case is not checked.
pub fn parse_address(input: &str) -> Option<Address> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))?;
    if digits.len() != 40 {
        return None;
    }
    digits.parse().ok()
}

/// Render an address in EIP-55 mixed-case checksum form.
pub fn to_checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Normalize any accepted spelling of an address to its checksum form.
pub fn normalize_address(input: &str) -> Option<String> {
    parse_address(input.trim()).map(|a| to_checksum(&a))
}

/// Compare two textual addresses ignoring case.
pub fn same_address(a: &str, b: &str) -> bool {
    match (parse_address(a.trim()), parse_address(b.trim())) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vectors from EIP-55
    const CHECKSUMMED: [&str; 4] = [
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn test_checksum_vectors() {
        for expected in CHECKSUMMED {
            let parsed = parse_address(&expected.to_lowercase()).unwrap();
            assert_eq!(to_checksum(&parsed), expected);
        }
    }

    #[test]
    fn test_checksum_form_accepted_by_strict_parser() {
        for expected in CHECKSUMMED {
            let parsed = parse_address(expected).unwrap();
            assert_eq!(Address::parse_checksummed(expected, None).unwrap(), parsed);
        }
    }

    #[test]
    fn test_normalize_uppercase_input() {
        let upper = format!("0x{}", &CHECKSUMMED[0][2..].to_uppercase());
        assert_eq!(normalize_address(&upper).unwrap(), CHECKSUMMED[0]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_address("").is_none());
        assert!(parse_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_none());
        assert!(parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeA").is_none());
        assert!(parse_address("0xZZAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_none());
        assert!(parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed00").is_none());
    }

    #[test]
    fn test_same_address_ignores_case() {
        assert!(same_address(CHECKSUMMED[1], &CHECKSUMMED[1].to_lowercase()));
        assert!(!same_address(CHECKSUMMED[1], CHECKSUMMED[2]));
        assert!(!same_address(CHECKSUMMED[1], "not-an-address"));
    }
}
