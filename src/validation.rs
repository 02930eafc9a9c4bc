use crate::error::RelayerError;
use ethers::types::{Address, U256};
use ethers::utils::parse_ether;
use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap());

/// Normalized, validated handler input. Produced before any network or
/// limiter interaction.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub address: Address,
    /// Amount in wei, parsed from decimal ether and verified positive.
    /// `None` when the caller omitted it and the handler default applies.
    pub amount: Option<U256>,
}

/// Validates an address plus an optional decimal ether amount. All problems
/// are collected and joined into one human-readable message. The amount is
/// parsed to wei here so nothing downstream of the limiter can still reject
/// the input as malformed.
pub fn validate_request(
    address: &str,
    amount: Option<&str>,
) -> Result<ValidatedRequest, RelayerError> {
    let mut issues: Vec<&str> = Vec::new();

    let parsed_address = if ADDRESS_RE.is_match(address) {
        address.parse::<Address>().ok()
    } else {
        None
    };
    if parsed_address.is_none() {
        issues.push("Invalid Ethereum address");
    }

    let amount = amount.map(str::trim).filter(|a| !a.is_empty());
    let mut parsed_amount = None;
    if let Some(raw) = amount {
        match parse_ether(raw) {
            Ok(value) if !value.is_zero() => parsed_amount = Some(value),
            _ => issues.push("Amount must be a positive number"),
        }
    }

    if !issues.is_empty() {
        return Err(RelayerError::Validation(issues.join(", ")));
    }

    Ok(ValidatedRequest {
        // Unwrap is safe: a None address pushed an issue above.
        address: parsed_address.unwrap(),
        amount: parsed_amount,
    })
}

/// Address-only validation for handlers without an amount.
pub fn validate_address(address: &str) -> Result<Address, RelayerError> {
    validate_request(address, None).map(|v| v.address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_address() {
        let validated =
            validate_request("0x1111111111111111111111111111111111111111", Some("0.2")).unwrap();
        assert_eq!(
            format!("{:#x}", validated.address),
            "0x1111111111111111111111111111111111111111"
        );
        assert_eq!(validated.amount, Some(U256::exp10(17) * U256::from(2u64)));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["bad", "", "0x123", "0xZZ11111111111111111111111111111111111111"] {
            let err = validate_address(bad).unwrap_err();
            assert!(err.to_string().contains("Invalid Ethereum address"));
        }
    }

    #[test]
    fn rejects_non_positive_amounts() {
        for bad in ["0", "-1", "abc", "NaN", "1e3"] {
            let err =
                validate_request("0x1111111111111111111111111111111111111111", Some(bad))
                    .unwrap_err();
            assert!(err.to_string().contains("Amount must be a positive number"));
        }
    }

    #[test]
    fn joins_multiple_issues_into_one_message() {
        let err = validate_request("nope", Some("-3")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Ethereum address, Amount must be a positive number"
        );
    }

    #[test]
    fn missing_amount_is_allowed() {
        let validated =
            validate_request("0x2222222222222222222222222222222222222222", None).unwrap();
        assert!(validated.amount.is_none());
    }
}
