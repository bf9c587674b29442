use thiserror::Error;

pub const DEFAULT_MIN_REFUND_ADDRESS_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefundAddressError {
    #[error("The address is too short. Expected at least {min} characters, got {len}")]
    TooShort { min: usize, len: usize },
    #[error("The address may not contain whitespace")]
    ContainsWhitespace,
}

/// Plausibility check for a user-supplied payout address. This is a cheap syntactic filter, not a checksum
/// validation; the payment node has the final word when the payout is sent.
///
/// Returns the trimmed address.
pub fn validate_refund_address(text: &str, min_len: usize) -> Result<String, RefundAddressError> {
    let address = text.trim();
    if address.chars().any(char::is_whitespace) {
        return Err(RefundAddressError::ContainsWhitespace);
    }
    let len = address.chars().count();
    if len < min_len {
        return Err(RefundAddressError::TooShort { min: min_len, len });
    }
    Ok(address.to_string())
}
