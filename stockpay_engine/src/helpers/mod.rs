mod refund_address;
mod sizes;

pub use refund_address::{validate_refund_address, RefundAddressError, DEFAULT_MIN_REFUND_ADDRESS_LEN};
pub use sizes::normalize_size;
