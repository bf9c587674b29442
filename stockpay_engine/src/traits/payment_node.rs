use spg_common::CoinAmount;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PaymentNodeError {
    #[error("Could not reach the payment node. {0}")]
    Transport(String),
    #[error("The payment node returned an error ({code}): {message}")]
    Rpc { code: i64, message: String },
    #[error("The payment node returned an unexpected response. {0}")]
    InvalidResponse(String),
}

/// The narrow interface to the payment ledger. The engine trusts the node's answers.
#[allow(async_fn_in_trait)]
pub trait PaymentNode {
    /// Generates a fresh deposit address. Every call must return an address that has never been handed out before.
    async fn new_deposit_address(&self) -> Result<String, PaymentNodeError>;

    /// The total amount ever received at `address` in transactions with at least `min_confirmations` confirmations.
    async fn received_at_address(&self, address: &str, min_confirmations: u32)
        -> Result<CoinAmount, PaymentNodeError>;

    /// Sends `amount` to `address` and returns the transaction reference.
    async fn send_to(&self, address: &str, amount: CoinAmount) -> Result<String, PaymentNodeError>;
}
