use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PriceOracleError {
    #[error("Could not reach the price oracle. {0}")]
    Unreachable(String),
    #[error("The price oracle returned an invalid rate. {0}")]
    InvalidRate(String),
    #[error("The price oracle has no rate for {0}")]
    UnknownAsset(String),
}

#[allow(async_fn_in_trait)]
pub trait PriceOracle {
    /// The current price of one unit of `asset`, in USD.
    async fn current_rate(&self, asset: &str) -> Result<Decimal, PriceOracleError>;
}
