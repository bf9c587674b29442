use mockall::mock;
use rust_decimal::Decimal;
use spg_common::CoinAmount;
use stockpay_engine::traits::{PaymentNode, PaymentNodeError, PriceOracle, PriceOracleError};

mock! {
    pub Node {}
    impl PaymentNode for Node {
        async fn new_deposit_address(&self) -> Result<String, PaymentNodeError>;
        async fn received_at_address(&self, address: &str, min_confirmations: u32) -> Result<CoinAmount, PaymentNodeError>;
        async fn send_to(&self, address: &str, amount: CoinAmount) -> Result<String, PaymentNodeError>;
    }
}

mock! {
    pub Oracle {}
    impl PriceOracle for Oracle {
        async fn current_rate(&self, asset: &str) -> Result<Decimal, PriceOracleError>;
    }
}
