use thiserror::Error;

use crate::{
    catalog::CatalogError,
    db_types::Sku,
    helpers::RefundAddressError,
    traits::{FulfilmentError, InventoryError, OrderLedgerError, PaymentNodeError, PriceOracleError},
};

#[derive(Debug, Clone, Error)]
pub enum QuoteError {
    #[error("{0}")]
    UnknownProduct(#[from] CatalogError),
    #[error("No price quote is available right now. {0}")]
    QuoteUnavailable(String),
}

impl From<PriceOracleError> for QuoteError {
    fn from(e: PriceOracleError) -> Self {
        QuoteError::QuoteUnavailable(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("{0}")]
    UnknownProduct(String),
    #[error("{0} is out of stock")]
    OutOfStock(Sku),
    #[error("No price quote is available right now. {0}")]
    QuoteUnavailable(String),
    #[error("Could not obtain a deposit address. {0}")]
    DepositAddressUnavailable(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<QuoteError> for OrderFlowError {
    fn from(e: QuoteError) -> Self {
        match e {
            QuoteError::UnknownProduct(e) => OrderFlowError::UnknownProduct(e.to_string()),
            QuoteError::QuoteUnavailable(s) => OrderFlowError::QuoteUnavailable(s),
        }
    }
}

impl From<CatalogError> for OrderFlowError {
    fn from(e: CatalogError) -> Self {
        OrderFlowError::UnknownProduct(e.to_string())
    }
}

impl From<OrderLedgerError> for OrderFlowError {
    fn from(e: OrderLedgerError) -> Self {
        match e {
            OrderLedgerError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            // A reused deposit address is a node fault, not a database fault
            OrderLedgerError::DuplicateAddress(a) => {
                OrderFlowError::DepositAddressUnavailable(format!("the node handed out {a} twice"))
            },
            e => OrderFlowError::DatabaseError(e.to_string()),
        }
    }
}

impl From<InventoryError> for OrderFlowError {
    fn from(e: InventoryError) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum InventoryApiError {
    #[error("{0}")]
    UnknownProduct(#[from] CatalogError),
    #[error("The stock payload may not be empty")]
    EmptyPayload,
    #[error("{0} has no upload session open")]
    NoUploadSession(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<InventoryError> for InventoryApiError {
    fn from(e: InventoryError) -> Self {
        InventoryApiError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Could not query the payment ledger. {0}")]
    LedgerQueryFailed(#[from] PaymentNodeError),
}

impl From<OrderLedgerError> for ReconciliationError {
    fn from(e: OrderLedgerError) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}

impl From<FulfilmentError> for ReconciliationError {
    fn from(e: FulfilmentError) -> Self {
        ReconciliationError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum RefundError {
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Order {0} belongs to someone else")]
    NotOwner(i64),
    #[error("Order {0} has not been paid")]
    NotPaid(i64),
    #[error("Order {0} has already been delivered")]
    AlreadyDelivered(i64),
    #[error("Order {0} has already been refunded")]
    AlreadyRefunded(i64),
    #[error("No refund has been requested for order {0}")]
    NoRefundRequested(i64),
    #[error("There is no refund waiting for an address")]
    NoPendingRefund,
    #[error("Invalid refund address. {0}")]
    InvalidRefundAddress(String),
    #[error("The refund payout failed. {0}")]
    PayoutFailed(String),
    #[error("A payout for order {0} is already in progress")]
    PayoutInProgress(i64),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<OrderLedgerError> for RefundError {
    fn from(e: OrderLedgerError) -> Self {
        match e {
            OrderLedgerError::OrderNotFound(id) => RefundError::OrderNotFound(id),
            e => RefundError::DatabaseError(e.to_string()),
        }
    }
}

impl From<RefundAddressError> for RefundError {
    fn from(e: RefundAddressError) -> Self {
        RefundError::InvalidRefundAddress(e.to_string())
    }
}

impl From<PaymentNodeError> for RefundError {
    fn from(e: PaymentNodeError) -> Self {
        RefundError::PayoutFailed(e.to_string())
    }
}
