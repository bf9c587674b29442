use thiserror::Error;

use crate::traits::{FulfilmentResult, InventoryError, InventoryManagement, OrderLedgerError, OrderManagement};

#[derive(Debug, Clone, Error)]
pub enum FulfilmentError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
}

impl From<sqlx::Error> for FulfilmentError {
    fn from(e: sqlx::Error) -> Self {
        FulfilmentError::DatabaseError(e.to_string())
    }
}

impl From<OrderLedgerError> for FulfilmentError {
    fn from(e: OrderLedgerError) -> Self {
        match e {
            OrderLedgerError::OrderNotFound(id) => FulfilmentError::OrderNotFound(id),
            e => FulfilmentError::DatabaseError(e.to_string()),
        }
    }
}

impl From<InventoryError> for FulfilmentError {
    fn from(e: InventoryError) -> Self {
        FulfilmentError::DatabaseError(e.to_string())
    }
}

/// `FulfilmentDatabase` is the top-level contract a storage backend must satisfy to drive the engine.
///
/// Besides order and inventory storage, it provides the one operation that spans both: claiming a stock item for a
/// paid order and marking the order as delivered, as a single atomic unit.
#[allow(async_fn_in_trait)]
pub trait FulfilmentDatabase: Clone + OrderManagement + InventoryManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Claims the oldest matching stock item for the order and sets `delivered`, atomically.
    ///
    /// * If the order is not paid, already delivered, refunded, or reserved for a refund payout, nothing changes and
    ///   [`FulfilmentResult::NotDeliverable`] is returned.
    /// * If no stock matches, nothing changes and [`FulfilmentResult::OutOfStock`] is returned.
    /// * Concurrent calls for the same order deliver it at most once; the loser sees `NotDeliverable` and the item
    ///   it tentatively claimed is released by the rollback.
    async fn fulfil_order(&self, order_id: i64) -> Result<FulfilmentResult, FulfilmentError>;
}
