use thiserror::Error;

use crate::db_types::{NewOrder, Order};

#[derive(Debug, Clone, Error)]
pub enum OrderLedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("Deposit address {0} is already assigned to another order")]
    DuplicateAddress(String),
}

impl From<sqlx::Error> for OrderLedgerError {
    fn from(e: sqlx::Error) -> Self {
        OrderLedgerError::DatabaseError(e.to_string())
    }
}

/// The `OrderManagement` trait defines the order ledger.
///
/// The flag-setting methods are conditional updates. Each returns `Some(order)` only if this call performed the
/// transition, and `None` if the order was already in (or past) the target state. Flags are never cleared.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Persists a new order. Fails with [`OrderLedgerError::DuplicateAddress`] if the deposit address is in use.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderLedgerError>;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderLedgerError>;

    /// All orders for the owner, newest first.
    async fn fetch_orders_for_owner(&self, owner: &str) -> Result<Vec<Order>, OrderLedgerError>;

    /// Orders with `paid = 0, delivered = 0, refunded = 0`, in ascending id order. Expiry is not considered here.
    async fn fetch_unpaid_orders(&self) -> Result<Vec<Order>, OrderLedgerError>;

    /// Orders with `paid = 1, delivered = 0, refunded = 0` and no payout in flight, in ascending id order.
    async fn fetch_orders_awaiting_delivery(&self) -> Result<Vec<Order>, OrderLedgerError>;

    /// Orders that are waiting on an operator: a refund was requested but not yet paid out.
    async fn fetch_pending_refunds(&self) -> Result<Vec<Order>, OrderLedgerError>;

    async fn mark_paid(&self, id: i64) -> Result<Option<Order>, OrderLedgerError>;

    async fn mark_out_of_stock(&self, id: i64) -> Result<Option<Order>, OrderLedgerError>;

    async fn mark_refund_requested(&self, id: i64) -> Result<Option<Order>, OrderLedgerError>;

    /// Stores the payout destination. Allowed while the order is neither delivered nor refunded and no payout is in
    /// flight.
    async fn set_refund_address(&self, id: i64, address: &str) -> Result<Option<Order>, OrderLedgerError>;

    /// Atomically sets `payout_started` on an undelivered, unrefunded order that has a refund address. Returns `None`
    /// if the order does not qualify or another payout already holds it. A reserved order cannot be delivered.
    async fn reserve_payout(&self, id: i64) -> Result<Option<Order>, OrderLedgerError>;

    /// Clears a reservation made by [`OrderManagement::reserve_payout`] on an order that was not refunded.
    async fn release_payout(&self, id: i64) -> Result<Option<Order>, OrderLedgerError>;

    /// Records a completed payout. Requires a payout reservation and an undelivered order.
    async fn mark_refunded(&self, id: i64, refund_tx: &str) -> Result<Option<Order>, OrderLedgerError>;
}
