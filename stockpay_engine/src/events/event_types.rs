use serde::{Deserialize, Serialize};

use crate::db_types::{Order, StockItem};

/// Payment for the order was observed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// A stock item was bound to the order. Subscribers are expected to hand `item.payload_ref` to the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDeliveredEvent {
    pub order: Order,
    pub item: StockItem,
}

impl OrderDeliveredEvent {
    pub fn new(order: Order, item: StockItem) -> Self {
        Self { order, item }
    }
}

/// The order was paid but no matching stock was left. Subscribers should offer the owner a refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOutOfStockEvent {
    pub order: Order,
}

impl OrderOutOfStockEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// The refund payout was sent. `order.refund_tx` holds the transaction reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRefundedEvent {
    pub order: Order,
}

impl OrderRefundedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
