use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Sku, StockItem};

/// The outcome of trying to bind a paid order to a stock item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfilmentResult {
    /// A stock item was claimed for the order and the order is now marked as delivered.
    Delivered { order: Order, item: StockItem },
    /// No matching stock was available. Nothing was changed.
    OutOfStock(Order),
    /// The order is not in a deliverable state (unpaid, delivered, refunded or held for a payout). Nothing changed.
    NotDeliverable(Order),
}

impl FulfilmentResult {
    pub fn order(&self) -> &Order {
        match self {
            FulfilmentResult::Delivered { order, .. } => order,
            FulfilmentResult::OutOfStock(order) => order,
            FulfilmentResult::NotDeliverable(order) => order,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, FulfilmentResult::Delivered { .. })
    }
}

/// Number of unused items for one SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub sku: Sku,
    pub available: i64,
}
