use thiserror::Error;

use crate::{
    db_types::{NewStockItem, Sku, StockFilter, StockItem},
    traits::StockLevel,
};

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Stock item {0} does not exist")]
    ItemNotFound(i64),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}

/// The `InventoryManagement` trait defines the behaviour of the inventory pool.
///
/// Stock items are finite and non-fungible. Once an item has been claimed it is never handed out again.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Adds a single item to the pool. The item is available to claims immediately.
    async fn add_stock(&self, item: NewStockItem) -> Result<StockItem, InventoryError>;

    /// Counts the unused items matching the filter. This is a read-only call.
    async fn available_count(&self, filter: &StockFilter) -> Result<i64, InventoryError>;

    /// Returns the number of unused items for every SKU in the region that has at least one available.
    async fn stock_levels(&self, region: &str) -> Result<Vec<StockLevel>, InventoryError>;

    /// Atomically selects the oldest unused item for the SKU and marks it as used.
    ///
    /// Returns `None` when nothing matches. Two concurrent calls never return the same item.
    async fn claim_one(&self, sku: &Sku) -> Result<Option<StockItem>, InventoryError>;

    async fn fetch_stock_item(&self, id: i64) -> Result<Option<StockItem>, InventoryError>;

    /// Fetches the item that was bound to the given order, if any.
    async fn fetch_item_for_order(&self, order_id: i64) -> Result<Option<StockItem>, InventoryError>;
}
