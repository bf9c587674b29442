//! `SqliteDatabase` is a concrete implementation of a stockpay engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the storage traits defined in the [`traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, stock};
use crate::{
    db_types::{NewOrder, NewStockItem, Order, Sku, StockFilter, StockItem},
    traits::{
        FulfilmentDatabase,
        FulfilmentError,
        FulfilmentResult,
        InventoryError,
        InventoryManagement,
        OrderLedgerError,
        OrderManagement,
        StockLevel,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::insert_order(order, &mut conn).await?;
        debug!("🗃️ Order #{} saved for {} with deposit address {}", order.id, order.owner, order.address);
        Ok(order)
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders_for_owner(&self, owner: &str) -> Result<Vec<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_owner(owner, &mut conn).await?;
        Ok(orders)
    }

    async fn fetch_unpaid_orders(&self) -> Result<Vec<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unpaid_orders(&mut conn).await?;
        Ok(orders)
    }

    async fn fetch_orders_awaiting_delivery(&self) -> Result<Vec<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_awaiting_delivery(&mut conn).await?;
        Ok(orders)
    }

    async fn fetch_pending_refunds(&self) -> Result<Vec<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_refunds(&mut conn).await?;
        Ok(orders)
    }

    async fn mark_paid(&self, id: i64) -> Result<Option<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_paid(id, &mut conn).await?;
        Ok(order)
    }

    async fn mark_out_of_stock(&self, id: i64) -> Result<Option<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_out_of_stock(id, &mut conn).await?;
        Ok(order)
    }

    async fn mark_refund_requested(&self, id: i64) -> Result<Option<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_refund_requested(id, &mut conn).await?;
        Ok(order)
    }

    async fn set_refund_address(&self, id: i64, address: &str) -> Result<Option<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::set_refund_address(id, address, &mut conn).await?;
        Ok(order)
    }

    async fn reserve_payout(&self, id: i64) -> Result<Option<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::reserve_payout(id, &mut conn).await?;
        Ok(order)
    }

    async fn release_payout(&self, id: i64) -> Result<Option<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::release_payout(id, &mut conn).await?;
        Ok(order)
    }

    async fn mark_refunded(&self, id: i64, refund_tx: &str) -> Result<Option<Order>, OrderLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::mark_refunded(id, refund_tx, &mut conn).await?;
        Ok(order)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn add_stock(&self, item: NewStockItem) -> Result<StockItem, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let item = stock::insert_stock_item(item, &mut conn).await?;
        Ok(item)
    }

    async fn available_count(&self, filter: &StockFilter) -> Result<i64, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let count = stock::available_count(filter, &mut conn).await?;
        Ok(count)
    }

    async fn stock_levels(&self, region: &str) -> Result<Vec<StockLevel>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let levels = stock::stock_levels(region, &mut conn).await?;
        Ok(levels)
    }

    async fn claim_one(&self, sku: &Sku) -> Result<Option<StockItem>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let item = stock::claim_one(sku, None, &mut conn).await?;
        Ok(item)
    }

    async fn fetch_stock_item(&self, id: i64) -> Result<Option<StockItem>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let item = stock::fetch_stock_item(id, &mut conn).await?;
        Ok(item)
    }

    async fn fetch_item_for_order(&self, order_id: i64) -> Result<Option<StockItem>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let item = stock::fetch_item_for_order(order_id, &mut conn).await?;
        Ok(item)
    }
}

impl FulfilmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    /// In a single atomic transaction,
    /// * marks the order as delivered, provided it is still paid, undelivered, unrefunded and not reserved for a
    ///   refund payout,
    /// * claims the oldest unused stock item matching the order's SKU, binding it to the order.
    ///
    /// If either step matches nothing, the transaction is rolled back: the order stays undelivered and no stock item
    /// is consumed. Both statements are writes, so the transaction holds the write lock from its first statement and
    /// a concurrent fulfilment of the same order sees `delivered = 1` once it gets the lock.
    async fn fulfil_order(&self, order_id: i64) -> Result<FulfilmentResult, FulfilmentError> {
        let order = {
            let mut conn = self.pool.acquire().await?;
            orders::fetch_order(order_id, &mut conn).await?.ok_or(FulfilmentError::OrderNotFound(order_id))?
        };
        if !order.paid || order.delivered || order.refunded || order.payout_started {
            trace!(
                "🗃️ Order #{order_id} is not deliverable (paid: {}, delivered: {}, refunded: {}, payout started: {})",
                order.paid,
                order.delivered,
                order.refunded,
                order.payout_started
            );
            return Ok(FulfilmentResult::NotDeliverable(order));
        }
        let sku = order.sku();
        let mut tx = self.pool.begin().await?;
        let delivered = match orders::mark_delivered(order_id, &mut tx).await? {
            Some(o) => o,
            None => {
                tx.rollback().await?;
                debug!("🗃️ Order #{order_id} changed state before it could be fulfilled");
                let mut conn = self.pool.acquire().await?;
                let current = orders::fetch_order(order_id, &mut conn).await?.unwrap_or(order);
                return Ok(FulfilmentResult::NotDeliverable(current));
            },
        };
        match stock::claim_one(&sku, Some(order_id), &mut tx).await? {
            Some(item) => {
                tx.commit().await?;
                info!("🗃️ Order #{order_id} delivered with stock item #{}", item.id);
                Ok(FulfilmentResult::Delivered { order: delivered, item })
            },
            None => {
                tx.rollback().await?;
                debug!("🗃️ No {sku} stock for order #{order_id}. Delivery rolled back");
                Ok(FulfilmentResult::OutOfStock(order))
            },
        }
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
