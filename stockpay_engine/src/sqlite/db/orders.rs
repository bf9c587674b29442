use std::str::FromStr;

use chrono::Utc;
use log::{debug, trace};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::{
    db_types::{CoinAmount, NewOrder, Order},
    traits::OrderLedgerError,
};

impl<'r> FromRow<'r, SqliteRow> for Order {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            region: row.try_get("region")?,
            variant: row.try_get("variant")?,
            size: row.try_get("size")?,
            usd_price: decimal_column(row, "usd_price")?,
            rate: decimal_column(row, "rate")?,
            crypto_amount: row.try_get::<CoinAmount, _>("crypto_amount")?,
            address: row.try_get("address")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            paid: row.try_get("paid")?,
            delivered: row.try_get("delivered")?,
            out_of_stock: row.try_get("out_of_stock")?,
            refund_requested: row.try_get("refund_requested")?,
            refund_address: row.try_get("refund_address")?,
            refunded: row.try_get("refunded")?,
            refund_tx: row.try_get("refund_tx")?,
            payout_started: row.try_get("payout_started")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let value: String = row.try_get(column)?;
    Decimal::from_str(&value)
        .map_err(|e| sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(e) })
}

/// Inserts a new order. This is not atomic on its own; embed it in a transaction if needed.
///
/// A deposit address that is already assigned results in [`OrderLedgerError::DuplicateAddress`].
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderLedgerError> {
    let address = order.address.clone();
    let result = sqlx::query_as::<_, Order>(
        r#"
            INSERT INTO orders (
                owner,
                region,
                variant,
                size,
                usd_price,
                rate,
                crypto_amount,
                address,
                created_at,
                expires_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *;
        "#,
    )
    .bind(order.owner)
    .bind(order.sku.region)
    .bind(order.sku.variant)
    .bind(order.sku.size)
    .bind(order.usd_price.to_string())
    .bind(order.rate.to_string())
    .bind(order.crypto_amount.value())
    .bind(order.address)
    .bind(order.created_at)
    .bind(order.expires_at)
    .bind(order.created_at)
    .fetch_all(conn)
    .await;
    match result {
        Ok(rows) => rows.into_iter().next().ok_or_else(|| OrderLedgerError::from(sqlx::Error::RowNotFound)),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(OrderLedgerError::DuplicateAddress(address)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next();
    Ok(order)
}

pub async fn fetch_orders_for_owner(owner: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders =
        sqlx::query_as("SELECT * FROM orders WHERE owner = $1 ORDER BY id DESC").bind(owner).fetch_all(conn).await?;
    Ok(orders)
}

pub async fn fetch_unpaid_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders =
        sqlx::query_as("SELECT * FROM orders WHERE paid = 0 AND delivered = 0 AND refunded = 0 ORDER BY id ASC")
            .fetch_all(conn)
            .await?;
    Ok(orders)
}

pub async fn fetch_orders_awaiting_delivery(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders =
        sqlx::query_as("SELECT * FROM orders WHERE paid = 1 AND delivered = 0 AND refunded = 0 AND payout_started = 0 ORDER BY id ASC")
            .fetch_all(conn)
            .await?;
    Ok(orders)
}

pub async fn fetch_pending_refunds(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE refund_requested = 1 AND refunded = 0 AND delivered = 0 ORDER BY id ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Sets `paid`, but only if it is not already set.
pub async fn mark_paid(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET paid = 1, updated_at = $1 WHERE id = $2 AND paid = 0 RETURNING *",
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    trace!("🗃️ mark_paid for order #{id}: {}", if order.is_some() { "updated" } else { "no change" });
    Ok(order)
}

/// Sets `delivered` on a paid, undelivered, unrefunded order with no payout in flight. Must run in the same
/// transaction as the stock claim.
pub async fn mark_delivered(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders SET delivered = 1, updated_at = $1
            WHERE id = $2 AND paid = 1 AND delivered = 0 AND refunded = 0 AND payout_started = 0
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(order)
}

pub async fn mark_out_of_stock(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET out_of_stock = 1, updated_at = $1 WHERE id = $2 AND paid = 1 AND out_of_stock = 0 \
         RETURNING *",
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(order)
}

pub async fn mark_refund_requested(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET refund_requested = 1, updated_at = $1 WHERE id = $2 AND refund_requested = 0 RETURNING *",
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(order)
}

pub async fn set_refund_address(
    id: i64,
    address: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders SET refund_address = $1, updated_at = $2
            WHERE id = $3 AND refund_requested = 1 AND refunded = 0 AND delivered = 0 AND payout_started = 0
            RETURNING *;
        "#,
    )
    .bind(address)
    .bind(Utc::now())
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    debug!("🗃️ Refund address for order #{id} {}", if order.is_some() { "stored" } else { "not stored" });
    Ok(order)
}

/// Claims the order for a refund payout. Only one caller can hold the reservation, and a reserved order is skipped by
/// delivery until the reservation is released.
pub async fn reserve_payout(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders SET payout_started = 1, updated_at = $1
            WHERE id = $2
              AND refund_requested = 1
              AND refund_address IS NOT NULL
              AND delivered = 0
              AND refunded = 0
              AND payout_started = 0
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    debug!("🗃️ Payout for order #{id} {}", if order.is_some() { "reserved" } else { "not reserved" });
    Ok(order)
}

/// Drops a payout reservation after a transfer that did not go through.
pub async fn release_payout(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET payout_started = 0, updated_at = $1 WHERE id = $2 AND payout_started = 1 AND refunded = 0 \
         RETURNING *",
    )
    .bind(Utc::now())
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(order)
}

pub async fn mark_refunded(
    id: i64,
    refund_tx: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as::<_, Order>(
        r#"
            UPDATE orders SET refunded = 1, refund_tx = $1, updated_at = $2
            WHERE id = $3
              AND refunded = 0
              AND delivered = 0
              AND payout_started = 1
              AND refund_requested = 1
              AND refund_address IS NOT NULL
            RETURNING *;
        "#,
    )
    .bind(refund_tx)
    .bind(Utc::now())
    .bind(id)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    Ok(order)
}
