use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, Row, SqliteConnection};

use crate::{
    db_types::{NewStockItem, Sku, StockFilter, StockItem},
    traits::StockLevel,
};

pub async fn insert_stock_item(item: NewStockItem, conn: &mut SqliteConnection) -> Result<StockItem, sqlx::Error> {
    let sku = item.sku;
    let item = sqlx::query_as::<_, StockItem>(
        "INSERT INTO stock (region, variant, size, payload_ref, added_at) VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(sku.region)
    .bind(sku.variant)
    .bind(sku.size)
    .bind(item.payload_ref)
    .bind(Utc::now())
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    debug!("🗃️ Stock item #{} added for {}", item.id, item.sku());
    Ok(item)
}

pub async fn available_count(filter: &StockFilter, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) AS available FROM stock WHERE used = 0 AND region = ");
    builder.push_bind(filter.region.as_str());
    if let Some(variant) = &filter.variant {
        builder.push(" AND variant = ");
        builder.push_bind(variant.as_str());
    }
    if let Some(size) = &filter.size {
        builder.push(" AND size = ");
        builder.push_bind(size.as_str());
    }
    let rows = builder.build().fetch_all(conn).await?;
    let row = rows.first().ok_or(sqlx::Error::RowNotFound)?;
    let count: i64 = row.try_get("available")?;
    trace!("🗃️ {count} items available for {filter:?}");
    Ok(count)
}

pub async fn stock_levels(region: &str, conn: &mut SqliteConnection) -> Result<Vec<StockLevel>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
            SELECT region, variant, size, COUNT(*) AS available FROM stock
            WHERE used = 0 AND region = $1
            GROUP BY region, variant, size
            ORDER BY variant, size;
        "#,
    )
    .bind(region)
    .fetch_all(conn)
    .await?;
    rows.into_iter()
        .map(|row| -> Result<StockLevel, sqlx::Error> {
            let sku = Sku::new(
                row.try_get::<String, _>("region")?,
                row.try_get::<String, _>("variant")?,
                row.try_get::<String, _>("size")?,
            );
            Ok(StockLevel { sku, available: row.try_get("available")? })
        })
        .collect()
}

/// Marks the oldest unused item for the SKU as used and returns it, in a single statement.
///
/// The `used = 0` guard on the outer update means that if two statements race for the same row, only one of them
/// changes it; the other returns no row.
pub async fn claim_one(
    sku: &Sku,
    order_id: Option<i64>,
    conn: &mut SqliteConnection,
) -> Result<Option<StockItem>, sqlx::Error> {
    let item = sqlx::query_as::<_, StockItem>(
        r#"
            UPDATE stock SET used = 1, order_id = $1, claimed_at = $2
            WHERE id = (
                SELECT id FROM stock
                WHERE region = $3 AND variant = $4 AND size = $5 AND used = 0
                ORDER BY added_at ASC, id ASC
                LIMIT 1
            ) AND used = 0
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(Utc::now())
    .bind(sku.region.as_str())
    .bind(sku.variant.as_str())
    .bind(sku.size.as_str())
    .fetch_all(conn)
    .await?
    .into_iter()
    .next();
    match &item {
        Some(item) => debug!("🗃️ Stock item #{} claimed for {sku}", item.id),
        None => debug!("🗃️ No stock available for {sku}"),
    }
    Ok(item)
}

pub async fn fetch_stock_item(id: i64, conn: &mut SqliteConnection) -> Result<Option<StockItem>, sqlx::Error> {
    let item = sqlx::query_as::<_, StockItem>("SELECT * FROM stock WHERE id = $1")
        .bind(id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next();
    Ok(item)
}

pub async fn fetch_item_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<StockItem>, sqlx::Error> {
    let item = sqlx::query_as::<_, StockItem>("SELECT * FROM stock WHERE order_id = $1")
        .bind(order_id)
        .fetch_all(conn)
        .await?
        .into_iter()
        .next();
    Ok(item)
}
