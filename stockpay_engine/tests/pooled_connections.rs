use rust_decimal_macros::dec;
use stockpay_engine::traits::OrderManagement;
use support::Harness;

mod support;

async fn count_on(conn: &mut sqlx::SqliteConnection, sql: &str) -> i64 {
    let counts: Vec<i64> = sqlx::query_scalar(sql).fetch_all(conn).await.expect("Error counting rows");
    counts.first().copied().unwrap_or_default()
}

#[tokio::test]
async fn stock_writes_are_visible_to_other_connections() {
    let h = Harness::new(dec!(30)).await;
    let inventory = h.inventory();
    // Held for the whole test, so every write below goes through a different pooled connection
    let mut reader = h.db.pool().acquire().await.expect("No connection available");
    for n in 1..=3 {
        inventory.add_stock("north", "Widget", "1.0", &format!("file-{n:03}")).await.unwrap();
        assert_eq!(count_on(&mut reader, "SELECT COUNT(*) FROM stock WHERE used = 0").await, n);
        assert_eq!(inventory.available_count("north", None, None).await.unwrap(), n);
    }
    let sku = stockpay_engine::db_types::Sku::new("north", "Widget", "1.0");
    inventory.claim_one(&sku).await.unwrap().expect("Stock should be available");
    assert_eq!(count_on(&mut reader, "SELECT COUNT(*) FROM stock WHERE used = 0").await, 2);
    assert_eq!(inventory.available_count("north", Some("Widget"), Some("1.0")).await.unwrap(), 2);
    drop(reader);
    h.tear_down().await;
}

#[tokio::test]
async fn order_writes_are_visible_to_other_connections() {
    let h = Harness::new(dec!(30)).await;
    let mut reader = h.db.pool().acquire().await.expect("No connection available");
    h.inventory().add_stock("north", "Widget", "1.0", "file-001").await.unwrap();
    // Placing an order right after intake must see the new item
    let order = h.order_flow().create_order("alice", "north", "Widget", "1.0").await.unwrap();
    assert_eq!(count_on(&mut reader, "SELECT COUNT(*) FROM orders").await, 1);
    let fetched = h.db.fetch_order(order.id).await.unwrap().expect("Order should be visible");
    assert_eq!(fetched, order);

    let paid = h.db.mark_paid(order.id).await.unwrap().expect("Order should be marked as paid");
    assert!(paid.paid);
    assert_eq!(count_on(&mut reader, "SELECT COUNT(*) FROM orders WHERE paid = 1").await, 1);
    assert_eq!(h.db.fetch_orders_awaiting_delivery().await.unwrap().len(), 1);
    assert!(h.db.mark_paid(order.id).await.unwrap().is_none());
    drop(reader);
    h.tear_down().await;
}
