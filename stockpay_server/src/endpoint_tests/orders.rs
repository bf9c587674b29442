use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Duration;
use mockall::predicate::eq;
use rust_decimal_macros::dec;
use serde_json::json;
use stockpay_engine::{
    traits::PriceOracleError,
    InventoryApi,
    OrderFlowApi,
    PriceQuoter,
    SqliteDatabase,
};

use super::{
    helpers::{catalog, get, json, post_json, send, tear_down, test_db},
    mocks::{MockNode, MockOracle},
};
use crate::routes::{health, CreateOrderRoute, OffersRoute, OrderByIdRoute, OrdersForOwnerRoute, StockCountRoute};

type Api = OrderFlowApi<SqliteDatabase, MockNode, MockOracle>;

fn order_flow(db: &SqliteDatabase, node: MockNode, oracle: MockOracle) -> web::Data<Api> {
    let quoter = PriceQuoter::new(oracle, catalog());
    web::Data::new(OrderFlowApi::new(db.clone(), node, quoter))
}

fn inventory(db: &SqliteDatabase) -> web::Data<InventoryApi<SqliteDatabase>> {
    web::Data::new(InventoryApi::new(db.clone(), catalog(), Duration::minutes(30)))
}

fn configure(api: web::Data<Api>, inventory: web::Data<InventoryApi<SqliteDatabase>>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(api)
            .app_data(inventory)
            .service(OffersRoute::<SqliteDatabase, MockNode, MockOracle>::new())
            .service(StockCountRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase, MockNode, MockOracle>::new())
            .service(OrdersForOwnerRoute::<SqliteDatabase, MockNode, MockOracle>::new())
            .service(OrderByIdRoute::<SqliteDatabase, MockNode, MockOracle>::new());
    }
}

fn new_order(owner: &str, variant: &str, size: &str) -> serde_json::Value {
    json!({"owner": owner, "region": "north", "variant": variant, "size": size})
}

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = send(get("/health"), |cfg| {
        cfg.service(health);
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn create_order_locks_the_quote() {
    let db = test_db().await;
    let stock = inventory(&db);
    stock.add_stock("north", "Widget", "1.0", "file-001").await.unwrap();
    let mut oracle = MockOracle::new();
    oracle.expect_current_rate().with(eq("dash")).times(1).returning(|_| Ok(dec!(30)));
    let mut node = MockNode::new();
    node.expect_new_deposit_address().times(1).returning(|| Ok("XdepositAddress0001".to_string()));
    let api = order_flow(&db, node, oracle);

    let req = post_json("/orders", &new_order("alice", "w", "1"));
    let (status, body) = send(req, configure(api.clone(), stock.clone())).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK, "{body}");
    let order = json(&body);
    assert_eq!(order["state"], "Created");
    assert_eq!(order["owner"], "alice");
    assert_eq!(order["variant"], "Widget");
    assert_eq!(order["size"], "1.0");
    assert_eq!(order["crypto_amount"], "1.00000000");
    assert_eq!(order["address"], "XdepositAddress0001");
    let id = order["id"].as_i64().expect("Order id missing");

    let (status, body) = send(get(&format!("/orders/{id}")), configure(api.clone(), stock.clone())).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["address"], "XdepositAddress0001");
    let (status, body) = send(get("/orders/owner/alice"), configure(api, stock)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body).as_array().map(|a| a.len()), Some(1));
    tear_down(db).await;
}

#[actix_web::test]
async fn out_of_stock_orders_are_refused_before_quoting() {
    let db = test_db().await;
    // Neither mock has expectations, so any call to them fails the test
    let api = order_flow(&db, MockNode::new(), MockOracle::new());
    let req = post_json("/orders", &new_order("alice", "Widget", "1.0"));
    let (status, body) = send(req, configure(api, inventory(&db))).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, r#"{"error":"The request conflicts with the current state. north/Widget/1.0 is out of stock"}"#);
    tear_down(db).await;
}

#[actix_web::test]
async fn no_quote_means_no_order() {
    let db = test_db().await;
    let stock = inventory(&db);
    stock.add_stock("north", "Widget", "1.0", "file-001").await.unwrap();
    let mut oracle = MockOracle::new();
    oracle.expect_current_rate().returning(|_| Err(PriceOracleError::Unreachable("timed out".into())));
    let api = order_flow(&db, MockNode::new(), oracle);

    let req = post_json("/orders", &new_order("alice", "Widget", "1.0"));
    let (status, body) = send(req, configure(api.clone(), stock.clone())).await.expect("Request failed");
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{body}");
    assert!(body.contains("No price quote is available right now"), "{body}");

    let (status, body) = send(get("/orders/owner/alice"), configure(api, stock)).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
    tear_down(db).await;
}

#[actix_web::test]
async fn unknown_products_and_orders() {
    let db = test_db().await;
    let stock = inventory(&db);
    let api = order_flow(&db, MockNode::new(), MockOracle::new());

    let req = post_json("/orders", &new_order("alice", "Sprocket", "1.0"));
    let (status, body) = send(req, configure(api.clone(), stock.clone())).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert!(body.contains("Unknown product: Sprocket"), "{body}");

    let req = post_json("/orders", &new_order("  ", "Widget", "1.0"));
    let (status, _) = send(req, configure(api.clone(), stock.clone())).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(get("/orders/4242"), configure(api, stock)).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, r#"{"error":"The data was not found. Order 4242 does not exist"}"#);
    tear_down(db).await;
}

#[actix_web::test]
async fn offers_and_stock_counts() {
    let db = test_db().await;
    let stock = inventory(&db);
    stock.add_stock("north", "Widget", "1.0", "file-001").await.unwrap();
    stock.add_stock("north", "w", "1", "file-002").await.unwrap();
    stock.add_stock("north", "Gadget", "2", "file-003").await.unwrap();
    // Offers come from the catalog and the pool. The oracle is not consulted.
    let api = order_flow(&db, MockNode::new(), MockOracle::new());

    let (status, body) = send(get("/offers/north"), configure(api.clone(), stock.clone())).await.unwrap();
    assert_eq!(status, StatusCode::OK, "{body}");
    let offers = json(&body);
    let offers = offers.as_array().expect("Expected a list of offers");
    assert_eq!(offers.len(), 2);
    let widget = offers.iter().find(|o| o["sku"]["variant"] == "Widget").expect("Widget should be on offer");
    assert_eq!(widget["available"], 2);
    assert_eq!(widget["usd_price"], "30");

    let (status, body) = send(get("/stock/north?variant=w&size=1"), configure(api.clone(), stock.clone())).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["available"], 2);
    let (_, body) = send(get("/stock/north"), configure(api.clone(), stock.clone())).await.unwrap();
    assert_eq!(json(&body)["available"], 3);
    let (status, _) = send(get("/stock/east"), configure(api, stock)).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    tear_down(db).await;
}
