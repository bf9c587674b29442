use std::sync::Arc;

use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{Duration, Utc};
use log::debug;
use rust_decimal::Decimal;
use spg_common::{CoinAmount, Secret};
use stockpay_engine::{
    catalog::Catalog,
    db_types::{NewOrder, Order, Sku},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    traits::{FulfilmentDatabase, OrderManagement},
    SqliteDatabase,
};

use crate::middleware::ADMIN_KEY_HEADER;

pub const CATALOG: &str = r#"
    asset = "dash"

    [[regions]]
    id = "north"
    label = "North side"

    [[products]]
    name = "Widget"
    aliases = ["w"]
    prices = { "0.5" = "17.50", "1.0" = "30" }

    [[products]]
    name = "Gadget"
    aliases = ["g"]
    prices = { "1.0" = "45", "2.0" = "80" }
"#;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const REFUND_ADDRESS: &str = "XrefundAddress0123456789abcdefghij";

pub fn admin_key() -> Secret<String> {
    Secret::new(ADMIN_KEY.to_string())
}

pub fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::from_toml_str(CATALOG).expect("Invalid test catalog"))
}

pub async fn test_db() -> SqliteDatabase {
    prepare_test_env(&random_db_path()).await
}

pub async fn tear_down(db: SqliteDatabase) {
    let path = db.url().trim_start_matches("sqlite://").to_string();
    db.pool().close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{path}{suffix}"));
    }
}

/// Writes a paid Widget order for `owner` straight into the ledger, flagged as out of stock.
pub async fn paid_order_without_stock(db: &SqliteDatabase, owner: &str) -> Order {
    let now = Utc::now();
    let order = NewOrder {
        owner: owner.to_string(),
        sku: Sku::new("north", "Widget", "1.0"),
        usd_price: Decimal::from(30),
        rate: Decimal::from(30),
        crypto_amount: CoinAmount::from_coins(1),
        address: format!("XdepositAddress{owner}"),
        created_at: now,
        expires_at: now + Duration::minutes(15),
    };
    let order = db.insert_order(order).await.expect("Could not insert order");
    db.mark_paid(order.id).await.expect("Could not mark order as paid");
    db.mark_out_of_stock(order.id).await.expect("Could not flag order").expect("Order should have been flagged")
}

pub fn get(path: &str) -> TestRequest {
    TestRequest::get().uri(path)
}

pub fn post_json<T: serde::Serialize>(path: &str, body: &T) -> TestRequest {
    TestRequest::post().uri(path).set_json(body)
}

pub fn with_admin_key(req: TestRequest, key: &str) -> TestRequest {
    req.insert_header((ADMIN_KEY_HEADER, key))
}

/// Builds an app from `configure`, sends one request and returns the status and body. Errors raised by middleware
/// (rather than handlers) come back as `Err` with the error message.
pub async fn send<F>(req: TestRequest, configure: F) -> Result<(StatusCode, String), String>
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}
