use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Duration;
use serde_json::json;
use stockpay_engine::{events::EventProducers, InventoryApi, ReconciliationApi, SqliteDatabase};

use super::{
    helpers::{admin_key, catalog, json, post_json, send, tear_down, test_db, with_admin_key, ADMIN_KEY},
    mocks::MockNode,
};
use crate::{
    middleware::AdminKeyMiddlewareFactory,
    routes::{AddStockRoute, ReconcileRoute, UploadDoneRoute, UploadRoute, UploadStartRoute},
};

type Inventory = InventoryApi<SqliteDatabase>;

fn inventory(db: &SqliteDatabase) -> web::Data<Inventory> {
    web::Data::new(InventoryApi::new(db.clone(), catalog(), Duration::minutes(30)))
}

fn configure(api: web::Data<Inventory>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(api).service(
            web::scope("/admin")
                .wrap(AdminKeyMiddlewareFactory::new(admin_key()))
                .service(AddStockRoute::<SqliteDatabase>::new())
                .service(UploadStartRoute::<SqliteDatabase>::new())
                .service(UploadRoute::<SqliteDatabase>::new())
                .service(UploadDoneRoute::<SqliteDatabase>::new()),
        );
    }
}

async fn admin_post(api: &web::Data<Inventory>, path: &str, body: serde_json::Value) -> (StatusCode, String) {
    let req = with_admin_key(post_json(path, &body), ADMIN_KEY);
    send(req, configure(api.clone())).await.expect("Request failed")
}

#[actix_web::test]
async fn add_stock() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let api = inventory(&db);

    let (status, body) = admin_post(
        &api,
        "/admin/stock",
        json!({"region": "North", "variant": "g", "size": "2", "payload_ref": " file-123 "}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let item = json(&body);
    assert_eq!(item["region"], "north");
    assert_eq!(item["variant"], "Gadget");
    assert_eq!(item["size"], "2.0");
    assert_eq!(item["payload_ref"], "file-123");
    assert_eq!(api.available_count("north", Some("Gadget"), Some("2.0")).await.unwrap(), 1);

    let (status, body) =
        admin_post(&api, "/admin/stock", json!({"region": "north", "variant": "g", "size": "2", "payload_ref": "  "}))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, body) = admin_post(
        &api,
        "/admin/stock",
        json!({"region": "south", "variant": "g", "size": "2", "payload_ref": "file-124"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert!(body.contains("Unknown region: south"), "{body}");

    let (status, _) = admin_post(
        &api,
        "/admin/stock",
        json!({"region": "north", "variant": "g", "size": "3", "payload_ref": "file-125"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(api.available_count("north", None, None).await.unwrap(), 1);
    tear_down(db).await;
}

#[actix_web::test]
async fn stock_intake_needs_the_admin_key() {
    let db = test_db().await;
    let api = inventory(&db);
    let body = json!({"region": "north", "variant": "w", "size": "1", "payload_ref": "file-1"});
    let err = send(post_json("/admin/stock", &body), configure(api.clone())).await.expect_err("Expected a failure");
    assert_eq!(err, "No admin key found.");
    assert_eq!(api.available_count("north", None, None).await.unwrap(), 0);
    tear_down(db).await;
}

#[actix_web::test]
async fn upload_sessions() {
    let db = test_db().await;
    let api = inventory(&db);

    let (status, body) = admin_post(&api, "/admin/upload", json!({"admin": "ops", "payload_ref": "file-1"})).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert!(body.contains("ops has no upload session open"), "{body}");

    let (status, body) = admin_post(
        &api,
        "/admin/upload/start",
        json!({"admin": "ops", "region": "north", "variant": "w", "size": "0.5"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let session = json(&body);
    assert_eq!(session["admin"], "ops");
    assert_eq!(session["sku"]["variant"], "Widget");
    assert_eq!(session["sku"]["size"], "0.5");

    for payload in ["file-1", "file-2", "file-3"] {
        let (status, body) = admin_post(&api, "/admin/upload", json!({"admin": "ops", "payload_ref": payload})).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(json(&body)["payload_ref"], payload);
    }
    // Sessions are per admin
    let (status, _) = admin_post(&api, "/admin/upload", json!({"admin": "other", "payload_ref": "file-4"})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = admin_post(&api, "/admin/upload/done", json!({"admin": "ops"})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["success"], true);
    assert_eq!(api.available_count("north", Some("w"), Some("0.5")).await.unwrap(), 3);

    let (status, _) = admin_post(&api, "/admin/upload", json!({"admin": "ops", "payload_ref": "file-5"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = admin_post(&api, "/admin/upload/done", json!({"admin": "ops"})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(api.available_count("north", None, None).await.unwrap(), 3);
    tear_down(db).await;
}

#[actix_web::test]
async fn manual_reconciliation() {
    let db = test_db().await;
    // No orders, so the node is never asked anything
    let api = web::Data::new(ReconciliationApi::new(db.clone(), MockNode::new(), EventProducers::default()));
    let req = with_admin_key(post_json("/admin/reconcile", &()), ADMIN_KEY);
    let (status, body) = send(req, move |cfg| {
        cfg.app_data(api).service(
            web::scope("/admin")
                .wrap(AdminKeyMiddlewareFactory::new(admin_key()))
                .service(ReconcileRoute::<SqliteDatabase, MockNode>::new()),
        );
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK, "{body}");
    let report = json(&body);
    assert_eq!(report["delivered"], json!([]));
    assert_eq!(report["errors"], 0);
    tear_down(db).await;
}
