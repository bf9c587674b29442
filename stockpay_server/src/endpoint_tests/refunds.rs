use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Duration;
use mockall::predicate::eq;
use spg_common::CoinAmount;
use stockpay_engine::{
    events::EventProducers,
    traits::{OrderManagement, PaymentNodeError},
    RefundApi,
    SqliteDatabase,
};

use super::{
    helpers::{
        admin_key,
        get,
        json,
        paid_order_without_stock,
        post_json,
        send,
        tear_down,
        test_db,
        with_admin_key,
        ADMIN_KEY,
        REFUND_ADDRESS,
    },
    mocks::MockNode,
};
use crate::{
    middleware::AdminKeyMiddlewareFactory,
    routes::{PayoutRoute, PendingRefundsRoute, RefundAddressRoute, RequestRefundRoute},
};

type Api = RefundApi<SqliteDatabase, MockNode>;

fn refund_api(db: &SqliteDatabase, node: MockNode) -> web::Data<Api> {
    web::Data::new(RefundApi::new(db.clone(), node, EventProducers::default(), Duration::minutes(30)))
}

fn configure(api: web::Data<Api>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(api)
            .service(
                web::scope("/api")
                    .service(RequestRefundRoute::<SqliteDatabase, MockNode>::new())
                    .service(RefundAddressRoute::<SqliteDatabase, MockNode>::new()),
            )
            .service(
                web::scope("/admin")
                    .wrap(AdminKeyMiddlewareFactory::new(admin_key()))
                    .service(PendingRefundsRoute::<SqliteDatabase, MockNode>::new())
                    .service(PayoutRoute::<SqliteDatabase, MockNode>::new()),
            );
    }
}

async fn request_refund(api: &web::Data<Api>, owner: &str, id: i64) -> (StatusCode, String) {
    let req = post_json(&format!("/api/orders/{id}/refund"), &serde_json::json!({ "owner": owner }));
    send(req, configure(api.clone())).await.expect("Request failed")
}

async fn refund_address(api: &web::Data<Api>, owner: &str, text: &str) -> (StatusCode, String) {
    let req = post_json("/api/refund_address", &serde_json::json!({ "owner": owner, "text": text }));
    send(req, configure(api.clone())).await.expect("Request failed")
}

#[actix_web::test]
async fn only_the_owner_can_ask_for_a_refund() {
    let _ = env_logger::try_init().ok();
    let db = test_db().await;
    let order = paid_order_without_stock(&db, "bob").await;
    let api = refund_api(&db, MockNode::new());

    let (status, body) = request_refund(&api, "mallory", order.id).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "{body}");
    assert_eq!(api.pending_order("mallory"), None);

    let (status, body) = request_refund(&api, "bob", 999).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");

    let (status, body) = request_refund(&api, "bob", order.id).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["state"], "RefundRequested");
    assert_eq!(api.pending_order("bob"), Some(order.id));
    tear_down(db).await;
}

#[actix_web::test]
async fn refund_addresses_are_checked() {
    let db = test_db().await;
    let order = paid_order_without_stock(&db, "bob").await;
    let api = refund_api(&db, MockNode::new());

    let (status, body) = refund_address(&api, "bob", REFUND_ADDRESS).await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert_eq!(body, r#"{"error":"The request conflicts with the current state. There is no refund waiting for an address"}"#);

    request_refund(&api, "bob", order.id).await;
    let (status, body) = refund_address(&api, "bob", "Xshort").await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body.contains("too short"), "{body}");
    // The prompt stays open after a bad address
    assert_eq!(api.pending_order("bob"), Some(order.id));

    let (status, body) = refund_address(&api, "bob", &format!("  {REFUND_ADDRESS}\n")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(json(&body)["refund_address"], REFUND_ADDRESS);
    assert_eq!(api.pending_order("bob"), None);
    tear_down(db).await;
}

#[actix_web::test]
async fn payouts_require_the_admin_key() {
    let db = test_db().await;
    let order = paid_order_without_stock(&db, "bob").await;
    let api = refund_api(&db, MockNode::new());
    let path = format!("/admin/orders/{}/payout", order.id);

    let err = send(post_json(&path, &()), configure(api.clone())).await.expect_err("Expected the request to fail");
    assert_eq!(err, "No admin key found.");
    let req = with_admin_key(post_json(&path, &()), "not-the-key");
    let err = send(req, configure(api.clone())).await.expect_err("Expected the request to fail");
    assert_eq!(err, "Invalid admin key.");
    let err = send(get("/admin/refunds"), configure(api)).await.expect_err("Expected the request to fail");
    assert_eq!(err, "No admin key found.");
    tear_down(db).await;
}

#[actix_web::test]
async fn refund_payout() {
    let db = test_db().await;
    let order = paid_order_without_stock(&db, "bob").await;
    let mut node = MockNode::new();
    node.expect_send_to()
        .with(eq(REFUND_ADDRESS), eq(CoinAmount::from_coins(1)))
        .times(1)
        .returning(|_, _| Ok("txid01".to_string()));
    let api = refund_api(&db, node);
    let path = format!("/admin/orders/{}/payout", order.id);

    // Nothing has been requested yet
    let (status, body) = send(with_admin_key(post_json(&path, &()), ADMIN_KEY), configure(api.clone())).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    request_refund(&api, "bob", order.id).await;
    refund_address(&api, "bob", REFUND_ADDRESS).await;

    let (status, body) = send(with_admin_key(get("/admin/refunds"), ADMIN_KEY), configure(api.clone())).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let pending = json(&body);
    assert_eq!(pending.as_array().map(|a| a.len()), Some(1));
    assert_eq!(pending[0]["id"], order.id);

    let (status, body) = send(with_admin_key(post_json(&path, &()), ADMIN_KEY), configure(api.clone())).await.unwrap();
    assert_eq!(status, StatusCode::OK, "{body}");
    let refunded = json(&body);
    assert_eq!(refunded["state"], "Refunded");
    assert_eq!(refunded["refund_tx"], "txid01");

    // A second payout is refused without touching the node
    let (status, body) = send(with_admin_key(post_json(&path, &()), ADMIN_KEY), configure(api.clone())).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    assert!(body.contains("already been refunded"), "{body}");
    let (_, body) = send(with_admin_key(get("/admin/refunds"), ADMIN_KEY), configure(api)).await.unwrap();
    assert_eq!(body, "[]");
    tear_down(db).await;
}

#[actix_web::test]
async fn failed_payouts_leave_the_order_alone() {
    let db = test_db().await;
    let order = paid_order_without_stock(&db, "bob").await;
    let mut node = MockNode::new();
    node.expect_send_to()
        .times(1)
        .returning(|_, _| Err(PaymentNodeError::Rpc { code: -6, message: "Insufficient funds".into() }));
    let api = refund_api(&db, node);
    request_refund(&api, "bob", order.id).await;
    refund_address(&api, "bob", REFUND_ADDRESS).await;

    let path = format!("/admin/orders/{}/payout", order.id);
    let (status, body) = send(with_admin_key(post_json(&path, &()), ADMIN_KEY), configure(api.clone())).await.unwrap();
    assert_eq!(status, StatusCode::BAD_GATEWAY, "{body}");
    assert!(body.contains("Insufficient funds"), "{body}");

    let order = db.fetch_order(order.id).await.unwrap().expect("Order should exist");
    assert!(!order.refunded);
    assert!(order.refund_tx.is_none());
    assert_eq!(order.refund_address.as_deref(), Some(REFUND_ADDRESS));
    tear_down(db).await;
}
