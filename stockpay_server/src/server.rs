use std::{path::Path, sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use stockpay_engine::{
    catalog::Catalog,
    events::EventProducers,
    InventoryApi,
    OrderFlowApi,
    PriceQuoter,
    ReconciliationApi,
    RefundApi,
    SqliteDatabase,
};
use tokio::sync::watch;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::{CoinGeckoOracle, JsonRpcNode, NotificationSink},
    middleware::AdminKeyMiddlewareFactory,
    notifications::create_notification_handlers,
    reconciliation_worker::{start_reconciliation_worker, stop_reconciliation_worker},
    routes::{
        health,
        AddStockRoute,
        CreateOrderRoute,
        OffersRoute,
        OrderByIdRoute,
        OrdersForOwnerRoute,
        PayoutRoute,
        PendingRefundsRoute,
        ReconcileRoute,
        RefundAddressRoute,
        RequestRefundRoute,
        StockCountRoute,
        UploadDoneRoute,
        UploadRoute,
        UploadStartRoute,
    },
};

pub type OrderFlow = OrderFlowApi<SqliteDatabase, JsonRpcNode, CoinGeckoOracle>;
pub type Inventory = InventoryApi<SqliteDatabase>;
pub type Refunds = RefundApi<SqliteDatabase, JsonRpcNode>;
pub type Reconciliation = ReconciliationApi<SqliteDatabase, JsonRpcNode>;

/// The engine APIs the HTTP server hands to its handlers.
///
/// These are created once, outside the `HttpServer` factory closure, so that every worker thread shares the same
/// refund and upload sessions and the same payout guard.
#[derive(Clone)]
pub struct ServerApis {
    pub orders: web::Data<OrderFlow>,
    pub inventory: web::Data<Inventory>,
    pub refunds: web::Data<Refunds>,
    pub reconciliation: web::Data<Reconciliation>,
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let catalog = Arc::new(Catalog::load(&config.catalog_path)?);
    let db = open_database(&config.database_url).await?;
    let node = JsonRpcNode::new(config.node.clone(), config.http_timeout)?;
    let oracle = CoinGeckoOracle::new(&config.oracle_url, config.http_timeout)?;
    let sink = NotificationSink::from_config(config.notify_webhook_url.as_deref(), config.http_timeout)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers(sink);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let worker_api = ReconciliationApi::new(db.clone(), node.clone(), producers.clone())
        .with_min_confirmations(config.min_confirmations);
    let apis = build_apis(&config, db, node, oracle, catalog, producers);
    let (shutdown, shutdown_signal) = watch::channel(false);
    let worker = start_reconciliation_worker(worker_api, config.poll_interval, shutdown_signal);

    let srv = create_server_instance(config, apis)?;
    let result = srv.await;
    info!("🚀️ Server has stopped. Waiting for the reconciliation worker to finish");
    stop_reconciliation_worker(&shutdown);
    if let Err(e) = worker.await {
        warn!("🕰️ The reconciliation worker did not shut down cleanly. {e}");
    }
    result.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Opens (creating if necessary) the SQLite database and brings its schema up to date.
pub async fn open_database(url: &str) -> Result<SqliteDatabase, ServerError> {
    if let Some(dir) = url.strip_prefix("sqlite://").and_then(|p| Path::new(p).parent()) {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            info!("🗃️ Creating database directory {}", dir.display());
            std::fs::create_dir_all(dir)?;
        }
    }
    let db = SqliteDatabase::new_with_url(url, 25).await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    Ok(db)
}

pub fn build_apis(
    config: &ServerConfig,
    db: SqliteDatabase,
    node: JsonRpcNode,
    oracle: CoinGeckoOracle,
    catalog: Arc<Catalog>,
    producers: EventProducers,
) -> ServerApis {
    let quoter = PriceQuoter::new(oracle, Arc::clone(&catalog));
    let orders = OrderFlowApi::new(db.clone(), node.clone(), quoter).with_quote_lock(config.quote_lock);
    let inventory = InventoryApi::new(db.clone(), catalog, config.session_ttl);
    let refunds = RefundApi::new(db.clone(), node.clone(), producers.clone(), config.session_ttl)
        .with_min_address_len(config.min_refund_address_len);
    let reconciliation =
        ReconciliationApi::new(db, node, producers).with_min_confirmations(config.min_confirmations);
    ServerApis {
        orders: web::Data::new(orders),
        inventory: web::Data::new(inventory),
        refunds: web::Data::new(refunds),
        reconciliation: web::Data::new(reconciliation),
    }
}

pub fn create_server_instance(config: ServerConfig, apis: ServerApis) -> Result<Server, ServerError> {
    let admin_key = config.admin_api_key.clone();
    let srv = HttpServer::new(move || {
        let api_scope = web::scope("/api")
            .service(OffersRoute::<SqliteDatabase, JsonRpcNode, CoinGeckoOracle>::new())
            .service(StockCountRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase, JsonRpcNode, CoinGeckoOracle>::new())
            .service(OrdersForOwnerRoute::<SqliteDatabase, JsonRpcNode, CoinGeckoOracle>::new())
            .service(OrderByIdRoute::<SqliteDatabase, JsonRpcNode, CoinGeckoOracle>::new())
            .service(RequestRefundRoute::<SqliteDatabase, JsonRpcNode>::new())
            .service(RefundAddressRoute::<SqliteDatabase, JsonRpcNode>::new());
        let admin_scope = web::scope("/admin")
            .wrap(AdminKeyMiddlewareFactory::new(admin_key.clone()))
            .service(AddStockRoute::<SqliteDatabase>::new())
            .service(UploadStartRoute::<SqliteDatabase>::new())
            .service(UploadDoneRoute::<SqliteDatabase>::new())
            .service(UploadRoute::<SqliteDatabase>::new())
            .service(PendingRefundsRoute::<SqliteDatabase, JsonRpcNode>::new())
            .service(PayoutRoute::<SqliteDatabase, JsonRpcNode>::new())
            .service(ReconcileRoute::<SqliteDatabase, JsonRpcNode>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .app_data(apis.orders.clone())
            .app_data(apis.inventory.clone())
            .app_data(apis.refunds.clone())
            .app_data(apis.reconciliation.clone())
            .service(health)
            .service(api_scope)
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}
