//! Request handler definitions
//!
//! Define each route and its handler here. Handlers are thin: they unpack the request, call one engine API method
//! and serialise the result. Anything longer belongs in the engine.
//!
//! Every handler does I/O (database, node, oracle), so all of them are async. Never block a worker thread in here.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use stockpay_engine::{
    traits::{FulfilmentDatabase, InventoryManagement, OrderManagement, PaymentNode, PriceOracle},
    InventoryApi,
    OrderFlowApi,
    OrderResult,
    ReconciliationApi,
    RefundApi,
};

use crate::{
    data_objects::{
        AddStockRequest,
        JsonResponse,
        NewOrderRequest,
        RefundAddressRequest,
        RefundRequest,
        StockCount,
        StockQuery,
        UploadDoneRequest,
        UploadRequest,
        UploadSessionResponse,
        UploadStartRequest,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Offers  ----------------------------------------------------
route!(offers => Get "/offers/{region}" impl FulfilmentDatabase, PaymentNode, PriceOracle);
/// Lists every product with stock in the region, with its USD price and the number of items left.
pub async fn offers<B, N, P>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, N, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: FulfilmentDatabase,
    N: PaymentNode,
    P: PriceOracle,
{
    let region = path.into_inner();
    debug!("💻️ GET offers for {region}");
    let offers = api.offers(&region).await?;
    Ok(HttpResponse::Ok().json(offers))
}

//----------------------------------------------   Stock  ----------------------------------------------------
route!(stock_count => Get "/stock/{region}" impl InventoryManagement);
/// Counts unused stock in a region. `variant` and `size` narrow the count when given.
pub async fn stock_count<B: InventoryManagement>(
    path: web::Path<String>,
    query: web::Query<StockQuery>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let region = path.into_inner();
    let StockQuery { variant, size } = query.into_inner();
    debug!("💻️ GET stock for {region} ({variant:?} / {size:?})");
    let available = api.available_count(&region, variant.as_deref(), size.as_deref()).await?;
    Ok(HttpResponse::Ok().json(StockCount { region, variant, size, available }))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/orders" impl FulfilmentDatabase, PaymentNode, PriceOracle);
/// Places an order at a locked price. The response carries the deposit address and the exact amount to pay.
pub async fn create_order<B, N, P>(
    body: web::Json<NewOrderRequest>,
    api: web::Data<OrderFlowApi<B, N, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: FulfilmentDatabase,
    N: PaymentNode,
    P: PriceOracle,
{
    let NewOrderRequest { owner, region, variant, size } = body.into_inner();
    debug!("💻️ POST new order from {owner} for {region}/{variant}/{size}");
    let order = api.create_order(&owner, &region, &variant, &size).await?;
    info!("💻️ Order #{} created for {owner}. Awaiting {} at {}", order.id, order.crypto_amount, order.address);
    Ok(HttpResponse::Ok().json(OrderResult::from(order)))
}

route!(order_by_id => Get "/orders/{id}" impl FulfilmentDatabase, PaymentNode, PriceOracle);
pub async fn order_by_id<B, N, P>(
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B, N, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: FulfilmentDatabase,
    N: PaymentNode,
    P: PriceOracle,
{
    let id = path.into_inner();
    debug!("💻️ GET order #{id}");
    let order = api.fetch_order(id).await?;
    Ok(HttpResponse::Ok().json(OrderResult::from(order)))
}

route!(orders_for_owner => Get "/orders/owner/{owner}" impl FulfilmentDatabase, PaymentNode, PriceOracle);
/// All of an owner's orders, newest first.
pub async fn orders_for_owner<B, N, P>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B, N, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: FulfilmentDatabase,
    N: PaymentNode,
    P: PriceOracle,
{
    let owner = path.into_inner();
    debug!("💻️ GET orders for {owner}");
    let orders = api.orders_for_owner(&owner).await?;
    let result = orders.into_iter().map(OrderResult::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Refunds  ----------------------------------------------------
route!(request_refund => Post "/orders/{id}/refund" impl OrderManagement, PaymentNode);
/// Starts the refund conversation for a paid, undelivered order. The owner is then expected to send a payout
/// address to `/api/refund_address`.
pub async fn request_refund<B, N>(
    path: web::Path<i64>,
    body: web::Json<RefundRequest>,
    api: web::Data<RefundApi<B, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    N: PaymentNode,
{
    let id = path.into_inner();
    let RefundRequest { owner } = body.into_inner();
    debug!("💻️ POST refund request for order #{id} from {owner}");
    let order = api.request_refund(&owner, id).await?;
    Ok(HttpResponse::Ok().json(OrderResult::from(order)))
}

route!(refund_address => Post "/refund_address" impl OrderManagement, PaymentNode);
/// Captures free text from the owner as the payout address for their pending refund.
pub async fn refund_address<B, N>(
    body: web::Json<RefundAddressRequest>,
    api: web::Data<RefundApi<B, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    N: PaymentNode,
{
    let RefundAddressRequest { owner, text } = body.into_inner();
    debug!("💻️ POST refund address from {owner}");
    let order = api.submit_refund_address(&owner, &text).await?;
    Ok(HttpResponse::Ok().json(OrderResult::from(order)))
}

//----------------------------------------------   Admin  ----------------------------------------------------
route!(add_stock => Post "/stock" impl InventoryManagement);
pub async fn add_stock<B: InventoryManagement>(
    body: web::Json<AddStockRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let AddStockRequest { region, variant, size, payload_ref } = body.into_inner();
    debug!("💻️ POST add stock for {region}/{variant}/{size}");
    let item = api.add_stock(&region, &variant, &size, &payload_ref).await?;
    Ok(HttpResponse::Ok().json(item))
}

route!(upload_start => Post "/upload/start" impl InventoryManagement);
/// Opens an upload session. Payloads sent to `/admin/upload` by the same admin are added to this SKU until the
/// session is closed or times out.
pub async fn upload_start<B: InventoryManagement>(
    body: web::Json<UploadStartRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let UploadStartRequest { admin, region, variant, size } = body.into_inner();
    debug!("💻️ POST upload session start for {admin}");
    let sku = api.begin_upload(&admin, &region, &variant, &size)?;
    Ok(HttpResponse::Ok().json(UploadSessionResponse { admin, sku }))
}

route!(upload => Post "/upload" impl InventoryManagement);
pub async fn upload<B: InventoryManagement>(
    body: web::Json<UploadRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let UploadRequest { admin, payload_ref } = body.into_inner();
    debug!("💻️ POST upload from {admin}");
    let item = api.upload(&admin, &payload_ref).await?;
    Ok(HttpResponse::Ok().json(item))
}

route!(upload_done => Post "/upload/done" impl InventoryManagement);
pub async fn upload_done<B: InventoryManagement>(
    body: web::Json<UploadDoneRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let UploadDoneRequest { admin } = body.into_inner();
    debug!("💻️ POST upload session end for {admin}");
    let sku = api.end_upload(&admin)?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Upload session for {sku} closed."))))
}

route!(pending_refunds => Get "/refunds" impl OrderManagement, PaymentNode);
/// Orders where the owner asked for a refund that has not been paid out yet.
pub async fn pending_refunds<B, N>(api: web::Data<RefundApi<B, N>>) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    N: PaymentNode,
{
    debug!("💻️ GET pending refunds");
    let orders = api.db().fetch_pending_refunds().await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    let result = orders.into_iter().map(OrderResult::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(result))
}

route!(payout => Post "/orders/{id}/payout" impl OrderManagement, PaymentNode);
/// Sends the refund for an order to its stored refund address.
///
/// A failed send leaves the order untouched, so this can simply be called again.
pub async fn payout<B, N>(path: web::Path<i64>, api: web::Data<RefundApi<B, N>>) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    N: PaymentNode,
{
    let id = path.into_inner();
    info!("💻️ POST refund payout for order #{id}");
    let order = api.execute_payout(id).await?;
    Ok(HttpResponse::Ok().json(OrderResult::from(order)))
}

route!(reconcile => Post "/reconcile" impl FulfilmentDatabase, PaymentNode);
/// Runs a reconciliation cycle immediately, without waiting for the next tick of the worker.
pub async fn reconcile<B, N>(api: web::Data<ReconciliationApi<B, N>>) -> Result<HttpResponse, ServerError>
where
    B: FulfilmentDatabase,
    N: PaymentNode,
{
    info!("💻️ POST manual reconciliation");
    let report = api.run_cycle().await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(report))
}
