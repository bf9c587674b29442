//! One-shot operator commands. These work directly against the database and the node, so they can be used while the
//! server is down.
use std::sync::Arc;

use log::*;
use stockpay_engine::{
    catalog::Catalog,
    events::EventHandlers,
    traits::{InventoryManagement, OrderManagement},
    InventoryApi,
    OrderResult,
    RefundApi,
};
use tokio::task::JoinHandle;

use crate::{
    cli::{display_envs, Command},
    config::ServerConfig,
    errors::ServerError,
    integrations::{JsonRpcNode, NotificationSink},
    notifications::create_notification_handlers,
    server::open_database,
};

pub async fn run_command(command: Command, config: ServerConfig) -> Result<(), ServerError> {
    match command {
        Command::Serve => Err(ServerError::InvalidRequest("serve is not an operator command".into())),
        Command::AddStock { region, variant, size, payload } => {
            add_stock(&config, &region, &variant, &size, &payload).await
        },
        Command::RefundSend { order_id } => refund_send(&config, order_id).await,
        Command::ShowOrder { order_id } => show_order(&config, order_id).await,
        Command::PendingRefunds => pending_refunds(&config).await,
        Command::Env => {
            display_envs();
            Ok(())
        },
    }
}

async fn add_stock(
    config: &ServerConfig,
    region: &str,
    variant: &str,
    size: &str,
    payload: &str,
) -> Result<(), ServerError> {
    let catalog = Arc::new(Catalog::load(&config.catalog_path)?);
    let db = open_database(&config.database_url).await?;
    let api = InventoryApi::new(db, catalog, config.session_ttl);
    let item = api.add_stock(region, variant, size, payload).await?;
    let sku = item.sku();
    let available = api.available_count(&sku.region, Some(sku.variant.as_str()), Some(sku.size.as_str())).await?;
    println!("✅️ Added stock item #{} to {sku}. {available} now available.", item.id);
    Ok(())
}

async fn refund_send(config: &ServerConfig, order_id: i64) -> Result<(), ServerError> {
    let db = open_database(&config.database_url).await?;
    let node = JsonRpcNode::new(config.node.clone(), config.http_timeout)?;
    let sink = NotificationSink::from_config(config.notify_webhook_url.as_deref(), config.http_timeout)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_notification_handlers(sink);
    let producers = handlers.producers();
    let tasks = spawn_handlers(handlers);
    let result = {
        let api = RefundApi::new(db, node, producers, config.session_ttl);
        api.execute_payout(order_id).await
    };
    // The API (and with it every producer) is gone, so the handlers finish once the owner has been notified
    for task in tasks {
        if let Err(e) = task.await {
            warn!("📬️ A notification task failed. {e}");
        }
    }
    let order = result?;
    println!("✅️ Refunded order #{order_id}. TXID: {}", order.refund_tx.unwrap_or_default());
    Ok(())
}

async fn show_order(config: &ServerConfig, order_id: i64) -> Result<(), ServerError> {
    let db = open_database(&config.database_url).await?;
    let order = db
        .fetch_order(order_id)
        .await
        .map_err(|e| ServerError::BackendError(e.to_string()))?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    let item = db.fetch_item_for_order(order_id).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    print_json(&OrderResult::from(order))?;
    match item {
        Some(item) => {
            println!("Delivered item:");
            print_json(&item)?;
        },
        None => println!("No item has been delivered for this order."),
    }
    Ok(())
}

async fn pending_refunds(config: &ServerConfig) -> Result<(), ServerError> {
    let db = open_database(&config.database_url).await?;
    let orders = db.fetch_pending_refunds().await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    if orders.is_empty() {
        println!("No refunds are pending.");
        return Ok(());
    }
    println!("{:>6}  {:<20} {:>14}  {:<8} refund address", "id", "owner", "amount", "address?");
    for order in orders {
        let has_address = if order.refund_address.is_some() { "yes" } else { "no" };
        println!(
            "{:>6}  {:<20} {:>14}  {:<8} {}",
            order.id,
            order.owner,
            order.crypto_amount.to_string(),
            has_address,
            order.refund_address.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn spawn_handlers(handlers: EventHandlers) -> Vec<JoinHandle<()>> {
    let EventHandlers { on_order_paid, on_order_delivered, on_order_out_of_stock, on_order_refunded } = handlers;
    let mut tasks = Vec::with_capacity(4);
    if let Some(h) = on_order_paid {
        tasks.push(tokio::spawn(h.start_handler()));
    }
    if let Some(h) = on_order_delivered {
        tasks.push(tokio::spawn(h.start_handler()));
    }
    if let Some(h) = on_order_out_of_stock {
        tasks.push(tokio::spawn(h.start_handler()));
    }
    if let Some(h) = on_order_refunded {
        tasks.push(tokio::spawn(h.start_handler()));
    }
    tasks
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ServerError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ServerError::Unspecified(e.to_string()))?;
    println!("{json}");
    Ok(())
}
