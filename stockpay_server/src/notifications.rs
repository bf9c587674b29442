use log::*;
use stockpay_engine::{
    db_types::Order,
    events::{EventHandlers, EventHooks, OrderDeliveredEvent, OrderOutOfStockEvent, OrderPaidEvent, OrderRefundedEvent},
};

use crate::integrations::{NotificationSink, Notifier};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

/// Subscribes the notification sink to the order lifecycle events.
///
/// 1. `OrderPaidEvent`: the owner is told that payment arrived.
/// 2. `OrderDeliveredEvent`: the stock payload is sent to the owner.
/// 3. `OrderOutOfStockEvent`: the owner is told the item sold out and how to ask for a refund.
/// 4. `OrderRefundedEvent`: the owner gets the payout transaction id.
///
/// Failed notifications are logged and dropped.
pub fn create_notification_handlers(sink: NotificationSink) -> EventHandlers {
    let mut hooks = EventHooks::default();
    let s = sink.clone();
    hooks.on_order_paid(move |ev: OrderPaidEvent| {
        let sink = s.clone();
        Box::pin(async move {
            let text = paid_message(&ev.order);
            if let Err(e) = sink.send_message(&ev.order.owner, &text).await {
                error!("📨️ Could not tell {} that order #{} was paid. {e}", ev.order.owner, ev.order.id);
            }
        })
    });
    let s = sink.clone();
    hooks.on_order_delivered(move |ev: OrderDeliveredEvent| {
        let sink = s.clone();
        Box::pin(async move {
            let OrderDeliveredEvent { order, item } = ev;
            let caption = delivery_caption(&order);
            match sink.send_payload(&order.owner, &item.payload_ref, &caption).await {
                Ok(()) => debug!("📨️ Delivered item #{} for order #{} to {}", item.id, order.id, order.owner),
                Err(e) => error!(
                    "📨️ Order #{} is marked as delivered but the payload for item #{} could not be sent to {}. {e}",
                    order.id, item.id, order.owner
                ),
            }
        })
    });
    let s = sink.clone();
    hooks.on_order_out_of_stock(move |ev: OrderOutOfStockEvent| {
        let sink = s.clone();
        Box::pin(async move {
            let text = out_of_stock_message(&ev.order);
            if let Err(e) = sink.send_message(&ev.order.owner, &text).await {
                error!("📨️ Could not send the refund offer for order #{} to {}. {e}", ev.order.id, ev.order.owner);
            }
        })
    });
    hooks.on_order_refunded(move |ev: OrderRefundedEvent| {
        let sink = sink.clone();
        Box::pin(async move {
            let text = refunded_message(&ev.order);
            if let Err(e) = sink.send_message(&ev.order.owner, &text).await {
                error!("📨️ Could not confirm the refund for order #{} to {}. {e}", ev.order.id, ev.order.owner);
            }
        })
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}

fn paid_message(order: &Order) -> String {
    format!("✅ Payment of {} received for order #{}.", order.crypto_amount, order.id)
}

fn delivery_caption(order: &Order) -> String {
    format!("✅ Order #{}: {} {} ({}). Thank you!", order.id, order.variant, order.size, order.region)
}

fn out_of_stock_message(order: &Order) -> String {
    format!(
        "✅ Payment received, but {} {} is out of stock in {}. Your order #{} will be delivered as soon as stock \
         arrives, or you can request a refund.",
        order.variant, order.size, order.region, order.id
    )
}

fn refunded_message(order: &Order) -> String {
    format!(
        "✅ Refund of {} for order #{} sent. TXID: {}",
        order.crypto_amount,
        order.id,
        order.refund_tx.as_deref().unwrap_or("unknown")
    )
}
