use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::Order,
    events::{EventProducers, OrderDeliveredEvent, OrderOutOfStockEvent, OrderPaidEvent},
    spe_api::{errors::ReconciliationError, order_objects::CycleReport},
    traits::{FulfilmentDatabase, FulfilmentResult, PaymentNode},
};

/// The reconciliation cycle: deliver what has been paid for, and look for payments on open orders.
///
/// A cycle is two sweeps, run in order:
/// 1. **Delivery.** Every paid, undelivered, unrefunded order tries to claim a stock item. Orders that cannot be served
///    are flagged `out_of_stock` once (which triggers the refund prompt) and retried every cycle after that.
/// 2. **Payment.** Every unpaid order whose quote is still valid has its deposit address checked on the ledger. Orders
///    that have received at least the quoted amount are marked paid and delivered straight away if stock allows.
///
/// Every state change is a conditional update, so running a cycle twice, or concurrently with itself, never delivers
/// an order twice. A failure on one order is logged and counted, and the sweep moves on to the next one.
pub struct ReconciliationApi<B, N> {
    db: B,
    node: N,
    producers: EventProducers,
    min_confirmations: u32,
}

impl<B, N> Debug for ReconciliationApi<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi(min_confirmations: {})", self.min_confirmations)
    }
}

impl<B, N> ReconciliationApi<B, N> {
    pub fn new(db: B, node: N, producers: EventProducers) -> Self {
        Self { db, node, producers, min_confirmations: 0 }
    }

    pub fn with_min_confirmations(mut self, min_confirmations: u32) -> Self {
        self.min_confirmations = min_confirmations;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, N> ReconciliationApi<B, N>
where
    B: FulfilmentDatabase,
    N: PaymentNode,
{
    pub async fn run_cycle(&self) -> Result<CycleReport, ReconciliationError> {
        self.run_cycle_at(Utc::now()).await
    }

    /// Runs one cycle, using `now` as the reference time for quote expiry.
    ///
    /// Only a failure to list the orders for a sweep is returned as an error. Everything that goes wrong with an
    /// individual order is counted in [`CycleReport::errors`] instead.
    pub async fn run_cycle_at(&self, now: DateTime<Utc>) -> Result<CycleReport, ReconciliationError> {
        let mut report = CycleReport::default();
        self.delivery_sweep(&mut report).await?;
        self.payment_sweep(now, &mut report).await?;
        if report.is_quiet() {
            trace!("🔄️⚖️ Reconciliation cycle complete. Nothing to do.");
        } else {
            info!(
                "🔄️⚖️ Reconciliation cycle complete. {} paid, {} delivered, {} out of stock, {} awaiting stock, {} errors",
                report.newly_paid.len(),
                report.delivered.len(),
                report.out_of_stock.len(),
                report.awaiting_stock,
                report.errors
            );
        }
        Ok(report)
    }

    async fn delivery_sweep(&self, report: &mut CycleReport) -> Result<(), ReconciliationError> {
        let orders = self.db.fetch_orders_awaiting_delivery().await?;
        trace!("🔄️⚖️ {} paid orders are awaiting delivery", orders.len());
        for order in orders {
            let id = order.id;
            if let Err(e) = self.deliver(order, report).await {
                warn!("🔄️⚖️ Could not deliver order #{id}. It will be retried next cycle. {e}");
                report.errors += 1;
            }
        }
        Ok(())
    }

    async fn payment_sweep(&self, now: DateTime<Utc>, report: &mut CycleReport) -> Result<(), ReconciliationError> {
        let orders = self.db.fetch_unpaid_orders().await?;
        trace!("🔄️⚖️ {} orders are awaiting payment", orders.len());
        for order in orders {
            if order.is_expired_at(now) {
                report.expired_skipped += 1;
                continue;
            }
            let id = order.id;
            if let Err(e) = self.check_payment(order, report).await {
                warn!("🔄️⚖️ Could not check payment for order #{id}. It will be retried next cycle. {e}");
                report.errors += 1;
            }
        }
        Ok(())
    }

    async fn check_payment(&self, order: Order, report: &mut CycleReport) -> Result<(), ReconciliationError> {
        let received = self.node.received_at_address(&order.address, self.min_confirmations).await?;
        if received < order.crypto_amount {
            trace!("🔄️⚖️ Order #{} has received {received} of {}", order.id, order.crypto_amount);
            return Ok(());
        }
        match self.db.mark_paid(order.id).await? {
            Some(paid) => {
                info!("🔄️⚖️ Order #{} is paid: {received} received at {}", paid.id, paid.address);
                report.newly_paid.push(paid.id);
                self.producers.publish_order_paid(OrderPaidEvent::new(paid.clone())).await;
                self.deliver(paid, report).await
            },
            None => {
                debug!("🔄️⚖️ Order #{} was already marked as paid", order.id);
                Ok(())
            },
        }
    }

    /// Tries to bind a paid order to a stock item, falling back to the out-of-stock path.
    async fn deliver(&self, order: Order, report: &mut CycleReport) -> Result<(), ReconciliationError> {
        match self.db.fulfil_order(order.id).await? {
            FulfilmentResult::Delivered { order, item } => {
                info!("🔄️📦️ Order #{} delivered with stock item #{}", order.id, item.id);
                report.delivered.push(order.id);
                self.producers.publish_order_delivered(OrderDeliveredEvent::new(order, item)).await;
            },
            FulfilmentResult::OutOfStock(order) if order.out_of_stock => {
                trace!("🔄️📦️ Order #{} is still waiting for {}", order.id, order.sku());
                report.awaiting_stock += 1;
            },
            FulfilmentResult::OutOfStock(order) => match self.db.mark_out_of_stock(order.id).await? {
                Some(order) => {
                    info!("🔄️📦️ Order #{} is paid but {} is out of stock. Offering a refund.", order.id, order.sku());
                    report.out_of_stock.push(order.id);
                    self.producers.publish_order_out_of_stock(OrderOutOfStockEvent::new(order)).await;
                },
                None => report.awaiting_stock += 1,
            },
            FulfilmentResult::NotDeliverable(order) => {
                debug!("🔄️📦️ Order #{} is no longer deliverable ({})", order.id, order.state());
            },
        }
        Ok(())
    }
}
