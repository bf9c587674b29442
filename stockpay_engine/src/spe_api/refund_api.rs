use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    db_types::Order,
    events::{EventProducers, OrderRefundedEvent},
    helpers::{validate_refund_address, DEFAULT_MIN_REFUND_ADDRESS_LEN},
    sessions::SessionStore,
    spe_api::errors::RefundError,
    traits::{OrderManagement, PaymentNode},
};

/// The refund path for orders that were paid but could not be delivered.
///
/// Capturing the destination is a two-step conversation: [`RefundApi::request_refund`] flags the order and opens a
/// session for the owner, and the owner's next message goes to [`RefundApi::submit_refund_address`]. The payout itself
/// is never automatic. An operator triggers it with [`RefundApi::execute_payout`].
pub struct RefundApi<B, N> {
    db: B,
    node: N,
    producers: EventProducers,
    pending: SessionStore<String, i64>,
    min_address_len: usize,
}

impl<B, N> Debug for RefundApi<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefundApi")
    }
}

impl<B: Clone, N: Clone> Clone for RefundApi<B, N> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            node: self.node.clone(),
            producers: self.producers.clone(),
            pending: self.pending.clone(),
            min_address_len: self.min_address_len,
        }
    }
}

impl<B, N> RefundApi<B, N> {
    pub fn new(db: B, node: N, producers: EventProducers, session_ttl: Duration) -> Self {
        Self {
            db,
            node,
            producers,
            pending: SessionStore::new(session_ttl),
            min_address_len: DEFAULT_MIN_REFUND_ADDRESS_LEN,
        }
    }

    pub fn with_min_address_len(mut self, min_address_len: usize) -> Self {
        self.min_address_len = min_address_len;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// The order whose refund address `owner` is expected to send next, if any.
    pub fn pending_order(&self, owner: &str) -> Option<i64> {
        self.pending.get(&owner.to_string())
    }
}

impl<B, N> RefundApi<B, N>
where
    B: OrderManagement,
    N: PaymentNode,
{
    /// Marks the order as awaiting a refund and waits for the owner to send a payout address.
    ///
    /// Only the owner of a paid order that was neither delivered nor refunded may ask. Asking again for the same order
    /// is allowed and simply reopens the address prompt.
    pub async fn request_refund(&self, owner: &str, order_id: i64) -> Result<Order, RefundError> {
        let order = self.fetch_order(order_id).await?;
        if order.owner != owner {
            return Err(RefundError::NotOwner(order_id));
        }
        if order.refunded {
            return Err(RefundError::AlreadyRefunded(order_id));
        }
        if order.delivered {
            return Err(RefundError::AlreadyDelivered(order_id));
        }
        if !order.paid {
            return Err(RefundError::NotPaid(order_id));
        }
        let order = match self.db.mark_refund_requested(order_id).await? {
            Some(order) => {
                info!("🔄️💸️ {owner} requested a refund for order #{order_id}");
                order
            },
            None => {
                debug!("🔄️💸️ Refund for order #{order_id} was already requested");
                self.fetch_order(order_id).await?
            },
        };
        self.pending.open(owner.to_string(), order_id);
        Ok(order)
    }

    /// Treats `text` as the payout address for the owner's pending refund.
    ///
    /// An invalid address is rejected and the session stays open, so the owner can simply try again.
    pub async fn submit_refund_address(&self, owner: &str, text: &str) -> Result<Order, RefundError> {
        let key = owner.to_string();
        let order_id = self.pending.get(&key).ok_or(RefundError::NoPendingRefund)?;
        let address = validate_refund_address(text, self.min_address_len).map_err(|e| {
            debug!("🔄️💸️ {owner} sent an invalid refund address for order #{order_id}. {e}");
            RefundError::from(e)
        })?;
        match self.db.set_refund_address(order_id, &address).await? {
            Some(order) => {
                self.pending.close(&key);
                info!("🔄️💸️ Refund address for order #{order_id} saved");
                Ok(order)
            },
            None => {
                self.pending.close(&key);
                let order = self.fetch_order(order_id).await?;
                warn!("🔄️💸️ Order #{order_id} can no longer take a refund address ({})", order.state());
                Err(payout_blocker(&order).unwrap_or(RefundError::NoPendingRefund))
            },
        }
    }

    /// Sends the order's crypto amount back to its stored refund address.
    ///
    /// Nothing is sent unless a refund was requested, an address is on file, and the order has neither been delivered
    /// nor refunded. The order is reserved in the ledger before the transfer, so delivery and any other payout are
    /// locked out while it is in flight. If the node refuses the transfer, the reservation is dropped and the payout
    /// can be retried.
    pub async fn execute_payout(&self, order_id: i64) -> Result<Order, RefundError> {
        let order = self.fetch_order(order_id).await?;
        if let Some(e) = payout_blocker(&order) {
            return Err(e);
        }
        let order = match self.db.reserve_payout(order_id).await? {
            Some(order) => order,
            None => {
                let order = self.fetch_order(order_id).await?;
                debug!("🔄️💸️ Payout for order #{order_id} could not be reserved ({})", order.state());
                return Err(payout_blocker(&order).unwrap_or(RefundError::PayoutInProgress(order_id)));
            },
        };
        let address = order.refund_address.clone().unwrap_or_default();
        info!("🔄️💸️ Sending refund of {} for order #{order_id} to {address}", order.crypto_amount);
        let tx = match self.node.send_to(&address, order.crypto_amount).await {
            Ok(tx) => tx,
            Err(e) => {
                error!("🔄️💸️ Refund payout for order #{order_id} failed. {e}");
                if let Err(release_err) = self.db.release_payout(order_id).await {
                    error!(
                        "🔄️💸️ Could not release the payout reservation on order #{order_id}. Manual attention is \
                         required. {release_err}"
                    );
                }
                return Err(RefundError::from(e));
            },
        };
        let order = match self.db.mark_refunded(order_id, &tx).await? {
            Some(order) => order,
            None => {
                error!(
                    "🔄️💸️ Refund for order #{order_id} was sent in {tx}, but the order could not be marked as refunded. \
                     Manual attention is required."
                );
                return Err(RefundError::DatabaseError(format!("order {order_id} was refunded in {tx} but not updated")));
            },
        };
        info!("🔄️💸️ Order #{order_id} refunded in transaction {tx}");
        self.producers.publish_order_refunded(OrderRefundedEvent::new(order.clone())).await;
        Ok(order)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Order, RefundError> {
        self.db.fetch_order(order_id).await?.ok_or(RefundError::OrderNotFound(order_id))
    }
}

/// The reason `order` cannot be paid out right now, if there is one.
fn payout_blocker(order: &Order) -> Option<RefundError> {
    let id = order.id;
    if order.refunded {
        Some(RefundError::AlreadyRefunded(id))
    } else if order.delivered {
        Some(RefundError::AlreadyDelivered(id))
    } else if !order.refund_requested {
        Some(RefundError::NoRefundRequested(id))
    } else if order.payout_started {
        Some(RefundError::PayoutInProgress(id))
    } else if order.refund_address.as_deref().map_or(true, |a| a.trim().is_empty()) {
        Some(RefundError::InvalidRefundAddress(format!("order {id} has no refund address")))
    } else {
        None
    }
}
