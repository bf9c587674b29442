use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    catalog::Catalog,
    db_types::{NewOrder, Order, StockFilter},
    spe_api::{
        errors::OrderFlowError,
        order_objects::{Offer, Quote},
        price_quoter::PriceQuoter,
    },
    traits::{FulfilmentDatabase, PaymentNode, PriceOracle},
};

/// Default validity of a price quote, in seconds.
pub const DEFAULT_QUOTE_LOCK_SECS: i64 = 900;

/// `OrderFlowApi` handles the customer-facing side of an order: browsing what is on offer, placing an order at a
/// locked price, and looking orders up again.
///
/// Payment detection and delivery happen later, in the [`crate::ReconciliationApi`].
pub struct OrderFlowApi<B, N, P> {
    db: B,
    node: N,
    quoter: PriceQuoter<P>,
    quote_lock: Duration,
}

impl<B, N, P> Debug for OrderFlowApi<B, N, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, N, P> OrderFlowApi<B, N, P> {
    pub fn new(db: B, node: N, quoter: PriceQuoter<P>) -> Self {
        Self { db, node, quoter, quote_lock: Duration::seconds(DEFAULT_QUOTE_LOCK_SECS) }
    }

    pub fn with_quote_lock(mut self, quote_lock: Duration) -> Self {
        self.quote_lock = quote_lock;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn catalog(&self) -> &Catalog {
        self.quoter.catalog()
    }
}

impl<B, N, P> OrderFlowApi<B, N, P>
where
    B: FulfilmentDatabase,
    N: PaymentNode,
    P: PriceOracle,
{
    /// Places a new order.
    ///
    /// The product is resolved against the catalog, stock is checked, a quote is locked in and a fresh deposit
    /// address is obtained. Only then is the order written. Any failure along the way leaves no trace in the ledger.
    ///
    /// The stock check is advisory: stock is not reserved, so an order can still end up paid with nothing to deliver.
    pub async fn create_order(
        &self,
        owner: &str,
        region: &str,
        variant: &str,
        size: &str,
    ) -> Result<Order, OrderFlowError> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(OrderFlowError::InvalidRequest("an order must have an owner".into()));
        }
        let sku = self.catalog().resolve_sku(region, variant, size)?;
        let available = self.db.available_count(&StockFilter::from(&sku)).await?;
        if available <= 0 {
            debug!("🔄️📦️ {owner} tried to order {sku}, but it is out of stock");
            return Err(OrderFlowError::OutOfStock(sku));
        }
        let Quote { sku, usd_price, rate, crypto_amount } = self.quoter.quote(&sku).await?;
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.quote_lock).ok_or_else(|| {
            error!("🔄️📦️ A quote lock of {}s is out of range. Check the configuration.", self.quote_lock.num_seconds());
            OrderFlowError::QuoteUnavailable("the quote lock is out of range".into())
        })?;
        let address = self.node.new_deposit_address().await.map_err(|e| {
            warn!("🔄️📦️ Could not get a deposit address from the payment node. {e}");
            OrderFlowError::DepositAddressUnavailable(e.to_string())
        })?;
        let new_order = NewOrder {
            owner: owner.to_string(),
            sku,
            usd_price,
            rate,
            crypto_amount,
            address,
            created_at: now,
            expires_at,
        };
        let order = self.db.insert_order(new_order).await?;
        info!(
            "🔄️📦️ Order #{} created for {}: {} at ${} = {} to {}",
            order.id,
            order.owner,
            order.sku(),
            order.usd_price,
            order.crypto_amount,
            order.address
        );
        Ok(order)
    }

    /// Everything that can be ordered in the region right now: catalog entries with at least one item in stock.
    pub async fn offers(&self, region: &str) -> Result<Vec<Offer>, OrderFlowError> {
        let catalog = self.catalog();
        let region = catalog
            .region(region)
            .ok_or_else(|| OrderFlowError::UnknownProduct(format!("Unknown region: {region}")))?;
        let levels = self.db.stock_levels(&region.id).await?;
        let offers = levels
            .into_iter()
            .filter(|level| level.available > 0)
            .filter_map(|level| {
                let usd_price = catalog.price_for(&level.sku).ok()?;
                Some(Offer { sku: level.sku, usd_price, available: level.available })
            })
            .collect();
        Ok(offers)
    }

    pub async fn fetch_order(&self, id: i64) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(id).await?.ok_or(OrderFlowError::OrderNotFound(id))
    }

    pub async fn orders_for_owner(&self, owner: &str) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.fetch_orders_for_owner(owner).await?;
        Ok(orders)
    }
}
