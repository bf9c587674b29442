use std::{fmt::Debug, sync::Arc};

use chrono::Duration;
use log::*;

use crate::{
    catalog::{Catalog, CatalogError},
    db_types::{NewStockItem, Sku, StockFilter, StockItem},
    helpers::normalize_size,
    sessions::SessionStore,
    spe_api::errors::InventoryApiError,
    traits::InventoryManagement,
};

/// Stock intake and availability queries, plus the admin "upload mode" in which a sequence of payloads is added under
/// one (region, variant, size) target.
pub struct InventoryApi<B> {
    db: B,
    catalog: Arc<Catalog>,
    uploads: SessionStore<String, Sku>,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B: Clone> Clone for InventoryApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), catalog: Arc::clone(&self.catalog), uploads: self.uploads.clone() }
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B, catalog: Arc<Catalog>, session_ttl: Duration) -> Self {
        Self { db, catalog, uploads: SessionStore::new(session_ttl) }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    /// Adds one deliverable item to the pool. The target is validated against the catalog and stored in canonical
    /// form, so `("north", "w", "1")` and `("north", "Widget", "1.0")` land in the same bucket.
    pub async fn add_stock(
        &self,
        region: &str,
        variant: &str,
        size: &str,
        payload_ref: &str,
    ) -> Result<StockItem, InventoryApiError> {
        let sku = self.catalog.resolve_sku(region, variant, size)?;
        self.add_stock_for_sku(sku, payload_ref).await
    }

    async fn add_stock_for_sku(&self, sku: Sku, payload_ref: &str) -> Result<StockItem, InventoryApiError> {
        let payload_ref = payload_ref.trim();
        if payload_ref.is_empty() {
            return Err(InventoryApiError::EmptyPayload);
        }
        let item = self.db.add_stock(NewStockItem::new(sku, payload_ref)).await?;
        info!("🛒️ Stock item #{} added to {}", item.id, item.sku());
        Ok(item)
    }

    /// Counts unused items. Region is required; variant and size narrow the count when given. Variant and size are
    /// resolved through the catalog first, so aliases and un-normalised sizes count the same stock.
    pub async fn available_count(
        &self,
        region: &str,
        variant: Option<&str>,
        size: Option<&str>,
    ) -> Result<i64, InventoryApiError> {
        let filter = self.resolve_filter(region, variant, size)?;
        let count = self.db.available_count(&filter).await?;
        Ok(count)
    }

    /// Takes the oldest unused item for the SKU out of the pool, without binding it to an order.
    pub async fn claim_one(&self, sku: &Sku) -> Result<Option<StockItem>, InventoryApiError> {
        let item = self.db.claim_one(sku).await?;
        match &item {
            Some(item) => debug!("🛒️ Claimed stock item #{} from {sku}", item.id),
            None => debug!("🛒️ Nothing left to claim in {sku}"),
        }
        Ok(item)
    }

    /// Opens (or retargets) an upload session for `admin`.
    pub fn begin_upload(&self, admin: &str, region: &str, variant: &str, size: &str) -> Result<Sku, InventoryApiError> {
        let sku = self.catalog.resolve_sku(region, variant, size)?;
        info!("🛒️ {admin} is uploading stock for {sku}");
        self.uploads.open(admin.to_string(), sku.clone());
        Ok(sku)
    }

    /// Adds a payload to the target of `admin`'s open upload session. The session stays open.
    pub async fn upload(&self, admin: &str, payload_ref: &str) -> Result<StockItem, InventoryApiError> {
        let sku = self.upload_target(admin).ok_or_else(|| InventoryApiError::NoUploadSession(admin.to_string()))?;
        self.add_stock_for_sku(sku, payload_ref).await
    }

    /// Closes `admin`'s upload session and returns its target.
    pub fn end_upload(&self, admin: &str) -> Result<Sku, InventoryApiError> {
        let sku = self
            .uploads
            .close(&admin.to_string())
            .ok_or_else(|| InventoryApiError::NoUploadSession(admin.to_string()))?;
        info!("🛒️ {admin} finished uploading stock for {sku}");
        Ok(sku)
    }

    pub fn upload_target(&self, admin: &str) -> Option<Sku> {
        self.uploads.get(&admin.to_string())
    }

    fn resolve_filter(
        &self,
        region: &str,
        variant: Option<&str>,
        size: Option<&str>,
    ) -> Result<StockFilter, InventoryApiError> {
        match (variant, size) {
            (Some(variant), Some(size)) => Ok(StockFilter::from(&self.catalog.resolve_sku(region, variant, size)?)),
            (variant, size) => {
                let region = self
                    .catalog
                    .region(region)
                    .ok_or_else(|| CatalogError::UnknownRegion(region.to_string()))?;
                let mut filter = StockFilter::for_region(&region.id);
                if let Some(variant) = variant {
                    let product = self
                        .catalog
                        .product(variant)
                        .ok_or_else(|| CatalogError::UnknownVariant(variant.to_string()))?;
                    filter = filter.with_variant(&product.name);
                }
                if let Some(size) = size {
                    filter = filter.with_size(&normalize_size(size));
                }
                Ok(filter)
            },
        }
    }
}
