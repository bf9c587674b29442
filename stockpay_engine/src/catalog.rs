//! The static price table: which regions are served, which product variants exist, and the USD price of each unit
//! size.
//!
//! The catalog is loaded from TOML:
//!
//! ```toml
//! asset = "dash"
//!
//! [[regions]]
//! id = "north"
//! label = "North side"
//!
//! [[products]]
//! name = "Widget"
//! aliases = ["w", "wid"]
//! prices = { "0.5" = "17.50", "1.0" = "30" }
//! ```
use std::{collections::BTreeMap, path::Path};

use log::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{db_types::Sku, helpers::normalize_size};

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Could not read the catalog file. {0}")]
    Io(String),
    #[error("Could not parse the catalog. {0}")]
    Parse(String),
    #[error("Invalid catalog. {0}")]
    Invalid(String),
    #[error("Unknown region: {0}")]
    UnknownRegion(String),
    #[error("Unknown product: {0}")]
    UnknownVariant(String),
    #[error("{variant} is not sold in size {size}")]
    UnknownSize { variant: String, size: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// USD price per unit size. Keys are normalised sizes once the catalog is loaded.
    pub prices: BTreeMap<String, Decimal>,
}

impl Product {
    fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    /// The oracle id of the payment coin, e.g. `dash`
    pub asset: String,
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Catalog {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError::Io(format!("{}: {e}", path.display())))?;
        let catalog = Self::from_toml_str(&contents)?;
        info!(
            "🛒️ Loaded catalog from {}: {} regions, {} products",
            path.display(),
            catalog.regions.len(),
            catalog.products.len()
        );
        Ok(catalog)
    }

    /// Parses and validates a catalog. Size keys are normalised; prices must be positive; names and aliases must be
    /// unambiguous.
    pub fn from_toml_str(s: &str) -> Result<Self, CatalogError> {
        let mut catalog: Catalog = toml::from_str(s).map_err(|e| CatalogError::Parse(e.to_string()))?;
        for product in &mut catalog.products {
            let mut prices = BTreeMap::new();
            for (size, price) in &product.prices {
                if *price <= Decimal::ZERO {
                    return Err(CatalogError::Invalid(format!("{} size {size} has a non-positive price", product.name)));
                }
                if prices.insert(normalize_size(size), *price).is_some() {
                    return Err(CatalogError::Invalid(format!("{} lists size {size} more than once", product.name)));
                }
            }
            product.prices = prices;
        }
        let mut names: Vec<String> = catalog
            .products
            .iter()
            .flat_map(|p| std::iter::once(&p.name).chain(p.aliases.iter()))
            .map(|n| n.to_ascii_lowercase())
            .collect();
        let count = names.len();
        names.sort();
        names.dedup();
        if names.len() != count {
            return Err(CatalogError::Invalid("product names and aliases must be unique".into()));
        }
        Ok(catalog)
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        let id = id.trim();
        self.regions.iter().find(|r| r.id.eq_ignore_ascii_case(id))
    }

    /// Finds a product by its name or one of its aliases, ignoring case.
    pub fn product(&self, name: &str) -> Option<&Product> {
        let name = name.trim();
        self.products.iter().find(|p| p.answers_to(name))
    }

    pub fn price(&self, variant: &str, size: &str) -> Option<Decimal> {
        self.product(variant).and_then(|p| p.prices.get(&normalize_size(size)).copied())
    }

    /// Maps user input onto the canonical SKU: the region's id, the product's name and the normalised size.
    pub fn resolve_sku(&self, region: &str, variant: &str, size: &str) -> Result<Sku, CatalogError> {
        let region = self.region(region).ok_or_else(|| CatalogError::UnknownRegion(region.to_string()))?;
        let product = self.product(variant).ok_or_else(|| CatalogError::UnknownVariant(variant.to_string()))?;
        let size = normalize_size(size);
        if !product.prices.contains_key(&size) {
            return Err(CatalogError::UnknownSize { variant: product.name.clone(), size });
        }
        Ok(Sku::new(region.id.as_str(), product.name.as_str(), size))
    }

    /// The USD price of a canonical SKU.
    pub fn price_for(&self, sku: &Sku) -> Result<Decimal, CatalogError> {
        let product = self.product(&sku.variant).ok_or_else(|| CatalogError::UnknownVariant(sku.variant.clone()))?;
        product
            .prices
            .get(&sku.size)
            .copied()
            .ok_or_else(|| CatalogError::UnknownSize { variant: product.name.clone(), size: sku.size.clone() })
    }
}
