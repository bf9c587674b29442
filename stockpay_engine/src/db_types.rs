//! Data types shared by the engine API and its storage backends.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
pub use spg_common::CoinAmount;
use sqlx::FromRow;

//--------------------------------------        Sku         ---------------------------------------------------------
/// The (region, product variant, unit size) triple that both orders and stock items are tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sku {
    pub region: String,
    pub variant: String,
    pub size: String,
}

impl Sku {
    pub fn new<R: Into<String>, V: Into<String>, S: Into<String>>(region: R, variant: V, size: S) -> Self {
        Self { region: region.into(), variant: variant.into(), size: size.into() }
    }
}

impl Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.region, self.variant, self.size)
    }
}

//--------------------------------------     OrderState      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderState {
    /// Waiting for payment at the deposit address.
    Created,
    /// The quote lapsed before payment was observed. Terminal.
    Expired,
    /// Payment was observed. Delivery is pending.
    Paid,
    /// Payment was observed but no matching stock was available. The owner has been offered a refund.
    PaidNoStock,
    /// The owner asked for a refund and is supplying (or has supplied) a payout address.
    RefundRequested,
    Delivered,
    Refunded,
}

impl Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderState::Created => "Created",
            OrderState::Expired => "Expired",
            OrderState::Paid => "Paid",
            OrderState::PaidNoStock => "PaidNoStock",
            OrderState::RefundRequested => "RefundRequested",
            OrderState::Delivered => "Delivered",
            OrderState::Refunded => "Refunded",
        };
        f.write_str(s)
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    /// The customer this order belongs to, as identified by the front-end
    pub owner: String,
    pub region: String,
    pub variant: String,
    pub size: String,
    pub usd_price: Decimal,
    /// The USD price of one coin at the time the order was quoted
    pub rate: Decimal,
    /// The amount that must arrive at `address` for the order to be paid. Fixed at creation.
    pub crypto_amount: CoinAmount,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub paid: bool,
    pub delivered: bool,
    pub out_of_stock: bool,
    pub refund_requested: bool,
    pub refund_address: Option<String>,
    pub refunded: bool,
    pub refund_tx: Option<String>,
    /// Set while a refund payout is in flight. Reserved orders are never delivered.
    pub payout_started: bool,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn sku(&self) -> Sku {
        Sku::new(self.region.as_str(), self.variant.as_str(), self.size.as_str())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Derives the lifecycle state from the order flags. Flags later in the lifecycle take precedence.
    pub fn state_at(&self, now: DateTime<Utc>) -> OrderState {
        if self.refunded {
            OrderState::Refunded
        } else if self.delivered {
            OrderState::Delivered
        } else if self.refund_requested {
            OrderState::RefundRequested
        } else if self.paid && self.out_of_stock {
            OrderState::PaidNoStock
        } else if self.paid {
            OrderState::Paid
        } else if self.is_expired_at(now) {
            OrderState::Expired
        } else {
            OrderState::Created
        }
    }

    pub fn state(&self) -> OrderState {
        self.state_at(Utc::now())
    }
}

//--------------------------------------      NewOrder      ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub owner: String,
    pub sku: Sku,
    pub usd_price: Decimal,
    pub rate: Decimal,
    pub crypto_amount: CoinAmount,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

//--------------------------------------     StockItem      ---------------------------------------------------------
/// One deliverable unit of inventory. `payload_ref` is opaque to the engine; the delivery channel knows how to
/// resolve it (a file id, a URL, a licence key).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StockItem {
    pub id: i64,
    pub region: String,
    pub variant: String,
    pub size: String,
    pub payload_ref: String,
    pub added_at: DateTime<Utc>,
    pub used: bool,
    pub order_id: Option<i64>,
    pub claimed_at: Option<DateTime<Utc>>,
}

impl StockItem {
    pub fn sku(&self) -> Sku {
        Sku::new(self.region.as_str(), self.variant.as_str(), self.size.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct NewStockItem {
    pub sku: Sku,
    pub payload_ref: String,
}

impl NewStockItem {
    pub fn new<S: Into<String>>(sku: Sku, payload_ref: S) -> Self {
        Self { sku, payload_ref: payload_ref.into() }
    }
}

//--------------------------------------    StockFilter     ---------------------------------------------------------
/// Availability query. `variant` and `size` narrow the count when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockFilter {
    pub region: String,
    pub variant: Option<String>,
    pub size: Option<String>,
}

impl StockFilter {
    pub fn for_region<S: Into<String>>(region: S) -> Self {
        Self { region: region.into(), ..Default::default() }
    }

    pub fn with_variant<S: Into<String>>(mut self, variant: S) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_size<S: Into<String>>(mut self, size: S) -> Self {
        self.size = Some(size.into());
        self
    }
}

impl From<&Sku> for StockFilter {
    fn from(sku: &Sku) -> Self {
        Self { region: sku.region.clone(), variant: Some(sku.variant.clone()), size: Some(sku.size.clone()) }
    }
}
