use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use spg_common::CoinAmount;

use crate::db_types::{Order, OrderState, Sku};

/// A locked price quote. Once written into an order, it is never re-derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub sku: Sku,
    pub usd_price: Decimal,
    /// USD per coin at the time of quoting
    pub rate: Decimal,
    /// `usd_price / rate`, rounded up to 8 decimal places
    pub crypto_amount: CoinAmount,
}

/// A product that can be ordered right now in a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub sku: Sku,
    pub usd_price: Decimal,
    pub available: i64,
}

/// An order together with its derived state, as shown to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub state: OrderState,
    #[serde(flatten)]
    pub order: Order,
}

impl OrderResult {
    pub fn at(order: Order, now: DateTime<Utc>) -> Self {
        Self { state: order.state_at(now), order }
    }
}

impl From<Order> for OrderResult {
    fn from(order: Order) -> Self {
        Self::at(order, Utc::now())
    }
}

/// What a single reconciliation cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Orders delivered this cycle, from either sweep
    pub delivered: Vec<i64>,
    /// Orders whose payment was observed this cycle
    pub newly_paid: Vec<i64>,
    /// Orders that were flagged out of stock (and prompted for a refund) this cycle
    pub out_of_stock: Vec<i64>,
    /// Paid orders still waiting for stock that had already been prompted
    pub awaiting_stock: usize,
    /// Unpaid orders skipped because their quote has lapsed
    pub expired_skipped: usize,
    /// Per-order failures. These orders are retried next cycle.
    pub errors: usize,
}

impl CycleReport {
    pub fn is_quiet(&self) -> bool {
        self.delivered.is_empty() && self.newly_paid.is_empty() && self.out_of_stock.is_empty() && self.errors == 0
    }
}
