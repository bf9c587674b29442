//! Stockpay Engine
//!
//! The stockpay engine sells finite, non-fungible digital items for cryptocurrency. It locks a price quote when an
//! order is placed, watches the payment ledger until the quoted amount arrives at the order's deposit address, and then
//! binds exactly one stock item to the order. If the pool has run dry by then, the order is routed into a refund flow.
//!
//! The library is divided into these main sections:
//! 1. Backend contracts ([`mod@traits`]) and their SQLite implementation. The order ledger and the inventory pool share
//!    one database, so that claiming a stock item and marking the order as delivered commit together. You should never
//!    need to touch the database directly. The data types it stores are public, in [`mod@db_types`].
//! 2. The engine API: [`OrderFlowApi`] for placing orders, [`InventoryApi`] for stock intake, [`ReconciliationApi`] for
//!    the periodic payment and delivery sweeps, and [`RefundApi`] for the refund conversation and payout.
//! 3. The [`mod@catalog`], which fixes the regions, products and USD prices on offer.
//!
//! The engine also emits events when orders are paid, delivered, found to be out of stock, or refunded. Hooks
//! registered through [`events::EventHooks`] run in their own tasks, which is how notifications reach customers.
pub mod catalog;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod sessions;
mod spe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use spe_api::{
    CycleReport,
    InventoryApi,
    InventoryApiError,
    Offer,
    OrderFlowApi,
    OrderFlowError,
    OrderResult,
    PriceQuoter,
    Quote,
    QuoteError,
    ReconciliationApi,
    ReconciliationError,
    RefundApi,
    RefundError,
    DEFAULT_QUOTE_LOCK_SECS,
};
