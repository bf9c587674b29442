//! The engine's public API. Each struct here wraps a backend (and, where needed, a payment node or price oracle) and
//! implements one part of the order lifecycle on top of it.
mod errors;
mod inventory_api;
mod order_flow_api;
mod order_objects;
mod price_quoter;
mod reconciliation_api;
mod refund_api;

pub use errors::{InventoryApiError, OrderFlowError, QuoteError, ReconciliationError, RefundError};
pub use inventory_api::InventoryApi;
pub use order_flow_api::{OrderFlowApi, DEFAULT_QUOTE_LOCK_SECS};
pub use order_objects::{CycleReport, Offer, OrderResult, Quote};
pub use price_quoter::PriceQuoter;
pub use reconciliation_api::ReconciliationApi;
pub use refund_api::RefundApi;
