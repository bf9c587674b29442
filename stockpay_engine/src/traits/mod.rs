//! # Backend interfaces
//!
//! This module defines the interface contracts the engine needs from the systems it coordinates.
//!
//! ## Storage
//! The order ledger and the inventory pool live in the same database, so that a claim and the delivery flag it
//! guards can be committed together.
//!
//! * [`OrderManagement`] covers the order ledger: inserting orders, querying them, and the conditional flag updates
//!   that drive the order state machine.
//! * [`InventoryManagement`] covers the inventory pool: adding stock, availability counts and the atomic claim.
//! * [`FulfilmentDatabase`] is the highest-level contract. It binds a paid order to a stock item in one atomic step.
//!
//! ## External systems
//! * [`PaymentNode`] is the narrow interface to the payment ledger: deposit addresses, received totals and payouts.
//! * [`PriceOracle`] supplies the current USD exchange rate for the payment coin.
mod data_objects;
mod fulfilment_database;
mod inventory_management;
mod order_management;
mod payment_node;
mod price_oracle;

pub use data_objects::{FulfilmentResult, StockLevel};
pub use fulfilment_database::{FulfilmentDatabase, FulfilmentError};
pub use inventory_management::{InventoryError, InventoryManagement};
pub use order_management::{OrderLedgerError, OrderManagement};
pub use payment_node::{PaymentNode, PaymentNodeError};
pub use price_oracle::{PriceOracle, PriceOracleError};
