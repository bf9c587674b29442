//! # Stockpay server
//! This crate hosts the server code for the stockpay gateway. It is responsible for:
//! * Serving the customer-facing JSON API: offers, order placement, order lookups and the refund conversation.
//! * Serving the administrative API: stock intake and refund payouts.
//! * Running the reconciliation worker that detects payments and delivers stock.
//! * Relaying order lifecycle events to customers through a notification sink.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: customer routes. See [routes](routes/index.html).
//! * `/admin/...`: operator routes. Requests must carry the `spg_admin_key` header.
pub mod cli;
pub mod commands;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod notifications;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
