use std::fmt::Display;

use serde::{Deserialize, Serialize};
use stockpay_engine::db_types::Sku;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub owner: String,
    pub region: String,
    pub variant: String,
    pub size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub owner: String,
}

/// A free-text reply from the owner. It is trimmed and validated before it is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundAddressRequest {
    pub owner: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddStockRequest {
    pub region: String,
    pub variant: String,
    pub size: String,
    pub payload_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStartRequest {
    pub admin: String,
    pub region: String,
    pub variant: String,
    pub size: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRequest {
    pub admin: String,
    pub payload_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadDoneRequest {
    pub admin: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockQuery {
    pub variant: Option<String>,
    pub size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCount {
    pub region: String,
    pub variant: Option<String>,
    pub size: Option<String>,
    pub available: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSessionResponse {
    pub admin: String,
    pub sku: Sku,
}
