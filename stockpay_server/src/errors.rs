use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use stockpay_engine::{
    catalog::CatalogError,
    traits::{PaymentNodeError, PriceOracleError},
    InventoryApiError,
    OrderFlowError,
    RefundError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The request conflicts with the current state. {0}")]
    Conflict(String),
    #[error("A required service is unavailable. {0}")]
    ServiceUnavailable(String),
    #[error("The payment node rejected the request. {0}")]
    PaymentNodeError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PaymentNodeError(_) => StatusCode::BAD_GATEWAY,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::InvalidRequest(_) => Self::InvalidRequest(e.to_string()),
            OrderFlowError::UnknownProduct(_) | OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::OutOfStock(_) => Self::Conflict(e.to_string()),
            OrderFlowError::QuoteUnavailable(_) | OrderFlowError::DepositAddressUnavailable(_) => {
                Self::ServiceUnavailable(e.to_string())
            },
            OrderFlowError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<InventoryApiError> for ServerError {
    fn from(e: InventoryApiError) -> Self {
        match e {
            InventoryApiError::UnknownProduct(_) => Self::NoRecordFound(e.to_string()),
            InventoryApiError::EmptyPayload => Self::InvalidRequest(e.to_string()),
            InventoryApiError::NoUploadSession(_) => Self::Conflict(e.to_string()),
            InventoryApiError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<RefundError> for ServerError {
    fn from(e: RefundError) -> Self {
        match e {
            RefundError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            RefundError::NotOwner(_) => Self::InsufficientPermissions(e.to_string()),
            RefundError::NotPaid(_) |
            RefundError::AlreadyDelivered(_) |
            RefundError::AlreadyRefunded(_) |
            RefundError::NoRefundRequested(_) |
            RefundError::NoPendingRefund |
            RefundError::PayoutInProgress(_) => Self::Conflict(e.to_string()),
            RefundError::InvalidRefundAddress(_) => Self::InvalidRequest(e.to_string()),
            RefundError::PayoutFailed(_) => Self::PaymentNodeError(e.to_string()),
            RefundError::DatabaseError(_) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<CatalogError> for ServerError {
    fn from(e: CatalogError) -> Self {
        Self::InitializeError(e.to_string())
    }
}

impl From<PaymentNodeError> for ServerError {
    fn from(e: PaymentNodeError) -> Self {
        Self::InitializeError(e.to_string())
    }
}

impl From<PriceOracleError> for ServerError {
    fn from(e: PriceOracleError) -> Self {
        Self::InitializeError(e.to_string())
    }
}
