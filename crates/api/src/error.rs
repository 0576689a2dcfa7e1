//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inventory::InventoryError;
use reconciliation::ReconcileError;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Store or ledger error.
    Inventory(InventoryError),
    /// Order service error.
    Reconcile(ReconcileError),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Inventory(err) => inventory_error_to_response(err),
            ApiError::Reconcile(err) => reconcile_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, "internal server error");
        }

        let body = ErrorBody {
            code: status.as_u16(),
            message,
        };
        (status, axum::Json(body)).into_response()
    }
}

fn inventory_error_to_response(err: InventoryError) -> (StatusCode, String) {
    match &err {
        InventoryError::ArticleNotFound(_)
        | InventoryError::ProductNotFound(_)
        | InventoryError::OrderNotFound(_)
        | InventoryError::WarehouseNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        InventoryError::StockOverflow { .. } => (StatusCode::CONFLICT, err.to_string()),
        InventoryError::InvalidAmountOf { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        InventoryError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn reconcile_error_to_response(err: ReconcileError) -> (StatusCode, String) {
    match err {
        ReconcileError::Inventory(err) => inventory_error_to_response(err),
        ReconcileError::QuantityOutOfRange { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        ApiError::Reconcile(err)
    }
}
