//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::TransferError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Transfer execution error.
    Transfer(TransferError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Transfer(err) => transfer_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn transfer_error_to_response(err: TransferError) -> (StatusCode, String) {
    match &err {
        TransferError::Validation { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        TransferError::ApprovalTimeout { .. } => (StatusCode::REQUEST_TIMEOUT, err.to_string()),
        TransferError::Cancelled { .. } => (StatusCode::CONFLICT, err.to_string()),
        TransferError::Withdrawal { .. }
        | TransferError::DepositRejected { .. }
        | TransferError::DepositFailed { .. }
        | TransferError::Notification { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
        TransferError::Runtime { .. } => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        ApiError::Transfer(err)
    }
}
