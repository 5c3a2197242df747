use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::error::LedgerError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            LedgerError::Invalid(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            LedgerError::InsufficientFunds { .. } => (StatusCode::BAD_REQUEST, "INSUFFICIENT_FUNDS"),
            LedgerError::InsufficientQuantity { .. } => {
                (StatusCode::BAD_REQUEST, "INSUFFICIENT_QUANTITY")
            }
            LedgerError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            LedgerError::CategoryMismatch { .. } => (StatusCode::CONFLICT, "CATEGORY_MISMATCH"),
            LedgerError::PriceUnavailable { .. } => (StatusCode::BAD_GATEWAY, "PRICE_UNAVAILABLE"),
            LedgerError::Storage(e) => {
                error!(error = %e, "storage failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_FAILURE")
            }
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code,
        });
        (status, body).into_response()
    }
}
