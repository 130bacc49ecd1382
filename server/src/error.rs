//! Error handling for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use edufund_common::CurrencyError;
use edufund_fx::FxError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// API error types.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Currency(#[from] CurrencyError),

    #[error(transparent)]
    Fx(#[from] FxError),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Currency(_) => StatusCode::BAD_REQUEST,
            ApiError::Fx(FxError::AmountOutOfRange { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Fx(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Currency(e) => e.error_code(),
            ApiError::Fx(e) => e.error_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, code, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, code, "Request rejected");
        }

        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
            "code": code,
        }));

        (status, body).into_response()
    }
}
