//! Error types for the gateway
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Gateway Error Enum ==
/// Unified error type for the gateway.
///
/// Every variant carries owned strings so the error is `Clone`: a memoized
/// computation shared by several callers hands the same outcome to each of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Malformed request data (bad JSON, missing fields)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Webhook authenticity check failed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A memoizing wrapper could not be applied to an operation
    #[error("Cannot apply cache: {0}")]
    CacheApply(String),

    /// The remote platform answered with an error or could not be reached
    #[error("Upstream error{}: {message}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Upstream {
        /// HTTP status, None for transport failures
        status: Option<u16>,
        message: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Shorthand for an authenticity failure.
    pub fn invalid(msg: impl Into<String>) -> Self {
        GatewayError::InvalidRequest(msg.into())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::InvalidRequest(_) => StatusCode::UNAUTHORIZED,
            GatewayError::CacheApply(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the gateway.
pub type Result<T> = std::result::Result<T, GatewayError>;
