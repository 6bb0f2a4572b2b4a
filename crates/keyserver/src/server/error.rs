//! HTTP error responses.
//!
//! This is the only place where a [`GatewayError`] becomes a status code.
//! Every failure is written as `{"error": "<message>"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use keyserver_core::error::{GatewayError, NodeError, StoreError, TxError};
use serde::{Deserialize, Serialize};

/// The JSON error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
}

/// A [`GatewayError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl ApiError {
    /// The response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self(error)
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        Self(error.into())
    }
}

impl From<TxError> for ApiError {
    fn from(error: TxError) -> Self {
        Self(error.into())
    }
}

impl From<NodeError> for ApiError {
    fn from(error: NodeError) -> Self {
        Self(error.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(
                kind = self.0.kind(),
                status = status.as_u16(),
                error = %self.0,
                "request failed"
            );
        } else {
            tracing::debug!(
                kind = self.0.kind(),
                status = status.as_u16(),
                error = %self.0,
                "request rejected"
            );
        }

        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Decodes a JSON request body, reporting malformed input as a validation
/// error.
///
/// # Errors
///
/// Returns `Validation` with the decoder's message.
pub fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|e| GatewayError::validation(e.to_string()))
}
