//! Error types for smeta-brain
//!
//! Every failure reaches the dashboard as `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use smeta_common::Error as CommonError;
use thiserror::Error;
use tracing::{error, warn};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Engine or store error
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Common(CommonError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Common(CommonError::IndexOutOfRange { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Common(CommonError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Request failed: {}", message);
        } else {
            warn!("Request rejected ({}): {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CommonError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (CommonError::IndexOutOfRange { index: 3, len: 1 }, StatusCode::BAD_REQUEST),
            (CommonError::NotFound("item".into()), StatusCode::NOT_FOUND),
            (CommonError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
