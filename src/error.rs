use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::StoreError;

/// Errors returned to API callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing or unknown API key")]
    Unauthorized,

    #[error("API key lacks the {0} role")]
    Forbidden(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid CV: {0}")]
    Validation(#[from] garde::Report),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Validation(_) => "INVALID_CV",
            ApiError::Store(_) => "INTERNAL_ERROR",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Validation(report) => Some(serde_json::Value::Array(
                report
                    .iter()
                    .map(|(path, error)| {
                        serde_json::json!({ "field": path.to_string(), "message": error.message() })
                    })
                    .collect(),
            )),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let message = match &self {
            // Storage details stay in the logs.
            ApiError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}
