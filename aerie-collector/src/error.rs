//! Error types for aerie-collector

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// aerie-common error
    #[error("Common error: {0}")]
    Common(#[from] aerie_common::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Common(err) => match err {
                aerie_common::Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
                aerie_common::Error::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
                }
                other => {
                    tracing::error!(error = %other, "Request failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "COMMON_ERROR",
                        other.to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn status_and_code(err: ApiError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, body["error"]["code"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_error_status_mapping() {
        assert_eq!(
            status_and_code(ApiError::BadRequest("bad".to_string())).await,
            (StatusCode::BAD_REQUEST, "BAD_REQUEST".to_string())
        );
        assert_eq!(
            status_and_code(aerie_common::Error::NotFound("tweet 1".to_string()).into()).await,
            (StatusCode::NOT_FOUND, "NOT_FOUND".to_string())
        );
        assert_eq!(
            status_and_code(aerie_common::Error::InvalidInput("empty id".to_string()).into()).await,
            (StatusCode::BAD_REQUEST, "BAD_REQUEST".to_string())
        );
        assert_eq!(
            status_and_code(aerie_common::Error::Internal("corrupt row".to_string()).into()).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR".to_string())
        );
    }
}
