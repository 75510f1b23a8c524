//! Error types for the upload orchestrator HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::IdentityError;
use crate::upload::UploadError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Authentication failed: {0}")]
    Identity(#[from] IdentityError),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Upload(e) => (e.status_code(), e.code()),
            AppError::Identity(IdentityError::Request(_)) => {
                (StatusCode::BAD_GATEWAY, "IDENTITY_PROVIDER_UNAVAILABLE")
            }
            AppError::Identity(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(code = code, error = %self, "Request failed");
            // Server-side detail stays in the logs.
            match status {
                StatusCode::BAD_GATEWAY => "Upstream service error".to_string(),
                _ => "An internal error occurred".to_string(),
            }
        } else {
            tracing::debug!(code = code, error = %self, "Request rejected");
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataError;
    use crate::upload::StoreError;

    fn status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status(UploadError::InvalidReference("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(UploadError::QuotaExceeded {
                user_id: "u1".into(),
                used: 1,
                requested: 2,
                allotment: 2,
            }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status(UploadError::from(StoreError::NotFound("a_b".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(UploadError::from(StoreError::Io(std::io::Error::other("disk")))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(UploadError::from(MetadataError::UnexpectedStatus {
                endpoint: "/upload_file".into(),
                status: 500,
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(IdentityError::MissingToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status(IdentityError::Rejected(400)), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_quota_rejection_keeps_its_message() {
        let response = AppError::from(UploadError::QuotaExceeded {
            user_id: "u1".into(),
            used: 400,
            requested: 700,
            allotment: 1000,
        })
        .into_response();

        assert!(response.status().is_client_error());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "QUOTA_EXCEEDED");
        assert_eq!(
            body["message"],
            "Quota exceeded for u1: 400 + 700 bytes exceeds allotment of 1000"
        );
    }
}
