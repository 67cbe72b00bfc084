// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request-level error types and their HTTP mapping.

use crate::signature::SignatureError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors that end a request with a non-2xx status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid webhook signature: {0}")]
    Unauthorized(#[from] SignatureError),

    #[error("Webhook signature required")]
    MissingSignature,

    #[error("Malformed JSON payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    #[error("Record store unavailable: {0}")]
    Storage(#[from] StoreError),

    #[error("Failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Route not found")]
    NotFound,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::MissingSignature => StatusCode::UNAUTHORIZED,
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            // Retryable from the sender's point of view
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "INVALID_SIGNATURE",
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::Storage(_) => "STORE_UNAVAILABLE",
            Self::Encode(_) => "INTERNAL",
            Self::NotFound => "NOT_FOUND",
        }
    }

    /// Outcome label used for webhook metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) | Self::MissingSignature => "unauthorized",
            Self::MalformedPayload(_) => "malformed",
            Self::Storage(_) => "storage_error",
            Self::Encode(_) => "internal_error",
            Self::NotFound => "not_found",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error = match &self {
            // Say nothing about which part of the signature check failed
            Self::Unauthorized(_) => "Invalid webhook signature".to_string(),
            Self::Storage(_) | Self::Encode(_) => "Temporarily unable to process request".to_string(),
            other => other.to_string(),
        };

        (
            self.status(),
            Json(ErrorResponse {
                error,
                code: self.code(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(SignatureError::Mismatch).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::MissingSignature.status(), StatusCode::UNAUTHORIZED);

        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            AppError::MalformedPayload(parse_err).status(),
            StatusCode::BAD_REQUEST
        );

        let store_err = StoreError::Backend("down".to_string());
        assert_eq!(
            AppError::from(store_err).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_storage_details_not_exposed() {
        let response = AppError::Storage(StoreError::Backend("secret dsn".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(!body.contains("secret dsn"));
        assert!(body.contains("STORE_UNAVAILABLE"));
    }
}
