//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::store::StoreError;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        self.classify().0
    }

    fn classify(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 400 Bad Request
            AppError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }

            // 401 Unauthorized
            AppError::Unauthenticated(msg) => {
                (StatusCode::UNAUTHORIZED, "unauthenticated", Some(msg.clone()))
            }

            // 403 Forbidden
            AppError::PermissionDenied => (StatusCode::FORBIDDEN, "permission_denied", None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone())),

            // 404 Not Found
            AppError::UserNotFound(id) => {
                (StatusCode::NOT_FOUND, "user_not_found", Some(id.clone()))
            }
            AppError::AccountNotFound(id) => {
                (StatusCode::NOT_FOUND, "account_not_found", Some(id.clone()))
            }
            AppError::TransactionNotFound(id) => {
                (StatusCode::NOT_FOUND, "transaction_not_found", Some(id.clone()))
            }

            // Domain errors - map to appropriate HTTP status
            AppError::Domain(domain_err) => match domain_err {
                // Never say which check failed
                DomainError::TransferRejected(_) => {
                    (StatusCode::BAD_REQUEST, "transfer_rejected", None)
                }
                DomainError::InvalidAmount(e) => {
                    (StatusCode::BAD_REQUEST, "invalid_amount", Some(e.to_string()))
                }
                DomainError::UserAlreadyHasAccount => {
                    (StatusCode::BAD_REQUEST, "user_has_account", None)
                }
                DomainError::AccountAlreadyLinked(id) => {
                    (StatusCode::FORBIDDEN, "account_unavailable", Some(id.to_string()))
                }
                DomainError::AccountNotEmpty(id) => {
                    (StatusCode::CONFLICT, "account_not_empty", Some(id.to_string()))
                }
                DomainError::InvalidStatusTransition { .. } => {
                    (StatusCode::CONFLICT, "invalid_status_transition", None)
                }
            },

            // 500 Internal Server Error
            AppError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AccountNotFound(id) => AppError::AccountNotFound(id.to_string()),
            StoreError::UserNotFound(id) => AppError::UserNotFound(id.to_string()),
            StoreError::TransactionNotFound(id) => AppError::TransactionNotFound(id.to_string()),
            StoreError::InvalidStatusTransition { from, to, .. } => {
                AppError::Domain(DomainError::InvalidStatusTransition { from, to })
            }
            other => AppError::Store(other),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.classify();

        let error = if status.is_server_error() {
            tracing::error!(error = ?self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AmountError, RejectionReason, TransactionStatus};

    #[test]
    fn test_rejection_is_generic_400() {
        let err = AppError::from(DomainError::rejected(RejectionReason::InsufficientFunds));
        let (status, code, details) = err.classify();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "transfer_rejected");
        assert!(details.is_none());
        assert_eq!(
            err.to_string(),
            "Failed transaction. Check the transaction's parameters."
        );
    }

    #[test]
    fn test_store_not_found_maps_to_404() {
        let err = AppError::from(StoreError::AccountNotFound(7));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(matches!(err, AppError::AccountNotFound(ref id) if id == "7"));
    }

    #[test]
    fn test_store_transition_maps_to_409() {
        let err = AppError::from(StoreError::InvalidStatusTransition {
            id: 1,
            from: TransactionStatus::Failed,
            to: TransactionStatus::Successful,
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_store_failure_maps_to_500() {
        let err = AppError::from(StoreError::Unavailable("down".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_domain_status_codes() {
        let cases = [
            (DomainError::InvalidAmount(AmountError::Overflow), StatusCode::BAD_REQUEST),
            (DomainError::UserAlreadyHasAccount, StatusCode::BAD_REQUEST),
            (DomainError::AccountAlreadyLinked(3), StatusCode::FORBIDDEN),
            (DomainError::AccountNotEmpty(3), StatusCode::CONFLICT),
        ];

        for (domain, expected) in cases {
            assert_eq!(AppError::from(domain).status_code(), expected);
        }
    }
}
