//! Error types for the Thư viện server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Machine-readable error codes returned alongside every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    Duplicate = 5,
    BadValue = 6,
    NoCopyAvailable = 7,
    NotBorrowable = 8,
    BorrowLimitReached = 9,
    RenewalLimitReached = 10,
    MembershipInactive = 11,
    AlreadyReturned = 12,
    Overdue = 13,
    CopiesAvailable = 14,
    ReservationExists = 15,
    AlreadyProcessed = 16,
    ReaderHasBorrowedBooks = 17,
    BooksOnLoan = 18,
    InsufficientStock = 19,
    ReaderWaiting = 20,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {1}")]
    BusinessRule(ErrorCode, String),
}

impl AppError {
    /// Shorthand for a business rule rejection
    pub fn rule(code: ErrorCode, message: impl Into<String>) -> Self {
        AppError::BusinessRule(code, message.into())
    }

    fn parts(&self) -> (StatusCode, ErrorCode, String) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone()),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorCode::Duplicate, msg.clone()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
            AppError::BusinessRule(code, msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, *code, msg.clone())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_maps_to_unprocessable_entity() {
        let err = AppError::rule(ErrorCode::BorrowLimitReached, "Borrow limit reached (3/3)");
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, ErrorCode::BorrowLimitReached);
        assert_eq!(message, "Borrow limit reached (3/3)");
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AppError::Internal("connection reset by peer at 10.0.0.3".to_string());
        let (status, _, message) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");

        let (status, code, message) = AppError::Database(sqlx::Error::PoolTimedOut).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, ErrorCode::DbFailure);
        assert_eq!(message, "Database error");
    }

    #[test]
    fn client_errors_keep_their_message() {
        let (status, code, _) = AppError::NotFound("Book 3 not found".into()).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, ErrorCode::NotFound);

        let (status, _, message) = AppError::Conflict("Username already exists".into()).parts();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, "Username already exists");

        let (status, _, _) = AppError::Authorization("nope".into()).parts();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
