//!
//! # Error Handling
//!
//! This module defines `AppError`, the single error type flowing out of every
//! service and handler. Each variant belongs to exactly one `ErrorKind`, and the
//! HTTP boundary maps the kind (never the message) to a status code.
//!
//! `AppError` implements `actix_web::error::ResponseError`, so handlers can return
//! `Result<_, AppError>` and failures are rendered with the uniform
//! `{code, message, data}` envelope. `From` conversions for `sqlx::Error`,
//! `validator::ValidationErrors`, `jsonwebtoken::errors::Error` and
//! `bcrypt::BcryptError` allow the `?` operator throughout.

use actix_web::{error::BlockingError, error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;
use validator::ValidationErrors;

use crate::response::ApiResponse;

/// Coarse classification of an `AppError`, one per HTTP status the API emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input shape or range (400).
    Validation,
    /// Missing, malformed, invalid or expired credentials (401).
    Authentication,
    /// Valid identity acting on a resource it does not own (403).
    Authorization,
    /// Resource does not exist (404).
    NotFound,
    /// Duplicate username or email. Reported as 400.
    Conflict,
    /// Persistence, hashing or signing failure (500).
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Represents all possible errors that can occur within the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body, query or path failed validation.
    #[error("{0}")]
    Validation(String),

    /// No `Authorization` header on a protected route.
    #[error("missing authorization header")]
    MissingCredential,

    /// `Authorization` header present but not `Bearer <token>`.
    #[error("authorization header must be in the form: Bearer <token>")]
    MalformedCredential,

    /// Token failed signature, algorithm, issuer, kind or expiry checks.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Unknown username or wrong password at login.
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("account is disabled")]
    AccountDisabled,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Unique constraint violation on username or email.
    #[error("{0}")]
    Conflict(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::MissingCredential
            | AppError::MalformedCredential
            | AppError::InvalidToken(_)
            | AppError::InvalidCredentials
            | AppError::AccountDisabled => ErrorKind::Authentication,
            AppError::Forbidden(_) => ErrorKind::Authorization,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Hashing(_)
            | AppError::Signing(_)
            | AppError::Database(_)
            | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message shown to the client. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if self.kind() == ErrorKind::Internal {
            log::error!("request failed: {}", self);
        }
        HttpResponse::build(status).json(ApiResponse::<()>::error(status, self.public_message()))
    }
}

/// `RowNotFound` becomes `NotFound`; unique violations are translated by the
/// repositories before reaching this conversion.
impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> AppError {
        match error {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".into()),
            _ => AppError::Database(error.to_string()),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::Validation(error.to_string())
    }
}

/// Decoding failures only. Encoding failures are mapped to `Signing` explicitly.
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> AppError {
        AppError::InvalidToken(error.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> AppError {
        AppError::Hashing(error.to_string())
    }
}

impl From<BlockingError> for AppError {
    fn from(error: BlockingError) -> AppError {
        AppError::Internal(error.to_string())
    }
}
