//!
//! # HTTP Error Mapping
//!
//! `AppError` is what handlers and middleware return. It implements
//! `actix_web::error::ResponseError`, turning each variant into a status code
//! and a `{"error": "..."}` JSON body.
//!
//! Domain errors enter through `From<AuthError>`. Credential and token failures
//! become 401s with generic messages that never say which check failed;
//! store and internal failures become 500s whose detail is logged, not returned.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::AuthError;

/// Message returned for every failure whose detail must stay server-side.
const INTERNAL_MESSAGE: &str = "Internal Server Error";

#[derive(Debug)]
pub enum AppError {
    /// Authentication missing, invalid, or revoked (HTTP 401).
    Unauthorized(String),
    /// Malformed request body (HTTP 400).
    BadRequest(String),
    /// Unexpected server-side failure (HTTP 500). The message is sent to the client.
    InternalServerError(String),
    /// Request body failed `validator` rules (HTTP 422).
    ValidationError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let msg = match self {
            AppError::Unauthorized(msg)
            | AppError::BadRequest(msg)
            | AppError::InternalServerError(msg)
            | AppError::ValidationError(msg) => msg,
        };
        HttpResponse::build(self.status_code()).json(json!({ "error": msg }))
    }
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> AppError {
        match error {
            AuthError::InvalidCredentials => AppError::Unauthorized("Invalid credentials".into()),
            AuthError::InvalidRefreshToken => {
                AppError::Unauthorized("Invalid refresh token".into())
            }
            AuthError::PasswordTooLong => {
                AppError::ValidationError("password: must be at most 72 bytes".into())
            }
            AuthError::Token(_) => AppError::Unauthorized("Unauthorized".into()),
            AuthError::Unauthorized(msg) => AppError::Unauthorized(msg),
            // Registration conflicts are reported as 500 to match the public API contract.
            AuthError::EmailAlreadyExists => {
                AppError::InternalServerError("Email already exists".into())
            }
            AuthError::Store(e) => {
                log::error!("store failure: {}", e);
                AppError::InternalServerError(INTERNAL_MESSAGE.into())
            }
            AuthError::Internal(msg) => {
                log::error!("internal failure: {}", msg);
                AppError::InternalServerError(INTERNAL_MESSAGE.into())
            }
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The detailed validation messages are preserved.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error.to_string())
    }
}
