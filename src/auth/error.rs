//! Failures produced by the authentication flows.
//!
//! Credential and token failures are kept distinct here for logging and tests;
//! [`crate::error::AppError`] collapses them into generic client messages.

use super::token::TokenError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Both cases are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("email already exists")]
    EmailAlreadyExists,

    /// Longer than bcrypt can hash without truncation.
    #[error("password is longer than 72 bytes")]
    PasswordTooLong,

    /// Refresh token absent, expired, already redeemed, or not a token id at all.
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error(transparent)]
    Token(#[from] TokenError),

    /// Missing or malformed bearer header, revoked token, or vanished user.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}
