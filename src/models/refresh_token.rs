use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A persisted refresh token. The `token` uuid is the opaque value handed to
/// the client; it is valid for exactly one redemption.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RefreshToken {
    pub token: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Mints a fresh token id for `user_id`.
    pub fn new(user_id: Uuid, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            token: Uuid::new_v4(),
            user_id,
            expires_at,
            created_at: now,
        }
    }

    /// A token is dead once `expires_at` has been reached, even if the row still exists.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Payload for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Optional payload for `POST /auth/logout`.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

/// Access and refresh token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
