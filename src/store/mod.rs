//! Persistence seams consumed by the auth service.
//!
//! Both stores are traits with one production adapter ([`postgres`]) and one
//! in-process adapter ([`memory`]) used by tests and local runs. Uniqueness of
//! user emails and refresh-token ids is the store's job, not the caller's.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{NewUser, RefreshToken, User};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryRefreshTokenStore, InMemoryUserStore};
pub use postgres::{PgRefreshTokenStore, PgUserStore};

/// Failure reported by a store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps a unique violation to [`StoreError::Conflict`] and passes everything else through.
    pub(crate) fn from_sqlx(error: sqlx::Error, what: &str) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(what.to_string())
            }
            _ => StoreError::Database(error),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Inserts the user. Fails with [`StoreError::Conflict`] if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    /// Overwrites name, email and password hash and bumps `updated_at`.
    async fn update(&self, user: &User) -> Result<User, StoreError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> Result<(), StoreError>;
    /// Returns the token if it exists and `expires_at > now`. Expired rows
    /// are reported as absent even while they are still stored.
    async fn get_by_id(
        &self,
        token: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, StoreError>;
    /// Removes the token. Deleting an absent token succeeds.
    async fn delete(&self, token: Uuid) -> Result<(), StoreError>;
    /// Deletes `user_id`'s tokens that expired at or before `now`. Returns
    /// how many were removed.
    async fn purge_expired(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<u64, StoreError>;
    /// Atomically consumes `old` and inserts a replacement for the same user.
    ///
    /// Returns `None` without writing anything when `old` is absent or
    /// `expires_at <= now`. When several callers race on the same `old`, at
    /// most one receives `Some`.
    async fn rotate(
        &self,
        old: Uuid,
        now: DateTime<Utc>,
        replacement: Uuid,
        replacement_expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, StoreError>;
}
