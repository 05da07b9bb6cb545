//! In-process store adapters. Used by the test suites and for running the API
//! without Postgres; contents live only as long as the process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::{RefreshTokenStore, StoreError, UserStore};
use crate::models::{NewUser, RefreshToken, User};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        let user = user.into_user();
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        let mut users = lock(&self.users);
        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        let stored = users
            .get_mut(&user.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        stored.name = user.name.clone();
        stored.email = user.email.clone();
        stored.password_hash = user.password_hash.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: Mutex<HashMap<Uuid, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows held, expired ones included.
    pub fn len(&self) -> usize {
        lock(&self.tokens).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> Result<(), StoreError> {
        let mut tokens = lock(&self.tokens);
        if tokens.contains_key(&token.token) {
            return Err(StoreError::Conflict("refresh token id collision".into()));
        }
        tokens.insert(token.token, token.clone());
        Ok(())
    }

    async fn get_by_id(
        &self,
        token: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, StoreError> {
        Ok(lock(&self.tokens)
            .get(&token)
            .filter(|t| !t.is_expired(now))
            .cloned())
    }

    async fn delete(&self, token: Uuid) -> Result<(), StoreError> {
        lock(&self.tokens).remove(&token);
        Ok(())
    }

    async fn purge_expired(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tokens = lock(&self.tokens);
        let before = tokens.len();
        tokens.retain(|_, t| t.user_id != user_id || !t.is_expired(now));
        Ok((before - tokens.len()) as u64)
    }

    async fn rotate(
        &self,
        old: Uuid,
        now: DateTime<Utc>,
        replacement: Uuid,
        replacement_expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, StoreError> {
        let mut tokens = lock(&self.tokens);
        let user_id = match tokens.get(&old) {
            Some(current) if !current.is_expired(now) => current.user_id,
            _ => return Ok(None),
        };
        if tokens.contains_key(&replacement) {
            return Err(StoreError::Conflict("refresh token id collision".into()));
        }
        tokens.remove(&old);
        let token = RefreshToken {
            token: replacement,
            user_id,
            expires_at: replacement_expires_at,
            created_at: now,
        };
        tokens.insert(token.token, token.clone());
        Ok(Some(token))
    }
}
