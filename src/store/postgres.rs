use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RefreshTokenStore, StoreError, UserStore};
use crate::models::{NewUser, RefreshToken, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

/// `users` table adapter.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, name, email, password_hash, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "email already registered"))
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $1, email = $2, password_hash = $3, updated_at = now() \
             WHERE id = $4 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "email already registered"))
    }
}

/// `refresh_tokens` table adapter.
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "refresh token id collision"))?;
        Ok(())
    }

    async fn get_by_id(
        &self,
        token: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, StoreError> {
        let row = sqlx::query_as::<_, RefreshToken>(
            "SELECT token, user_id, expires_at, created_at FROM refresh_tokens \
             WHERE token = $1 AND expires_at > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete(&self, token: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1 AND expires_at <= $2")
                .bind(user_id)
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn rotate(
        &self,
        old: Uuid,
        now: DateTime<Utc>,
        replacement: Uuid,
        replacement_expires_at: DateTime<Utc>,
    ) -> Result<Option<RefreshToken>, StoreError> {
        // Dropping `tx` before commit rolls back, so a cancelled or failed
        // rotation leaves the old token untouched.
        let mut tx = self.pool.begin().await?;

        let consumed: Option<(Uuid,)> = sqlx::query_as(
            "DELETE FROM refresh_tokens WHERE token = $1 AND expires_at > $2 RETURNING user_id",
        )
        .bind(old)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id,)) = consumed else {
            tx.rollback().await?;
            return Ok(None);
        };

        let token = RefreshToken {
            token: replacement,
            user_id,
            expires_at: replacement_expires_at,
            created_at: now,
        };
        sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(token.token)
        .bind(token.user_id)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::from_sqlx(e, "refresh token id collision"))?;

        tx.commit().await?;
        Ok(Some(token))
    }
}
