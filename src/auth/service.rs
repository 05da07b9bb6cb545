//! Login, registration, refresh-token rotation and logout.
//!
//! Every method is an ordinary future: dropping it cancels the flow at the
//! next await point. Nothing here retries; store failures are returned to the
//! caller as [`AuthError::Store`].

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use super::{AuthError, Claims, PasswordHasher, RevocationStore, TokenIssuer};
use crate::models::{NewUser, RefreshToken, TokenPair, User};
use crate::store::{RefreshTokenStore, StoreError, UserStore};

/// Default lifetime of a refresh token (30 days).
pub const DEFAULT_REFRESH_TTL_MINUTES: i64 = 43_200;

pub struct AuthService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    revocations: Arc<RevocationStore>,
    refresh_ttl: Duration,
}

/// Runs CPU-heavy hashing off the async workers.
async fn blocking<F, T>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Internal(format!("password task failed: {}", e)))
}

fn refresh_expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, AuthError> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AuthError::Internal("refresh token expiry is out of range".into()))
}

fn parse_token_id(token_id: &str) -> Option<Uuid> {
    Uuid::parse_str(token_id.trim()).ok()
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        revocations: Arc<RevocationStore>,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            hasher,
            issuer,
            revocations,
            refresh_ttl,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn revocations(&self) -> &RevocationStore {
        &self.revocations
    }

    /// Checks an email/password pair. Unknown email and wrong password both
    /// yield [`AuthError::InvalidCredentials`] after the same bcrypt work.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let user = self.users.get_by_email(email).await?;
        let hasher = self.hasher.clone();
        let password = password.to_owned();

        let Some(user) = user else {
            blocking(move || hasher.verify_decoy(&password)).await?;
            log::warn!("failed login: invalid credentials");
            return Err(AuthError::InvalidCredentials);
        };

        let hash = user.password_hash.clone();
        if blocking(move || hasher.verify(&hash, &password)).await? {
            Ok(user)
        } else {
            log::warn!("failed login: invalid credentials");
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Creates an account and returns the stored record.
    pub async fn register(
        &self,
        name: String,
        email: String,
        password: String,
    ) -> Result<User, AuthError> {
        if self.users.get_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let hasher = self.hasher.clone();
        let password_hash = blocking(move || hasher.hash(&password)).await??;

        // The store's unique constraint decides races between concurrent registrations.
        let user = self
            .users
            .create(NewUser::new(name, email, password_hash))
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::EmailAlreadyExists,
                other => AuthError::Store(other),
            })?;

        log::info!("registered user {}", user.id);
        Ok(user)
    }

    /// Persists a fresh refresh token for `user_id`.
    pub async fn create_refresh_token(
        &self,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AuthError> {
        let token = RefreshToken::new(user_id, expires_at, Utc::now());
        self.refresh_tokens.create(&token).await?;
        Ok(token)
    }

    /// Looks up a refresh token, treating absent and expired alike.
    pub async fn redeem_refresh_token(
        &self,
        token_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshToken, AuthError> {
        let id = parse_token_id(token_id).ok_or(AuthError::InvalidRefreshToken)?;
        self.refresh_tokens
            .get_by_id(id, now)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)
    }

    /// Removes a refresh token. Absent or unparsable ids are not an error.
    pub async fn delete_refresh_token(&self, token_id: &str) -> Result<(), AuthError> {
        if let Some(id) = parse_token_id(token_id) {
            self.refresh_tokens.delete(id).await?;
        }
        Ok(())
    }

    /// Consumes `token_id` and returns its replacement in one store operation.
    pub async fn rotate_refresh_token(
        &self,
        token_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RefreshToken, AuthError> {
        let id = parse_token_id(token_id).ok_or(AuthError::InvalidRefreshToken)?;
        self.refresh_tokens
            .rotate(id, now, Uuid::new_v4(), refresh_expiry(now, self.refresh_ttl)?)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)
    }

    /// Mints an access token and a new refresh token for a freshly authenticated user.
    pub async fn issue_session(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<TokenPair, AuthError> {
        let access_token = self.issuer.issue(user_id, now)?;
        let refresh = RefreshToken::new(user_id, refresh_expiry(now, self.refresh_ttl)?, now);
        self.refresh_tokens.create(&refresh).await?;

        let purged = self.refresh_tokens.purge_expired(user_id, now).await?;
        if purged > 0 {
            log::debug!("purged {} expired refresh tokens of user {}", purged, user_id);
        }

        Ok(TokenPair {
            access_token,
            refresh_token: refresh.token.to_string(),
        })
    }

    /// Redeems a refresh token for a new token pair.
    pub async fn refresh(&self, token_id: &str, now: DateTime<Utc>) -> Result<TokenPair, AuthError> {
        let rotated = match self.rotate_refresh_token(token_id, now).await {
            Ok(token) => token,
            Err(e) => {
                log::warn!("refresh rejected: {}", e);
                return Err(e);
            }
        };
        let access_token = self.issuer.issue(rotated.user_id, now)?;

        log::info!("refreshed session for user {}", rotated.user_id);
        Ok(TokenPair {
            access_token,
            refresh_token: rotated.token.to_string(),
        })
    }

    /// Validates a bearer token against the revocation list and the issuer.
    pub fn authenticate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        if self.revocations.is_revoked_at(token, now) {
            return Err(AuthError::Unauthorized("Token revoked".into()));
        }
        Ok(self.issuer.validate(token, now)?)
    }

    /// Revokes `access_token` until its expiry. A supplied refresh token is
    /// deleted too when it belongs to the same user.
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Claims, AuthError> {
        let claims = self.issuer.validate(access_token, now)?;
        let expires_at = claims
            .expires_at()
            .ok_or_else(|| AuthError::Internal("access token expiry is out of range".into()))?;
        self.revocations.revoke_at(access_token, expires_at, now);

        if let Some(id) = refresh_token.and_then(parse_token_id) {
            match self.refresh_tokens.get_by_id(id, now).await? {
                Some(token) if token.user_id == claims.user_id => {
                    self.refresh_tokens.delete(id).await?;
                }
                Some(_) => log::warn!(
                    "user {} tried to delete a refresh token it does not own",
                    claims.user_id
                ),
                None => {}
            }
        }

        log::info!("logged out user {}", claims.user_id);
        Ok(claims)
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("User not found".into()))
    }
}
