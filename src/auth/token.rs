use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

/// Default lifetime of an access token.
pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 60;

/// Represents the claims encoded within an access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the user id as a string.
    pub sub: String,
    pub user_id: Uuid,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Random token id so tokens minted in the same second differ.
    pub jti: Uuid,
}

impl Claims {
    /// `None` when `iat` lies outside chrono's representable range.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    /// `None` when `exp` lies outside chrono's representable range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// Why an access token could not be issued or was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token signature")]
    InvalidSignature,
    /// The header names an algorithm other than the configured one.
    #[error("unsupported signing algorithm")]
    UnsupportedAlgorithm,
    #[error("token expired")]
    Expired,
    /// Not a decodable JWT, or required claims are missing.
    #[error("malformed token")]
    Malformed,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

/// Signs and validates access tokens with a fixed algorithm and HMAC secret.
///
/// Stateless: validating a token needs only the token, the key, and the clock.
#[derive(Clone)]
pub struct TokenIssuer {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .finish_non_exhaustive()
    }
}

/// Parses an algorithm name, accepting only the HMAC family since keys are shared secrets.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, TokenError> {
    match Algorithm::from_str(name) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(TokenError::UnsupportedAlgorithm),
    }
}

impl TokenIssuer {
    pub fn new(secret: &[u8], algorithm: Algorithm, access_ttl: Duration) -> Self {
        let mut validation = Validation::new(algorithm);
        // Expiry is checked against the caller's clock in `validate`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::from(["exp".to_string(), "sub".to_string()]);

        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    /// Issues a token for `user_id` valid from `now` until `now + access_ttl`.
    pub fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, TokenError> {
        let exp = now
            .checked_add_signed(self.access_ttl)
            .ok_or_else(|| TokenError::Signing("token expiry is out of range".into()))?;
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verifies algorithm and signature, then requires `now < exp`.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
                    TokenError::UnsupportedAlgorithm
                }
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            })?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
