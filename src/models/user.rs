use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth::password::MAX_PASSWORD_BYTES;

/// A registered account as stored in the `users` table.
///
/// Deliberately not `Serialize`: the password hash must never reach a response
/// body. Use [`UserResponse`] for anything sent to a client.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user about to be inserted. The id and timestamps are assigned up front so
/// every store produces identical records.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }

    pub fn into_user(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Payload for `POST /auth/registration`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name, 1 to 100 characters.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    /// Plaintext password. Hashed before it is stored and dropped afterwards.
    #[validate(length(min = 6, max = 128), custom = "fits_bcrypt")]
    pub password: String,
}

fn fits_bcrypt(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        let mut err = ValidationError::new("password_too_long");
        err.message = Some("must be at most 72 bytes".into());
        return Err(err);
    }
    Ok(())
}

/// Public view of a user returned by registration and `/auth/me`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_register_request_validation() {
        let input = RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(input.validate().is_ok());

        let input = RegisterRequest {
            name: "Alice".to_string(),
            email: "invalid-email".to_string(),
            password: "password123".to_string(),
        };
        assert!(input.validate().is_err());

        let input = RegisterRequest {
            name: "".to_string(),
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
        };
        assert!(input.validate().is_err());

        let input = RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(input.validate().is_err());

        // 80 characters is within the length rule but past bcrypt's 72 bytes.
        let input = RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "p".repeat(80),
        };
        assert!(input.validate().is_err());

        let input = RegisterRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "p".repeat(72),
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_user_response_hides_password_hash() {
        let user = NewUser::new(
            "Alice".to_string(),
            "alice@example.com".to_string(),
            "$2b$04$hash".to_string(),
        )
        .into_user();

        let json = serde_json::to_value(UserResponse::from(user.clone())).unwrap();
        assert_eq!(json["email"], "alice@example.com");
        assert_eq!(json["id"], user.id.to_string());
        assert!(json.get("password_hash").is_none());
        assert_eq!(user.created_at, user.updated_at);
    }
}
