pub mod error;
pub mod extractors;
pub mod middleware;
pub mod password;
pub mod revocation;
pub mod service;
pub mod token;

use serde::Deserialize;
use validator::Validate;

pub use error::AuthError;
pub use extractors::AuthenticatedUser;
pub use middleware::{bearer_token, AuthMiddleware};
pub use password::PasswordHasher;
pub use revocation::RevocationStore;
pub use service::AuthService;
pub use token::{Claims, TokenError, TokenIssuer};

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    /// Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// User's password. Must not be empty; strength rules apply only at registration.
    #[validate(length(min = 1))]
    pub password: String,
}
