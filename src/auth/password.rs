use bcrypt::{hash, verify};
use std::sync::Arc;

use super::AuthError;

/// Plaintext hashed once at construction so logins for unknown emails still
/// pay for a full bcrypt verification.
const DECOY_PASSWORD: &str = "decoy-password-never-matches";

/// bcrypt only reads the first 72 bytes of its input. Longer passwords are
/// refused instead of being silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// bcrypt-based one-way hashing for stored credentials.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
    decoy_hash: Arc<str>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        let decoy_hash = hash(DECOY_PASSWORD, cost)
            .map_err(|e| AuthError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(Self {
            cost,
            decoy_hash: decoy_hash.into(),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Produces a salted hash of `plaintext`.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::PasswordTooLong);
        }
        hash(plaintext, self.cost)
            .map_err(|e| AuthError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// True iff `plaintext` matches `hashed`. A malformed hash counts as a mismatch.
    pub fn verify(&self, hashed: &str, plaintext: &str) -> bool {
        // Nothing longer was ever hashed, so a longer input cannot match.
        if plaintext.len() > MAX_PASSWORD_BYTES {
            let _ = verify(DECOY_PASSWORD, &self.decoy_hash);
            return false;
        }
        match verify(plaintext, hashed) {
            Ok(matches) => matches,
            Err(e) => {
                log::warn!("password hash could not be verified: {}", e);
                false
            }
        }
    }

    /// Runs a verification that always fails, at the same cost as a real one.
    pub fn verify_decoy(&self, plaintext: &str) -> bool {
        let _ = verify(plaintext, &self.decoy_hash);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4).unwrap()
    }

    #[test]
    fn test_password_hashing_and_verification() {
        let hasher = hasher();
        let password = "test_password123";
        let hashed = hasher.hash(password).unwrap();

        assert_ne!(hashed, password);
        assert!(hasher.verify(&hashed, password));
        assert!(!hasher.verify(&hashed, "wrong_password"));
        assert!(!hasher.verify(&hashed, ""));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = hasher();
        let a = hasher.hash("same-password").unwrap();
        let b = hasher.hash("same-password").unwrap();
        assert_ne!(a, b);
        assert!(hasher.verify(&a, "same-password"));
        assert!(hasher.verify(&b, "same-password"));
    }

    #[test]
    fn test_verify_with_invalid_hash() {
        assert!(!hasher().verify("invalidhashformat", "test_password123"));
    }

    #[test]
    fn test_decoy_never_matches() {
        let hasher = hasher();
        assert!(!hasher.verify_decoy(DECOY_PASSWORD));
        assert!(!hasher.verify_decoy("anything"));
    }

    #[test]
    fn test_passwords_sharing_a_72_byte_prefix_do_not_match() {
        let hasher = hasher();
        let prefix = "a".repeat(MAX_PASSWORD_BYTES);
        let exact = hasher.hash(&prefix).unwrap();
        assert!(hasher.verify(&exact, &prefix));
        assert!(!hasher.verify(&exact, &format!("{}totally-different", prefix)));

        assert!(matches!(
            hasher.hash(&format!("{}correct-suffix", prefix)),
            Err(AuthError::PasswordTooLong)
        ));
        // Multi-byte characters count by bytes: 25 * 3 = 75.
        assert!(matches!(
            hasher.hash(&"€".repeat(25)),
            Err(AuthError::PasswordTooLong)
        ));
    }

    #[test]
    fn test_invalid_cost_is_rejected() {
        assert!(matches!(PasswordHasher::new(2), Err(AuthError::Internal(_))));
    }
}
