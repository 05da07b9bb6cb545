//! In-memory list of access tokens invalidated before their natural expiry.
//!
//! One instance is built at startup and shared through the auth service. An
//! entry only has to live until the token's own `exp`: after that the issuer
//! rejects the token anyway. Expired entries are dropped when they are looked
//! up. A full sweep runs only when the map has doubled since the last one, so
//! `revoke` stays amortised O(1) under the write lock.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Size at which the first sweep runs.
const MIN_SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug)]
struct Entries {
    tokens: HashMap<String, DateTime<Utc>>,
    sweep_at: usize,
    min_sweep_at: usize,
}

#[derive(Debug)]
pub struct RevocationStore {
    entries: RwLock<Entries>,
}

impl Default for RevocationStore {
    fn default() -> Self {
        Self::with_sweep_threshold(MIN_SWEEP_THRESHOLD)
    }
}

impl RevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose first sweep runs once `threshold` entries are held.
    pub fn with_sweep_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            entries: RwLock::new(Entries {
                tokens: HashMap::new(),
                sweep_at: threshold,
                min_sweep_at: threshold,
            }),
        }
    }

    /// Marks `token` revoked until `expires_at`.
    pub fn revoke(&self, token: &str, expires_at: DateTime<Utc>) {
        self.revoke_at(token, expires_at, Utc::now());
    }

    pub fn revoke_at(&self, token: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) {
        if expires_at <= now {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.tokens.insert(token.to_string(), expires_at);

        if entries.tokens.len() >= entries.sweep_at {
            entries.tokens.retain(|_, exp| *exp > now);
            let next = (entries.tokens.len() * 2).max(entries.min_sweep_at);
            entries.sweep_at = next;
        }
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.is_revoked_at(token, Utc::now())
    }

    /// True iff an unexpired entry exists for exactly `token`. An expired
    /// entry found here is removed and reported as not revoked.
    pub fn is_revoked_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.tokens.get(token) {
                None => return false,
                Some(exp) if *exp > now => return true,
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        // Re-check: another thread may have re-revoked or removed it in between.
        match entries.tokens.get(token) {
            Some(exp) if *exp > now => true,
            Some(_) => {
                entries.tokens.remove(token);
                false
            }
            None => false,
        }
    }

    /// Number of entries currently held, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tokens
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_revoked_until_expiry_then_reclaimed() {
        let store = RevocationStore::new();
        let now = Utc::now();
        let exp = now + Duration::minutes(10);
        store.revoke_at("token-a", exp, now);

        assert!(store.is_revoked_at("token-a", now));
        assert!(store.is_revoked_at("token-a", exp - Duration::seconds(1)));
        assert_eq!(store.len(), 1);

        assert!(!store.is_revoked_at("token-a", exp));
        assert!(store.is_empty());
    }

    #[test]
    fn test_only_exact_token_is_revoked() {
        let store = RevocationStore::new();
        store.revoke("token-a", Utc::now() + Duration::minutes(10));

        assert!(store.is_revoked("token-a"));
        assert!(!store.is_revoked("token-a "));
        assert!(!store.is_revoked("token-b"));
    }

    #[test]
    fn test_revoke_sweeps_only_when_threshold_is_reached() {
        let store = RevocationStore::with_sweep_threshold(4);
        let now = Utc::now();
        let later = now + Duration::seconds(6);
        store.revoke_at("old-1", now + Duration::seconds(5), now);
        store.revoke_at("old-2", now + Duration::seconds(5), now);

        // Below the threshold expired entries linger until looked up.
        store.revoke_at("new-1", now + Duration::minutes(10), later);
        assert_eq!(store.len(), 3);

        // Reaching it sweeps them and doubles the next threshold (min 4).
        store.revoke_at("new-2", now + Duration::minutes(10), later);
        assert_eq!(store.len(), 2);
        assert!(store.is_revoked_at("new-1", later));
        assert!(store.is_revoked_at("new-2", later));

        store.revoke_at("new-3", now + Duration::minutes(10), later);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_already_expired_token_is_not_stored() {
        let store = RevocationStore::new();
        let now = Utc::now();
        store.revoke_at("stale", now - Duration::seconds(1), now);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_revocations_are_all_recorded() {
        let store = Arc::new(RevocationStore::new());
        let exp = Utc::now() + Duration::minutes(10);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        let token = format!("token-{}-{}", worker, i);
                        store.revoke(&token, exp);
                        assert!(store.is_revoked(&token));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 800);
    }
}
