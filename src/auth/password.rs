//! bcrypt password hashing, run off the async executor.

use std::sync::Arc;

use bcrypt::{hash, verify, BcryptError};
use tokio::sync::RwLock;

const DUMMY_PASSWORD: &str = "not-a-real-password";

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt: {0}")]
    Bcrypt(#[from] BcryptError),

    #[error("hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Work factor of a `$2b$<cost>$...` hash.
pub fn hash_cost(stored_hash: &str) -> Option<u32> {
    let mut parts = stored_hash.split('$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(""), Some(_variant), Some(cost)) => cost.parse().ok(),
        _ => None,
    }
}

/// Hashes and verifies passwords at a fixed work factor.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    /// Compared against when the username is unknown, so both failure paths
    /// pay for one bcrypt verification at the stored hash's cost.
    dummy_hash: Arc<RwLock<String>>,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        let dummy_hash = hash(DUMMY_PASSWORD, cost)?;
        Ok(Self {
            cost,
            dummy_hash: Arc::new(RwLock::new(dummy_hash)),
        })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = password.to_owned();
        let cost = self.cost;
        let hashed = tokio::task::spawn_blocking(move || hash(password, cost)).await??;
        Ok(hashed)
    }

    /// A malformed stored hash counts as a mismatch.
    pub async fn verify(&self, password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();
        let ok = tokio::task::spawn_blocking(move || verify(password, &stored_hash).unwrap_or(false))
            .await?;
        Ok(ok)
    }

    /// Burn one verification against the dummy hash; the result is discarded.
    pub async fn verify_dummy(&self, password: &str) -> Result<(), PasswordError> {
        let dummy = self.dummy_hash.read().await.clone();
        self.verify(password, &dummy).await.map(|_| ())
    }

    /// Rehash the dummy at the work factor of `stored_hash`, which may come
    /// from ADMIN_PASSWORD_HASH rather than this hasher.
    pub async fn match_dummy_cost(&self, stored_hash: &str) -> Result<(), PasswordError> {
        let Some(cost) = hash_cost(stored_hash) else {
            return Ok(());
        };
        if self.dummy_cost().await == Some(cost) {
            return Ok(());
        }
        let dummy = tokio::task::spawn_blocking(move || hash(DUMMY_PASSWORD, cost)).await??;
        *self.dummy_hash.write().await = dummy;
        tracing::debug!(cost, "Dummy hash aligned with stored administrator hash");
        Ok(())
    }

    pub async fn dummy_cost(&self) -> Option<u32> {
        hash_cost(&self.dummy_hash.read().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_is_self_describing_and_salted() {
        let hasher = PasswordHasher::new(4).unwrap();
        let a = hasher.hash("hunter2").await.unwrap();
        let b = hasher.hash("hunter2").await.unwrap();
        assert!(a.starts_with("$2b$04$"));
        assert_ne!(a, b);
        assert!(hasher.verify("hunter2", &a).await.unwrap());
        assert!(!hasher.verify("hunter3", &a).await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_hash_is_mismatch() {
        let hasher = PasswordHasher::new(4).unwrap();
        assert!(!hasher.verify("x", "not-a-bcrypt-hash").await.unwrap());
        hasher.verify_dummy("anything").await.unwrap();
    }

    #[test]
    fn test_hash_cost_parses_work_factor() {
        assert_eq!(hash_cost("$2b$12$abcdefghijklmnopqrstuv"), Some(12));
        assert_eq!(hash_cost("$2y$05$x"), Some(5));
        assert_eq!(hash_cost("plaintext"), None);
    }

    #[tokio::test]
    async fn test_dummy_follows_stored_hash_cost() {
        let hasher = PasswordHasher::new(4).unwrap();
        assert_eq!(hasher.dummy_cost().await, Some(4));

        let stored = bcrypt::hash("admin-pw", 5).unwrap();
        hasher.match_dummy_cost(&stored).await.unwrap();
        assert_eq!(hasher.dummy_cost().await, Some(5));

        // Clones share the dummy.
        let clone = hasher.clone();
        assert_eq!(clone.dummy_cost().await, Some(5));

        hasher.match_dummy_cost("not-a-bcrypt-hash").await.unwrap();
        assert_eq!(hasher.dummy_cost().await, Some(5));
    }
}
