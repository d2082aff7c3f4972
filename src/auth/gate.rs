//! Session issuance and validation for the administrator account.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::distr::{Alphanumeric, SampleString};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::password::{PasswordError, PasswordHasher};
use crate::config::{AdminConfig, DEFAULT_ADMIN_PASSWORD};
use crate::db::models::SessionRecord;
use crate::repository::{CredentialStore, RepoError, SessionStore};

const TOKEN_LENGTH: usize = 64;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username and wrong password both map here.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("authentication required")]
    Unauthenticated,

    #[error("credential storage error: {0}")]
    Storage(#[from] RepoError),

    #[error("password hashing error: {0}")]
    Hashing(#[from] PasswordError),
}

/// A freshly issued session. `token` is the only copy of the secret.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Who a valid session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    pub username: String,
}

fn generate_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), TOKEN_LENGTH)
}

/// SHA-256 of the token, hex encoded. Only this is persisted.
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Clone)]
pub struct SessionGate {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: PasswordHasher,
    ttl: Duration,
}

impl SessionGate {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        hasher: PasswordHasher,
        ttl: Duration,
    ) -> Self {
        Self {
            credentials,
            sessions,
            hasher,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Create the administrator from configuration if none exists yet.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> Result<bool, AuthError> {
        if self.credentials.admin_count().await? > 0 {
            tracing::debug!("Administrator account already present");
            if let Some(existing) = self.credentials.find_admin(&admin.username).await? {
                self.hasher.match_dummy_cost(&existing.password_hash).await?;
            }
            return Ok(false);
        }

        let password_hash = match (&admin.password_hash, &admin.password) {
            (Some(hash), _) => hash.clone(),
            (None, Some(password)) => self.hasher.hash(password).await?,
            (None, None) => {
                tracing::warn!(
                    username = %admin.username,
                    "SECURITY: no ADMIN_PASSWORD or ADMIN_PASSWORD_HASH set; \
                     seeding the administrator with the insecure default password"
                );
                self.hasher.hash(DEFAULT_ADMIN_PASSWORD).await?
            }
        };

        self.hasher.match_dummy_cost(&password_hash).await?;
        self.credentials
            .insert_admin(&admin.username, &password_hash)
            .await?;
        tracing::info!(username = %admin.username, "Administrator account created");
        Ok(true)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let admin = self.credentials.find_admin(username).await?;

        let verified = match &admin {
            Some(admin) => self.hasher.verify(password, &admin.password_hash).await?,
            None => {
                self.hasher.verify_dummy(password).await?;
                false
            }
        };

        let admin = match admin {
            Some(admin) if verified => admin,
            _ => {
                tracing::warn!(username = %username, "Failed login attempt");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if let Err(e) = self.prune_expired().await {
            tracing::warn!("Failed to prune expired sessions: {}", e);
        }

        let token = generate_token();
        let created_at = Utc::now();
        let expires_at = created_at + self.ttl;

        self.sessions
            .insert_session(SessionRecord {
                token_hash: hash_token(&token),
                username: admin.username.clone(),
                created_at,
                expires_at,
            })
            .await?;

        tracing::info!(username = %admin.username, "Administrator logged in");

        Ok(Session {
            token,
            username: admin.username,
            created_at,
            expires_at,
        })
    }

    /// Resolve a token to its administrator. Never extends the session.
    pub async fn validate(&self, token: &str) -> Result<AdminIdentity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Unauthenticated);
        }

        let record = self
            .sessions
            .find_session(&hash_token(token))
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if Utc::now() >= record.expires_at {
            return Err(AuthError::Unauthenticated);
        }

        match self.credentials.find_admin(&record.username).await? {
            Some(admin) => Ok(AdminIdentity {
                username: admin.username,
            }),
            None => Err(AuthError::Unauthenticated),
        }
    }

    /// Idempotent; unknown tokens are fine.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Ok(());
        }
        if self.sessions.delete_session(&hash_token(token)).await? {
            tracing::info!("Session ended");
        }
        Ok(())
    }

    pub async fn prune_expired(&self) -> Result<u64, AuthError> {
        let removed = self.sessions.delete_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::debug!(removed, "Pruned expired sessions");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::{MemoryCredentialStore, MemorySessionStore};

    fn admin_config() -> AdminConfig {
        AdminConfig {
            username: "admin".to_string(),
            password: Some("correct horse".to_string()),
            password_hash: None,
        }
    }

    async fn gate_with_ttl(ttl: Duration) -> (SessionGate, Arc<MemorySessionStore>) {
        let sessions = Arc::new(MemorySessionStore::new());
        let gate = SessionGate::new(
            Arc::new(MemoryCredentialStore::new()),
            sessions.clone(),
            PasswordHasher::new(4).unwrap(),
            ttl,
        );
        gate.ensure_admin(&admin_config()).await.unwrap();
        (gate, sessions)
    }

    #[tokio::test]
    async fn test_login_then_validate() {
        let (gate, _) = gate_with_ttl(Duration::days(7)).await;
        let session = gate.login("admin", "correct horse").await.unwrap();
        assert_eq!(session.token.len(), TOKEN_LENGTH);
        assert_eq!(session.expires_at - session.created_at, Duration::days(7));

        let identity = gate.validate(&session.token).await.unwrap();
        assert_eq!(identity.username, "admin");
    }

    #[tokio::test]
    async fn test_failures_are_indistinguishable() {
        let (gate, _) = gate_with_ttl(Duration::days(7)).await;
        let wrong_password = gate.login("admin", "wrong").await.unwrap_err();
        let unknown_user = gate.login("nobody", "correct horse").await.unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_username_is_case_sensitive() {
        let (gate, _) = gate_with_ttl(Duration::days(7)).await;
        assert!(matches!(
            gate.login("Admin", "correct horse").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_pruned() {
        let (gate, sessions) = gate_with_ttl(Duration::zero()).await;
        let session = gate.login("admin", "correct horse").await.unwrap();
        assert!(matches!(
            gate.validate(&session.token).await,
            Err(AuthError::Unauthenticated)
        ));
        assert_eq!(gate.prune_expired().await.unwrap(), 1);
        assert!(sessions
            .find_session(&hash_token(&session.token))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (gate, _) = gate_with_ttl(Duration::days(7)).await;
        let session = gate.login("admin", "correct horse").await.unwrap();
        gate.logout(&session.token).await.unwrap();
        gate.logout(&session.token).await.unwrap();
        gate.logout("never-issued").await.unwrap();
        assert!(matches!(
            gate.validate(&session.token).await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_validate_rejects_empty_and_unknown_tokens() {
        let (gate, _) = gate_with_ttl(Duration::days(7)).await;
        assert!(matches!(gate.validate("").await, Err(AuthError::Unauthenticated)));
        assert!(matches!(
            gate.validate("abc").await,
            Err(AuthError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_token_is_stored_hashed() {
        let (gate, sessions) = gate_with_ttl(Duration::days(7)).await;
        let session = gate.login("admin", "correct horse").await.unwrap();
        assert!(sessions.find_session(&session.token).await.unwrap().is_none());
        assert!(sessions
            .find_session(&hash_token(&session.token))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_ensure_admin_runs_once() {
        let (gate, _) = gate_with_ttl(Duration::days(7)).await;
        let other = AdminConfig {
            username: "someone-else".to_string(),
            password: Some("pw".to_string()),
            password_hash: None,
        };
        assert!(!gate.ensure_admin(&other).await.unwrap());
        assert!(gate.login("someone-else", "pw").await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_admin_accepts_precomputed_hash() {
        let gate = SessionGate::new(
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemorySessionStore::new()),
            PasswordHasher::new(4).unwrap(),
            Duration::days(7),
        );
        let hash = bcrypt::hash("from-env", 4).unwrap();
        let config = AdminConfig {
            username: "owner".to_string(),
            password: None,
            password_hash: Some(hash),
        };
        assert!(gate.ensure_admin(&config).await.unwrap());
        assert!(gate.login("owner", "from-env").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_user_check_matches_configured_hash_cost() {
        let gate = SessionGate::new(
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemorySessionStore::new()),
            PasswordHasher::new(4).unwrap(),
            Duration::days(7),
        );
        let config = AdminConfig {
            username: "owner".to_string(),
            password: None,
            password_hash: Some(bcrypt::hash("from-env", 6).unwrap()),
        };
        gate.ensure_admin(&config).await.unwrap();
        assert_eq!(gate.hasher.dummy_cost().await, Some(6));
        assert!(matches!(
            gate.login("nobody", "from-env").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
