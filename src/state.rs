//! Composition root: builds every service once and hands them to the router.

use std::sync::Arc;

use thiserror::Error;

use crate::auth::{AuthError, LoginThrottle, PasswordError, PasswordHasher, SessionGate};
use crate::config::{AppConfig, ConfigError};
use crate::db::{self, PgContentRepository, PgCredentialStore, PgSessionStore};
use crate::repository::memory::{
    MemoryContentRepository, MemoryCredentialStore, MemorySessionStore,
};
use crate::repository::{ContentRepository, CredentialStore, SessionStore};
use crate::snapshot::{store_from_config, KvError, SnapshotService, SnapshotStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("administrator setup: {0}")]
    Auth(#[from] AuthError),

    #[error("password hasher: {0}")]
    Password(#[from] PasswordError),

    #[error("snapshot store: {0}")]
    Snapshot(#[from] KvError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// The three storage ports, backed either by PostgreSQL or by memory.
#[derive(Clone)]
pub struct Storage {
    pub content: Arc<dyn ContentRepository>,
    pub credentials: Arc<dyn CredentialStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Storage {
    pub async fn connect(config: &AppConfig) -> Result<Self, StartupError> {
        match &config.database {
            Some(db_config) => {
                let pool = db::init_pool(db_config).await?;
                db::run_migrations(&pool).await?;
                Ok(Self {
                    content: Arc::new(PgContentRepository::new(pool.clone())),
                    credentials: Arc::new(PgCredentialStore::new(pool.clone())),
                    sessions: Arc::new(PgSessionStore::new(pool)),
                })
            }
            None => {
                tracing::warn!(
                    "DATABASE_URL not set. Content and sessions are kept in memory \
                     and will be lost on restart."
                );
                Ok(Self::in_memory())
            }
        }
    }

    /// Like [`Storage::connect`] but never falls back to memory. Tools that
    /// move data between the database and the snapshot store use this.
    pub async fn connect_database(config: &AppConfig) -> Result<Self, StartupError> {
        if config.database.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL").into());
        }
        Self::connect(config).await
    }

    pub fn in_memory() -> Self {
        Self {
            content: Arc::new(MemoryContentRepository::new()),
            credentials: Arc::new(MemoryCredentialStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }
}

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub content: Arc<dyn ContentRepository>,
    pub gate: SessionGate,
    pub throttle: LoginThrottle,
    pub snapshots: SnapshotService,
}

impl AppState {
    /// Connect storage and the snapshot store described by `config`.
    pub async fn build(config: AppConfig) -> Result<Self, StartupError> {
        let storage = Storage::connect(&config).await?;
        let store = store_from_config(&config.snapshot).await?;
        if store.is_none() {
            tracing::info!("No snapshot store configured; backups are disabled");
        }
        Self::assemble(config, storage, store).await
    }

    /// Wire services over already-built storage and seed the administrator.
    pub async fn assemble(
        config: AppConfig,
        storage: Storage,
        store: Option<Arc<dyn SnapshotStore>>,
    ) -> Result<Self, StartupError> {
        tokio::fs::create_dir_all(&config.upload_dir).await?;

        let hasher = PasswordHasher::new(config.auth.bcrypt_cost)?;
        let gate = SessionGate::new(
            storage.credentials,
            storage.sessions,
            hasher,
            config.auth.session_ttl,
        );
        gate.ensure_admin(&config.auth.admin).await?;

        let throttle =
            LoginThrottle::new(config.auth.login_max_failures, config.auth.login_window);
        let snapshots = SnapshotService::new(storage.content.clone(), store);

        Ok(Self {
            config: Arc::new(config),
            content: storage.content,
            gate,
            throttle,
            snapshots,
        })
    }
}
