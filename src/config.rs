//! Application configuration, read once from the environment at startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::db::DbConfig;

/// Default administrator password used when nothing is configured.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingInProduction(&'static str),

    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Read an environment variable and parse it, falling back to `default`
/// when it is unset or unparseable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

/// Auto-backup period; zero or an overflowing minute count is rejected.
fn backup_interval(minutes: u64) -> Result<Duration, ConfigError> {
    minutes
        .checked_mul(60)
        .filter(|_| minutes > 0)
        .map(Duration::from_secs)
        .ok_or(ConfigError::Invalid {
            key: "BACKUP_INTERVAL_MINS",
            value: minutes.to_string(),
        })
}

/// How the single administrator account is seeded on first boot.
#[derive(Clone)]
pub struct AdminConfig {
    pub username: String,
    pub password: Option<String>,
    pub password_hash: Option<String>,
}

impl AdminConfig {
    pub fn uses_default_password(&self) -> bool {
        self.password_hash.is_none() && self.password.is_none()
    }
}

// Hand-written so the password never ends up in a Debug log line.
impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_hash", &self.password_hash.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub admin: AdminConfig,
    pub bcrypt_cost: u32,
    pub session_ttl: chrono::Duration,
    pub cookie_secure: bool,
    pub login_max_failures: u32,
    pub login_window: Duration,
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Replit-DB-style HTTP key-value endpoint.
    pub kv_url: Option<String>,
    /// Directory for the file-backed key-value store.
    pub dir: Option<PathBuf>,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// `None` runs the server on in-memory repositories.
    pub database: Option<DbConfig>,
    pub auth: AuthConfig,
    pub snapshot: SnapshotConfig,
    pub upload_dir: PathBuf,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let is_production = environment == "production";

        let bcrypt_cost = env_or("BCRYPT_COST", bcrypt::DEFAULT_COST);
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        let allowed_origins = env_opt("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .or_else(|| env_opt("FRONTEND_ORIGIN").map(|o| vec![o]))
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:5173".to_string(),
                    "http://127.0.0.1:5173".to_string(),
                ]
            });

        let config = Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 5000),
            database: env_opt("DATABASE_URL").map(|_| DbConfig::default()),
            auth: AuthConfig {
                admin: AdminConfig {
                    username: env_opt("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
                    password: env_opt("ADMIN_PASSWORD"),
                    password_hash: env_opt("ADMIN_PASSWORD_HASH"),
                },
                bcrypt_cost,
                session_ttl: chrono::Duration::hours(env_or("SESSION_TTL_HOURS", 24 * 7)),
                cookie_secure: is_production,
                login_max_failures: env_or("LOGIN_MAX_FAILURES", 10),
                login_window: Duration::from_secs(env_or("LOGIN_WINDOW_SECS", 900)),
            },
            snapshot: SnapshotConfig {
                kv_url: env_opt("SNAPSHOT_KV_URL").or_else(|| env_opt("REPLIT_DB_URL")),
                dir: env_opt("SNAPSHOT_DIR").map(PathBuf::from),
                interval: backup_interval(env_or("BACKUP_INTERVAL_MINS", 30u64))?,
            },
            upload_dir: PathBuf::from(
                std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            ),
            allowed_origins,
            environment,
        };

        config.check_production()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Refuse to boot a production server with development shortcuts.
    fn check_production(&self) -> Result<(), ConfigError> {
        if !self.is_production() {
            return Ok(());
        }
        if self.database.is_none() {
            return Err(ConfigError::MissingInProduction("DATABASE_URL"));
        }
        if self.auth.admin.uses_default_password() {
            return Err(ConfigError::MissingInProduction(
                "ADMIN_PASSWORD or ADMIN_PASSWORD_HASH",
            ));
        }
        Ok(())
    }

    /// Configuration for tests: in-memory storage, cheap bcrypt, no side store.
    pub fn for_tests() -> Self {
        Self {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            database: None,
            auth: AuthConfig {
                admin: AdminConfig {
                    username: "admin".to_string(),
                    password: Some("correct horse".to_string()),
                    password_hash: None,
                },
                bcrypt_cost: 4,
                session_ttl: chrono::Duration::hours(24 * 7),
                cookie_secure: false,
                login_max_failures: 10,
                login_window: Duration::from_secs(900),
            },
            snapshot: SnapshotConfig {
                kv_url: None,
                dir: None,
                interval: Duration::from_secs(30 * 60),
            },
            upload_dir: std::env::temp_dir().join("portfolio-showcase-test-uploads"),
            allowed_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_requires_database_and_password() {
        let mut config = AppConfig::for_tests();
        config.environment = "production".to_string();
        assert!(matches!(
            config.check_production(),
            Err(ConfigError::MissingInProduction("DATABASE_URL"))
        ));

        config.database = Some(DbConfig::default());
        config.auth.admin.password = None;
        assert!(config.check_production().is_err());

        config.auth.admin.password_hash = Some("$2b$12$abc".to_string());
        assert!(config.check_production().is_ok());
    }

    #[test]
    fn test_backup_interval_rejects_zero_and_overflow() {
        assert_eq!(backup_interval(30).unwrap(), Duration::from_secs(1800));
        assert!(matches!(
            backup_interval(0),
            Err(ConfigError::Invalid {
                key: "BACKUP_INTERVAL_MINS",
                ..
            })
        ));
        assert!(backup_interval(u64::MAX).is_err());
    }

    #[test]
    fn test_admin_debug_redacts_password() {
        let config = AppConfig::for_tests();
        let printed = format!("{:?}", config.auth.admin);
        assert!(!printed.contains("correct horse"));
        assert!(printed.contains("<redacted>"));
    }
}
