//! Key-value stores that hold the snapshot.
//!
//! Values are JSON text. The HTTP store speaks the Replit Database protocol:
//! `POST <url>` with a `key=value` form body to set, `GET <url>/<key>` to read,
//! 404 meaning the key is absent.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::SnapshotConfig;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors never carry the store URL: a hosted key-value URL embeds its
/// access token.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("request failed: {0}")]
    Http(reqwest::Error),

    #[error("store answered {status} for key {key}")]
    Status { key: String, status: u16 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable")]
    Unavailable,
}

impl From<reqwest::Error> for KvError {
    fn from(e: reqwest::Error) -> Self {
        KvError::Http(e.without_url())
    }
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Short label for logs and health output.
    fn kind(&self) -> &'static str;

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
}

/// Pick the store from configuration. The HTTP endpoint wins over the
/// directory; with neither set there is no store.
pub async fn store_from_config(
    config: &SnapshotConfig,
) -> Result<Option<Arc<dyn SnapshotStore>>, KvError> {
    if let Some(url) = &config.kv_url {
        tracing::info!("Snapshot store: HTTP key-value endpoint");
        return Ok(Some(Arc::new(HttpKvStore::new(url)?)));
    }
    if let Some(dir) = &config.dir {
        tracing::info!(dir = %dir.display(), "Snapshot store: local directory");
        return Ok(Some(Arc::new(FileKvStore::open(dir.clone()).await?)));
    }
    Ok(None)
}

// ============================================================================
// HTTP
// ============================================================================

pub struct HttpKvStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpKvStore {
    pub fn new(base_url: &str) -> Result<Self, KvError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SnapshotStore for HttpKvStore {
    fn kind(&self) -> &'static str {
        "http"
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let res = self
            .client
            .post(&self.base_url)
            .form(&[(key, value)])
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(KvError::Status {
                key: key.to_string(),
                status: res.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let res = self
            .client
            .get(format!("{}/{}", self.base_url, key))
            .send()
            .await?;
        match res.status() {
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(res.text().await?)),
            status => Err(KvError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            }),
        }
    }
}

// ============================================================================
// Directory
// ============================================================================

/// One `<key>.json` file per key. Writes go through a temp file and a rename
/// so a crash never leaves a half-written value behind.
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    pub async fn open(dir: PathBuf) -> Result<Self, KvError> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl SnapshotStore for FileKvStore {
    fn kind(&self) -> &'static str {
        "file"
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Memory
// ============================================================================

/// Process-local store. Can be switched to fail every call.
#[derive(Default)]
pub struct MemoryKvStore {
    values: RwLock<HashMap<String, String>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Successful `set` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), KvError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemoryKvStore {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.check()?;
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        self.check()?;
        Ok(self.values.read().await.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_store_set_get_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().join("snapshots")).await.unwrap();

        assert_eq!(store.get("backup_timestamp").await.unwrap(), None);
        store.set("backup_timestamp", "\"a\"").await.unwrap();
        store.set("backup_timestamp", "\"b\"").await.unwrap();
        assert_eq!(
            store.get("backup_timestamp").await.unwrap().as_deref(),
            Some("\"b\"")
        );
        assert!(!dir
            .path()
            .join("snapshots/.backup_timestamp.json.tmp")
            .exists());
    }

    #[tokio::test]
    async fn test_memory_store_unavailable_toggle() {
        let store = MemoryKvStore::new();
        store.set("k", "v").await.unwrap();
        store.set_unavailable(true);
        assert!(matches!(store.get("k").await, Err(KvError::Unavailable)));
        assert!(store.set("k", "w").await.is_err());
        store.set_unavailable(false);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_http_store_errors() {
        let store = HttpKvStore::new("http://127.0.0.1:1").unwrap();
        assert!(matches!(store.set("k", "v").await, Err(KvError::Http(_))));
        assert!(store.get("k").await.is_err());
    }

    #[tokio::test]
    async fn test_http_errors_do_not_echo_the_store_url() {
        let store = HttpKvStore::new("http://127.0.0.1:1/v0/SECRETTOKEN123").unwrap();
        let set_err = store.set("k", "v").await.unwrap_err().to_string();
        let get_err = store.get("k").await.unwrap_err().to_string();
        for message in [set_err, get_err] {
            assert!(!message.contains("SECRETTOKEN123"), "{message}");
            assert!(!message.contains("127.0.0.1"), "{message}");
        }
    }

    #[tokio::test]
    async fn test_store_from_config_prefers_http() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = SnapshotConfig {
            kv_url: None,
            dir: None,
            interval: Duration::from_secs(60),
        };
        assert!(store_from_config(&config).await.unwrap().is_none());

        config.dir = Some(dir.path().to_path_buf());
        let store = store_from_config(&config).await.unwrap().unwrap();
        assert_eq!(store.kind(), "file");

        config.kv_url = Some("http://127.0.0.1:1/".to_string());
        let store = store_from_config(&config).await.unwrap().unwrap();
        assert_eq!(store.kind(), "http");
    }
}
