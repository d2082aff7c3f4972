//! Full-table export and import of site content through a key-value store.
//!
//! A snapshot is five keys: one JSON array per content kind plus
//! `backup_timestamp`. Each backup overwrites the previous one. Restore is
//! destructive per kind: the table is cleared and the snapshot rows are
//! reinserted with fresh ids and creation times.

pub mod scheduler;
pub mod store;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::{
    Certificate, ContactMessage, NewCertificate, NewContactMessage, NewProject, NewReview,
    Project, Review,
};
use crate::repository::{ContentRepository, EntityKind, RepoError, Visibility};
use crate::validation::{self, Validated};

pub use scheduler::AutoBackup;
pub use store::{store_from_config, KvError, SnapshotStore};

pub const KEY_TIMESTAMP: &str = "backup_timestamp";

pub fn key_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Certificates => "backup_certificates",
        EntityKind::Reviews => "backup_reviews",
        EntityKind::ContactMessages => "backup_contact_messages",
        EntityKind::Projects => "backup_projects",
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("backup unavailable: {0}")]
    BackupUnavailable(String),

    #[error("restore unavailable: {0}")]
    RestoreUnavailable(String),

    #[error("no backup found")]
    NoBackupFound,

    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),
}

/// The only store failure text that leaves this module.
const STORE_UNREACHABLE: &str = "snapshot store unreachable";

/// Everything a backup wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub certificates: Vec<Certificate>,
    pub reviews: Vec<Review>,
    pub contact_messages: Vec<ContactMessage>,
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCounts {
    pub certificates: usize,
    pub reviews: usize,
    pub contact_messages: usize,
    pub projects: usize,
}

impl Snapshot {
    pub fn counts(&self) -> KindCounts {
        KindCounts {
            certificates: self.certificates.len(),
            reviews: self.reviews.len(),
            contact_messages: self.contact_messages.len(),
            projects: self.projects.len(),
        }
    }
}

/// Per kind, how many rows were reinserted; `None` means the snapshot had
/// nothing for that kind and the table was left alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub backup_timestamp: String,
    pub certificates: Option<usize>,
    pub reviews: Option<usize>,
    pub contact_messages: Option<usize>,
    pub projects: Option<usize>,
}

#[derive(Clone)]
pub struct SnapshotService {
    content: Arc<dyn ContentRepository>,
    store: Option<Arc<dyn SnapshotStore>>,
}

impl SnapshotService {
    pub fn new(content: Arc<dyn ContentRepository>, store: Option<Arc<dyn SnapshotStore>>) -> Self {
        Self { content, store }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    pub fn store_kind(&self) -> Option<&'static str> {
        self.store.as_ref().map(|s| s.kind())
    }

    pub async fn backup(&self) -> Result<Snapshot, SnapshotError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| SnapshotError::BackupUnavailable("no snapshot store configured".into()))?;

        tracing::info!("Starting content backup");

        let read_failed = |e: RepoError| {
            tracing::error!("Backup failed reading content: {}", e);
            SnapshotError::BackupUnavailable("could not read content".into())
        };
        let snapshot = Snapshot {
            timestamp: Utc::now(),
            certificates: self
                .content
                .list_certificates(Visibility::All)
                .await
                .map_err(read_failed)?,
            reviews: self
                .content
                .list_reviews(Visibility::All)
                .await
                .map_err(read_failed)?,
            contact_messages: self
                .content
                .list_contact_messages(Visibility::All)
                .await
                .map_err(read_failed)?,
            projects: self
                .content
                .list_projects(Visibility::All)
                .await
                .map_err(read_failed)?,
        };

        // Keys are written one after another; a failure part way leaves a
        // mix of old and new values, and the timestamp is only written last.
        write_rows(store.as_ref(), EntityKind::Certificates, &snapshot.certificates).await?;
        write_rows(store.as_ref(), EntityKind::Reviews, &snapshot.reviews).await?;
        write_rows(
            store.as_ref(),
            EntityKind::ContactMessages,
            &snapshot.contact_messages,
        )
        .await?;
        write_rows(store.as_ref(), EntityKind::Projects, &snapshot.projects).await?;

        let timestamp = snapshot
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let encoded = serde_json::to_string(&timestamp).map_err(encode_failed)?;
        store.set(KEY_TIMESTAMP, &encoded).await.map_err(|e| {
            tracing::error!("Backup failed writing {}: {}", KEY_TIMESTAMP, e);
            SnapshotError::BackupUnavailable(STORE_UNREACHABLE.into())
        })?;

        tracing::info!(
            timestamp = %timestamp,
            certificates = snapshot.certificates.len(),
            reviews = snapshot.reviews.len(),
            contact_messages = snapshot.contact_messages.len(),
            projects = snapshot.projects.len(),
            "Content backup completed"
        );

        Ok(snapshot)
    }

    /// Run a backup and log the outcome instead of returning it.
    pub async fn backup_and_log(&self) {
        if let Err(e) = self.backup().await {
            tracing::warn!("Scheduled backup did not complete: {}", e);
        }
    }

    /// Every kind is read and validated before any table is touched, so a
    /// corrupt snapshot changes nothing.
    pub async fn restore(&self) -> Result<RestoreReport, SnapshotError> {
        let store = self.store.as_ref().ok_or_else(|| {
            SnapshotError::RestoreUnavailable("no snapshot store configured".into())
        })?;
        let store = store.as_ref();

        let backup_timestamp = read_timestamp(store)
            .await?
            .ok_or(SnapshotError::NoBackupFound)?;

        tracing::info!(backup_timestamp = %backup_timestamp, "Starting content restore");

        let certificates = read_valid_rows(
            store,
            EntityKind::Certificates,
            validation::validate_stored_certificate,
        )
        .await?;
        let reviews =
            read_valid_rows(store, EntityKind::Reviews, validation::validate_stored_review).await?;
        let contact_messages = read_valid_rows(
            store,
            EntityKind::ContactMessages,
            validation::validate_stored_contact_message,
        )
        .await?;
        let projects =
            read_valid_rows(store, EntityKind::Projects, validation::validate_stored_project)
                .await?;

        let mut report = RestoreReport {
            backup_timestamp,
            certificates: None,
            reviews: None,
            contact_messages: None,
            projects: None,
        };

        if let Some(rows) = certificates {
            report.certificates = Some(
                self.content
                    .replace_certificates(rows)
                    .await
                    .map_err(|e| replace_failed(EntityKind::Certificates, e))?,
            );
        }
        if let Some(rows) = reviews {
            report.reviews = Some(
                self.content
                    .replace_reviews(rows)
                    .await
                    .map_err(|e| replace_failed(EntityKind::Reviews, e))?,
            );
        }
        if let Some(rows) = contact_messages {
            report.contact_messages = Some(
                self.content
                    .replace_contact_messages(rows)
                    .await
                    .map_err(|e| replace_failed(EntityKind::ContactMessages, e))?,
            );
        }
        if let Some(rows) = projects {
            report.projects = Some(
                self.content
                    .replace_projects(rows)
                    .await
                    .map_err(|e| replace_failed(EntityKind::Projects, e))?,
            );
        }

        tracing::info!(?report, "Content restore completed");
        Ok(report)
    }

    /// Timestamp of the snapshot currently in the store, if any.
    pub async fn last_backup(&self) -> Result<Option<String>, SnapshotError> {
        match &self.store {
            Some(store) => read_timestamp(store.as_ref()).await,
            None => Err(SnapshotError::BackupUnavailable(
                "no snapshot store configured".into(),
            )),
        }
    }
}

async fn write_rows<T: Serialize>(
    store: &dyn SnapshotStore,
    kind: EntityKind,
    rows: &[T],
) -> Result<(), SnapshotError> {
    let key = key_for(kind);
    let encoded = serde_json::to_string(rows).map_err(encode_failed)?;
    store.set(key, &encoded).await.map_err(|e| {
        tracing::error!("Backup failed writing {}: {}", key, e);
        SnapshotError::BackupUnavailable(STORE_UNREACHABLE.into())
    })?;
    tracing::debug!(kind = %kind, rows = rows.len(), "Backed up");
    Ok(())
}

/// `Ok(None)` when the kind is missing from the snapshot or empty.
async fn read_rows<T: DeserializeOwned>(
    store: &dyn SnapshotStore,
    kind: EntityKind,
) -> Result<Option<Vec<T>>, SnapshotError> {
    let key = key_for(kind);
    let raw = store.get(key).await.map_err(|e| {
        tracing::error!("Restore failed reading {}: {}", key, e);
        SnapshotError::RestoreUnavailable(STORE_UNREACHABLE.into())
    })?;
    let Some(raw) = raw else {
        tracing::info!(kind = %kind, "No rows in snapshot; table left untouched");
        return Ok(None);
    };
    let rows: Vec<T> = serde_json::from_str(&raw).map_err(|e| {
        tracing::error!("Snapshot value {} is not a valid row list: {}", key, e);
        SnapshotError::Corrupt(format!("{} is not a valid row list", key))
    })?;
    if rows.is_empty() {
        tracing::info!(kind = %kind, "No rows in snapshot; table left untouched");
        return Ok(None);
    }
    Ok(Some(rows))
}

/// The timestamp is stored JSON-encoded; a bare string is accepted too.
async fn read_timestamp(store: &dyn SnapshotStore) -> Result<Option<String>, SnapshotError> {
    let raw = store.get(KEY_TIMESTAMP).await.map_err(|e| {
        tracing::error!("Failed reading {}: {}", KEY_TIMESTAMP, e);
        SnapshotError::RestoreUnavailable(STORE_UNREACHABLE.into())
    })?;
    Ok(raw
        .map(|raw| serde_json::from_str::<String>(&raw).unwrap_or(raw))
        .filter(|ts| !ts.trim().is_empty()))
}

/// `read_rows` plus a per-row check against the same rules as the create
/// endpoints. One bad row rejects the whole restore.
async fn read_valid_rows<T: DeserializeOwned>(
    store: &dyn SnapshotStore,
    kind: EntityKind,
    validate: fn(T) -> Validated<T>,
) -> Result<Option<Vec<T>>, SnapshotError> {
    let Some(rows) = read_rows::<T>(store, kind).await? else {
        return Ok(None);
    };
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            validate(row).map_err(|errors| {
                tracing::error!(kind = %kind, row = index, %errors, "Snapshot row failed validation");
                SnapshotError::Corrupt(format!("{} row {}: {}", kind, index, errors))
            })
        })
        .collect::<Result<Vec<T>, _>>()
        .map(Some)
}

fn encode_failed(e: serde_json::Error) -> SnapshotError {
    tracing::error!("Backup failed encoding snapshot: {}", e);
    SnapshotError::BackupUnavailable("could not encode snapshot".into())
}

fn replace_failed(kind: EntityKind, e: RepoError) -> SnapshotError {
    tracing::error!("Restore failed replacing {}: {}", kind, e);
    SnapshotError::RestoreUnavailable(format!("could not restore {}", kind))
}

#[cfg(test)]
mod tests {
    use super::store::{HttpKvStore, MemoryKvStore};
    use super::*;
    use crate::repository::memory::MemoryContentRepository;

    fn certificate(title: &str, visible: bool) -> NewCertificate {
        NewCertificate {
            title: title.to_string(),
            description: Some("issued".to_string()),
            issue_date: Some("2023-05".to_string()),
            image_url: None,
            is_visible: visible,
        }
    }

    fn review(name: &str, rating: i32, approved: bool) -> NewReview {
        NewReview {
            name: name.to_string(),
            email: None,
            rating,
            comment: "Great work".to_string(),
            is_approved: approved,
        }
    }

    fn project(title: &str) -> NewProject {
        NewProject {
            title: title.to_string(),
            description: "A thing I built".to_string(),
            image_url: Some("/uploads/p.png".to_string()),
            technologies: vec!["Rust".to_string(), "Postgres".to_string()],
            live_url: None,
            github_url: Some("https://github.com/me/p".to_string()),
            is_visible: true,
        }
    }

    async fn seeded_repo() -> Arc<MemoryContentRepository> {
        let repo = Arc::new(MemoryContentRepository::new());
        repo.create_certificate(certificate("AWS", true)).await.unwrap();
        repo.create_certificate(certificate("GCP", false)).await.unwrap();
        repo.create_review(review("Bob", 5, true)).await.unwrap();
        repo.create_review(review("Eve", 2, false)).await.unwrap();
        repo.create_contact_message(NewContactMessage {
            name: "Alice".to_string(),
            email: "a@x.com".to_string(),
            subject: None,
            message: "Hi".to_string(),
            is_read: true,
        })
        .await
        .unwrap();
        repo.create_project(project("Site")).await.unwrap();
        repo
    }

    async fn counts(repo: &MemoryContentRepository) -> Vec<i64> {
        let mut out = Vec::new();
        for kind in EntityKind::ALL {
            out.push(repo.count(kind).await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_restore_without_backup_touches_nothing() {
        let repo = seeded_repo().await;
        let service = SnapshotService::new(repo.clone(), Some(Arc::new(MemoryKvStore::new())));
        let before = counts(&repo).await;

        assert!(matches!(
            service.restore().await,
            Err(SnapshotError::NoBackupFound)
        ));
        assert_eq!(counts(&repo).await, before);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_content_with_fresh_ids() {
        let repo = seeded_repo().await;
        let store = Arc::new(MemoryKvStore::new());
        let service = SnapshotService::new(repo.clone(), Some(store.clone()));

        let snapshot = service.backup().await.unwrap();
        assert_eq!(
            snapshot.counts(),
            KindCounts {
                certificates: 2,
                reviews: 2,
                contact_messages: 1,
                projects: 1,
            }
        );
        assert_eq!(store.writes(), 5);

        let old_certs = repo.list_certificates(Visibility::All).await.unwrap();
        let old_reviews = repo.list_reviews(Visibility::All).await.unwrap();
        let old_messages = repo.list_contact_messages(Visibility::All).await.unwrap();
        let old_projects = repo.list_projects(Visibility::All).await.unwrap();

        // Content drifts after the backup; restore must bring it back.
        repo.create_certificate(certificate("Later", true)).await.unwrap();
        repo.delete_project(old_projects[0].id).await.unwrap();

        let report = service.restore().await.unwrap();
        assert_eq!(report.certificates, Some(2));
        assert_eq!(report.projects, Some(1));

        let new_certs = repo.list_certificates(Visibility::All).await.unwrap();
        let new_projects = repo.list_projects(Visibility::All).await.unwrap();

        let strip_certs = |rows: Vec<Certificate>| {
            let mut v: Vec<NewCertificate> = rows.into_iter().map(Into::into).collect();
            v.sort_by(|a, b| a.title.cmp(&b.title));
            v
        };
        assert_eq!(strip_certs(new_certs.clone()), strip_certs(old_certs.clone()));
        assert!(new_certs
            .iter()
            .all(|c| old_certs.iter().all(|o| o.id != c.id)));

        let strip_reviews = |rows: Vec<Review>| {
            let mut v: Vec<NewReview> = rows.into_iter().map(Into::into).collect();
            v.sort_by(|a, b| a.name.cmp(&b.name));
            v
        };
        assert_eq!(
            strip_reviews(repo.list_reviews(Visibility::All).await.unwrap()),
            strip_reviews(old_reviews)
        );

        let messages: Vec<NewContactMessage> = repo
            .list_contact_messages(Visibility::All)
            .await
            .unwrap()
            .into_iter()
            .map(Into::into)
            .collect();
        let old_messages: Vec<NewContactMessage> =
            old_messages.into_iter().map(Into::into).collect();
        assert_eq!(messages, old_messages);

        assert_eq!(new_projects.len(), 1);
        assert_eq!(
            NewProject::from(new_projects[0].clone()),
            NewProject::from(old_projects[0].clone())
        );
    }

    #[tokio::test]
    async fn test_empty_kind_leaves_table_untouched() {
        let store = Arc::new(MemoryKvStore::new());
        let empty = Arc::new(MemoryContentRepository::new());
        empty.create_certificate(certificate("Only", true)).await.unwrap();
        SnapshotService::new(empty, Some(store.clone()))
            .backup()
            .await
            .unwrap();

        // A different database receives a snapshot with no projects.
        let repo = seeded_repo().await;
        let report = SnapshotService::new(repo.clone(), Some(store))
            .restore()
            .await
            .unwrap();

        assert_eq!(report.certificates, Some(1));
        assert_eq!(report.reviews, None);
        assert_eq!(report.projects, None);
        assert_eq!(repo.count(EntityKind::Certificates).await.unwrap(), 1);
        assert_eq!(repo.count(EntityKind::Reviews).await.unwrap(), 2);
        assert_eq!(repo.count(EntityKind::Projects).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_store_reports_unavailable_and_site_keeps_serving() {
        let repo = seeded_repo().await;
        let store = HttpKvStore::new("http://127.0.0.1:1").unwrap();
        let service = SnapshotService::new(repo.clone(), Some(Arc::new(store)));

        assert!(matches!(
            service.backup().await,
            Err(SnapshotError::BackupUnavailable(_))
        ));
        assert!(matches!(
            service.restore().await,
            Err(SnapshotError::RestoreUnavailable(_))
        ));

        let public = repo.list_certificates(Visibility::Public).await.unwrap();
        assert_eq!(public.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_mid_backup_is_unavailable() {
        let repo = seeded_repo().await;
        let store = Arc::new(MemoryKvStore::new());
        store.set_unavailable(true);
        let service = SnapshotService::new(repo, Some(store.clone()));
        assert!(matches!(
            service.backup().await,
            Err(SnapshotError::BackupUnavailable(_))
        ));
        store.set_unavailable(false);
        assert_eq!(service.last_backup().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_without_store_everything_is_unavailable() {
        let service = SnapshotService::new(Arc::new(MemoryContentRepository::new()), None);
        assert!(!service.is_configured());
        assert!(matches!(
            service.backup().await,
            Err(SnapshotError::BackupUnavailable(_))
        ));
        assert!(matches!(
            service.restore().await,
            Err(SnapshotError::RestoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_accepts_snapshot_written_by_other_clients() {
        let store = Arc::new(MemoryKvStore::new());
        store
            .set(KEY_TIMESTAMP, "2024-03-01T10:00:00.000Z")
            .await
            .unwrap();
        store
            .set(
                "backup_reviews",
                r#"[{"id":9,"name":"Zed","email":null,"rating":4,"comment":"Nice",
                    "isApproved":true,"createdAt":"2024-02-01T00:00:00.000Z"}]"#,
            )
            .await
            .unwrap();

        let repo = Arc::new(MemoryContentRepository::new());
        let service = SnapshotService::new(repo.clone(), Some(store));
        assert_eq!(
            service.last_backup().await.unwrap().as_deref(),
            Some("2024-03-01T10:00:00.000Z")
        );

        let report = service.restore().await.unwrap();
        assert_eq!(report.reviews, Some(1));
        let reviews = repo.list_reviews(Visibility::Public).await.unwrap();
        assert_eq!(reviews[0].name, "Zed");
        assert_ne!(reviews[0].id, 9);
    }

    #[tokio::test]
    async fn test_invalid_row_rejects_restore_and_changes_nothing() {
        let store = Arc::new(MemoryKvStore::new());
        store
            .set(KEY_TIMESTAMP, "\"2024-03-01T10:00:00.000Z\"")
            .await
            .unwrap();
        store
            .set(
                "backup_certificates",
                r#"[{"title":"Restored","isVisible":true}]"#,
            )
            .await
            .unwrap();
        store
            .set(
                "backup_reviews",
                r#"[{"name":"Zed","rating":9,"comment":"Nice","isApproved":true}]"#,
            )
            .await
            .unwrap();

        let repo = seeded_repo().await;
        let before = counts(&repo).await;
        let service = SnapshotService::new(repo.clone(), Some(store));

        match service.restore().await {
            Err(SnapshotError::Corrupt(reason)) => assert!(reason.contains("rating"), "{reason}"),
            other => panic!("expected a corrupt snapshot, got {:?}", other),
        }
        assert_eq!(counts(&repo).await, before);
        let public = repo.list_reviews(Visibility::Public).await.unwrap();
        assert!(public.iter().all(|r| (1..=5).contains(&r.rating)));
        let titles: Vec<String> = repo
            .list_certificates(Visibility::All)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert!(!titles.contains(&"Restored".to_string()));
    }

    #[tokio::test]
    async fn test_store_errors_do_not_echo_the_store_url() {
        let repo = seeded_repo().await;
        let store = HttpKvStore::new("http://127.0.0.1:1/v0/SECRETTOKEN123").unwrap();
        let service = SnapshotService::new(repo, Some(Arc::new(store)));

        let errors = [
            service.backup().await.unwrap_err().to_string(),
            service.restore().await.unwrap_err().to_string(),
            service.last_backup().await.unwrap_err().to_string(),
        ];
        for message in errors {
            assert!(!message.contains("SECRETTOKEN123"), "{message}");
            assert!(message.contains(STORE_UNREACHABLE), "{message}");
        }
    }
}
