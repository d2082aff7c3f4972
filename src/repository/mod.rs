//! Storage ports.
//!
//! Handlers and services only see these traits. PostgreSQL implementations
//! live in `crate::db`; the in-memory ones in [`memory`] back development
//! runs without `DATABASE_URL` and the test suite.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::models::{
    Administrator, Certificate, ContactMessage, NewCertificate, NewContactMessage, NewProject,
    NewReview, Project, ProjectChanges, Review, SessionRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("record not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Which read tier a listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only rows an unauthenticated visitor may see.
    Public,
    /// Every row (administrator).
    All,
}

/// The four independent content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Certificates,
    Reviews,
    ContactMessages,
    Projects,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Certificates,
        EntityKind::Reviews,
        EntityKind::ContactMessages,
        EntityKind::Projects,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Certificates => "certificates",
            EntityKind::Reviews => "reviews",
            EntityKind::ContactMessages => "contact messages",
            EntityKind::Projects => "projects",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// CRUD over the site's content tables.
///
/// Listings are ordered by `created_at` descending, newest id first on ties.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn ping(&self) -> RepoResult<Duration>;

    async fn count(&self, kind: EntityKind) -> RepoResult<i64>;

    // Certificates
    async fn list_certificates(&self, visibility: Visibility) -> RepoResult<Vec<Certificate>>;
    async fn create_certificate(&self, new: NewCertificate) -> RepoResult<Certificate>;
    async fn delete_certificate(&self, id: i64) -> RepoResult<()>;
    async fn replace_certificates(&self, rows: Vec<NewCertificate>) -> RepoResult<usize>;

    // Reviews
    async fn list_reviews(&self, visibility: Visibility) -> RepoResult<Vec<Review>>;
    async fn create_review(&self, new: NewReview) -> RepoResult<Review>;
    async fn approve_review(&self, id: i64) -> RepoResult<Review>;
    async fn delete_review(&self, id: i64) -> RepoResult<()>;
    async fn replace_reviews(&self, rows: Vec<NewReview>) -> RepoResult<usize>;

    // Contact messages. `Visibility::Public` always yields nothing.
    async fn list_contact_messages(&self, visibility: Visibility)
        -> RepoResult<Vec<ContactMessage>>;
    async fn create_contact_message(&self, new: NewContactMessage) -> RepoResult<ContactMessage>;
    async fn mark_message_read(&self, id: i64) -> RepoResult<ContactMessage>;
    async fn unread_message_count(&self) -> RepoResult<i64>;
    async fn delete_contact_message(&self, id: i64) -> RepoResult<()>;
    async fn replace_contact_messages(&self, rows: Vec<NewContactMessage>) -> RepoResult<usize>;

    // Projects
    async fn list_projects(&self, visibility: Visibility) -> RepoResult<Vec<Project>>;
    async fn create_project(&self, new: NewProject) -> RepoResult<Project>;
    async fn update_project(&self, id: i64, changes: ProjectChanges) -> RepoResult<Project>;
    async fn delete_project(&self, id: i64) -> RepoResult<()>;
    async fn replace_projects(&self, rows: Vec<NewProject>) -> RepoResult<usize>;
}

/// Holds the administrator account.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_admin(&self, username: &str) -> RepoResult<Option<Administrator>>;
    async fn admin_count(&self) -> RepoResult<i64>;
    async fn insert_admin(&self, username: &str, password_hash: &str) -> RepoResult<Administrator>;
}

/// Holds live sessions keyed by token hash.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, record: SessionRecord) -> RepoResult<()>;
    async fn find_session(&self, token_hash: &str) -> RepoResult<Option<SessionRecord>>;
    /// Returns whether a session was removed.
    async fn delete_session(&self, token_hash: &str) -> RepoResult<bool>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64>;
}
