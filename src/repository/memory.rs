//! In-memory implementations of the storage ports.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    ContentRepository, CredentialStore, EntityKind, RepoError, RepoResult, SessionStore,
    Visibility,
};
use crate::db::models::{
    Administrator, Certificate, ContactMessage, NewCertificate, NewContactMessage, NewProject,
    NewReview, Project, ProjectChanges, Review, SessionRecord,
};

/// Rows of one kind plus its id sequence. Ids are never reused, like a
/// `BIGSERIAL` column, so restore hands out fresh ones.
struct Table<T> {
    rows: Vec<T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Default)]
struct Tables {
    certificates: Table<Certificate>,
    reviews: Table<Review>,
    contact_messages: Table<ContactMessage>,
    projects: Table<Project>,
}

#[derive(Default)]
pub struct MemoryContentRepository {
    tables: RwLock<Tables>,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first; id breaks ties between rows created in the same instant.
fn newest_first<T>(rows: &[T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) -> Vec<T>
where
    T: Clone,
{
    let mut out = rows.to_vec();
    out.sort_by_key(|r| std::cmp::Reverse(key(r)));
    out
}

fn remove_by_id<T>(rows: &mut Vec<T>, id: i64, get_id: impl Fn(&T) -> i64) -> RepoResult<()> {
    let before = rows.len();
    rows.retain(|r| get_id(r) != id);
    if rows.len() == before {
        return Err(RepoError::NotFound);
    }
    Ok(())
}

fn certificate_row(table: &mut Table<Certificate>, new: NewCertificate) -> Certificate {
    Certificate {
        id: table.next_id(),
        title: new.title,
        description: new.description,
        issue_date: new.issue_date,
        image_url: new.image_url,
        is_visible: new.is_visible,
        created_at: Utc::now(),
    }
}

fn review_row(table: &mut Table<Review>, new: NewReview) -> Review {
    Review {
        id: table.next_id(),
        name: new.name,
        email: new.email,
        rating: new.rating,
        comment: new.comment,
        is_approved: new.is_approved,
        created_at: Utc::now(),
    }
}

fn message_row(table: &mut Table<ContactMessage>, new: NewContactMessage) -> ContactMessage {
    ContactMessage {
        id: table.next_id(),
        name: new.name,
        email: new.email,
        subject: new.subject,
        message: new.message,
        is_read: new.is_read,
        created_at: Utc::now(),
    }
}

fn project_row(table: &mut Table<Project>, new: NewProject) -> Project {
    Project {
        id: table.next_id(),
        title: new.title,
        description: new.description,
        image_url: new.image_url,
        technologies: new.technologies,
        live_url: new.live_url,
        github_url: new.github_url,
        is_visible: new.is_visible,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn ping(&self) -> RepoResult<Duration> {
        let start = Instant::now();
        let _guard = self.tables.read().await;
        Ok(start.elapsed())
    }

    async fn count(&self, kind: EntityKind) -> RepoResult<i64> {
        let t = self.tables.read().await;
        let n = match kind {
            EntityKind::Certificates => t.certificates.rows.len(),
            EntityKind::Reviews => t.reviews.rows.len(),
            EntityKind::ContactMessages => t.contact_messages.rows.len(),
            EntityKind::Projects => t.projects.rows.len(),
        };
        Ok(n as i64)
    }

    async fn list_certificates(&self, visibility: Visibility) -> RepoResult<Vec<Certificate>> {
        let t = self.tables.read().await;
        let mut rows = newest_first(&t.certificates.rows, |c| (c.created_at, c.id));
        if visibility == Visibility::Public {
            rows.retain(|c| c.is_visible);
        }
        Ok(rows)
    }

    async fn create_certificate(&self, new: NewCertificate) -> RepoResult<Certificate> {
        let mut t = self.tables.write().await;
        let row = certificate_row(&mut t.certificates, new);
        t.certificates.rows.push(row.clone());
        Ok(row)
    }

    async fn delete_certificate(&self, id: i64) -> RepoResult<()> {
        let mut t = self.tables.write().await;
        remove_by_id(&mut t.certificates.rows, id, |c| c.id)
    }

    async fn replace_certificates(&self, rows: Vec<NewCertificate>) -> RepoResult<usize> {
        let mut t = self.tables.write().await;
        t.certificates.rows.clear();
        for new in rows {
            let row = certificate_row(&mut t.certificates, new);
            t.certificates.rows.push(row);
        }
        Ok(t.certificates.rows.len())
    }

    async fn list_reviews(&self, visibility: Visibility) -> RepoResult<Vec<Review>> {
        let t = self.tables.read().await;
        let mut rows = newest_first(&t.reviews.rows, |r| (r.created_at, r.id));
        if visibility == Visibility::Public {
            rows.retain(|r| r.is_approved);
        }
        Ok(rows)
    }

    async fn create_review(&self, new: NewReview) -> RepoResult<Review> {
        let mut t = self.tables.write().await;
        let row = review_row(&mut t.reviews, new);
        t.reviews.rows.push(row.clone());
        Ok(row)
    }

    async fn approve_review(&self, id: i64) -> RepoResult<Review> {
        let mut t = self.tables.write().await;
        let review = t
            .reviews
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepoError::NotFound)?;
        review.is_approved = true;
        Ok(review.clone())
    }

    async fn delete_review(&self, id: i64) -> RepoResult<()> {
        let mut t = self.tables.write().await;
        remove_by_id(&mut t.reviews.rows, id, |r| r.id)
    }

    async fn replace_reviews(&self, rows: Vec<NewReview>) -> RepoResult<usize> {
        let mut t = self.tables.write().await;
        t.reviews.rows.clear();
        for new in rows {
            let row = review_row(&mut t.reviews, new);
            t.reviews.rows.push(row);
        }
        Ok(t.reviews.rows.len())
    }

    async fn list_contact_messages(
        &self,
        visibility: Visibility,
    ) -> RepoResult<Vec<ContactMessage>> {
        if visibility == Visibility::Public {
            return Ok(Vec::new());
        }
        let t = self.tables.read().await;
        Ok(newest_first(&t.contact_messages.rows, |m| {
            (m.created_at, m.id)
        }))
    }

    async fn create_contact_message(&self, new: NewContactMessage) -> RepoResult<ContactMessage> {
        let mut t = self.tables.write().await;
        let row = message_row(&mut t.contact_messages, new);
        t.contact_messages.rows.push(row.clone());
        Ok(row)
    }

    async fn mark_message_read(&self, id: i64) -> RepoResult<ContactMessage> {
        let mut t = self.tables.write().await;
        let message = t
            .contact_messages
            .rows
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RepoError::NotFound)?;
        message.is_read = true;
        Ok(message.clone())
    }

    async fn unread_message_count(&self) -> RepoResult<i64> {
        let t = self.tables.read().await;
        Ok(t.contact_messages.rows.iter().filter(|m| !m.is_read).count() as i64)
    }

    async fn delete_contact_message(&self, id: i64) -> RepoResult<()> {
        let mut t = self.tables.write().await;
        remove_by_id(&mut t.contact_messages.rows, id, |m| m.id)
    }

    async fn replace_contact_messages(&self, rows: Vec<NewContactMessage>) -> RepoResult<usize> {
        let mut t = self.tables.write().await;
        t.contact_messages.rows.clear();
        for new in rows {
            let row = message_row(&mut t.contact_messages, new);
            t.contact_messages.rows.push(row);
        }
        Ok(t.contact_messages.rows.len())
    }

    async fn list_projects(&self, visibility: Visibility) -> RepoResult<Vec<Project>> {
        let t = self.tables.read().await;
        let mut rows = newest_first(&t.projects.rows, |p| (p.created_at, p.id));
        if visibility == Visibility::Public {
            rows.retain(|p| p.is_visible);
        }
        Ok(rows)
    }

    async fn create_project(&self, new: NewProject) -> RepoResult<Project> {
        let mut t = self.tables.write().await;
        let row = project_row(&mut t.projects, new);
        t.projects.rows.push(row.clone());
        Ok(row)
    }

    async fn update_project(&self, id: i64, changes: ProjectChanges) -> RepoResult<Project> {
        let mut t = self.tables.write().await;
        let project = t
            .projects
            .rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RepoError::NotFound)?;
        changes.apply(project);
        Ok(project.clone())
    }

    async fn delete_project(&self, id: i64) -> RepoResult<()> {
        let mut t = self.tables.write().await;
        remove_by_id(&mut t.projects.rows, id, |p| p.id)
    }

    async fn replace_projects(&self, rows: Vec<NewProject>) -> RepoResult<usize> {
        let mut t = self.tables.write().await;
        t.projects.rows.clear();
        for new in rows {
            let row = project_row(&mut t.projects, new);
            t.projects.rows.push(row);
        }
        Ok(t.projects.rows.len())
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    admins: RwLock<Vec<Administrator>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_admin(&self, username: &str) -> RepoResult<Option<Administrator>> {
        let admins = self.admins.read().await;
        Ok(admins.iter().find(|a| a.username == username).cloned())
    }

    async fn admin_count(&self) -> RepoResult<i64> {
        Ok(self.admins.read().await.len() as i64)
    }

    async fn insert_admin(&self, username: &str, password_hash: &str) -> RepoResult<Administrator> {
        let mut admins = self.admins.write().await;
        let admin = Administrator {
            id: admins.len() as i64 + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        admins.push(admin.clone());
        Ok(admin)
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_session(&self, record: SessionRecord) -> RepoResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(record.token_hash.clone(), record);
        Ok(())
    }

    async fn find_session(&self, token_hash: &str) -> RepoResult<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(token_hash).cloned())
    }

    async fn delete_session(&self, token_hash: &str) -> RepoResult<bool> {
        Ok(self.sessions.write().await.remove(token_hash).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(name: &str, approved: bool) -> NewReview {
        NewReview {
            name: name.to_string(),
            email: None,
            rating: 5,
            comment: "Excellent".to_string(),
            is_approved: approved,
        }
    }

    #[tokio::test]
    async fn test_unapproved_review_hidden_from_public() {
        let repo = MemoryContentRepository::new();
        repo.create_review(review("hidden", false)).await.unwrap();
        repo.create_review(review("shown", true)).await.unwrap();

        let public = repo.list_reviews(Visibility::Public).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].name, "shown");

        let all = repo.list_reviews(Visibility::All).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let repo = MemoryContentRepository::new();
        let first = repo.create_review(review("first", true)).await.unwrap();
        let second = repo.create_review(review("second", true)).await.unwrap();
        let rows = repo.list_reviews(Visibility::All).await.unwrap();
        assert_eq!(rows[0].id, second.id);
        assert_eq!(rows[1].id, first.id);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_not_found() {
        let repo = MemoryContentRepository::new();
        assert!(matches!(
            repo.delete_project(42).await,
            Err(RepoError::NotFound)
        ));
        assert!(matches!(
            repo.approve_review(42).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_contact_messages_never_public() {
        let repo = MemoryContentRepository::new();
        repo.create_contact_message(NewContactMessage {
            name: "Alice".into(),
            email: "a@x.com".into(),
            subject: None,
            message: "Hi".into(),
            is_read: false,
        })
        .await
        .unwrap();
        assert!(repo
            .list_contact_messages(Visibility::Public)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(repo.unread_message_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_replace_assigns_fresh_ids() {
        let repo = MemoryContentRepository::new();
        let old = repo.create_review(review("old", true)).await.unwrap();
        repo.replace_reviews(vec![review("restored", true)])
            .await
            .unwrap();
        let rows = repo.list_reviews(Visibility::All).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "restored");
        assert_ne!(rows[0].id, old.id);
    }

    #[tokio::test]
    async fn test_expired_sessions_pruned() {
        let store = MemorySessionStore::new();
        let now = Utc::now();
        for (hash, offset) in [("live", 60), ("dead", -60)] {
            store
                .insert_session(SessionRecord {
                    token_hash: hash.to_string(),
                    username: "admin".into(),
                    created_at: now,
                    expires_at: now + chrono::Duration::seconds(offset),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.delete_expired(now).await.unwrap(), 1);
        assert!(store.find_session("live").await.unwrap().is_some());
        assert!(store.find_session("dead").await.unwrap().is_none());
    }
}
