//! PostgreSQL-backed content repository.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{
    Certificate, ContactMessage, NewCertificate, NewContactMessage, NewProject, NewReview,
    Project, ProjectChanges, Review,
};
use crate::repository::{ContentRepository, EntityKind, RepoError, RepoResult, Visibility};

const CERTIFICATE_COLUMNS: &str =
    "id, title, description, issue_date, image_url, is_visible, created_at";
const REVIEW_COLUMNS: &str = "id, name, email, rating, comment, is_approved, created_at";
const MESSAGE_COLUMNS: &str = "id, name, email, subject, message, is_read, created_at";
const PROJECT_COLUMNS: &str =
    "id, title, description, image_url, technologies, live_url, github_url, is_visible, created_at";

#[derive(Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_by_id(&self, table: &str, id: i64) -> RepoResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Certificates => "certificates",
        EntityKind::Reviews => "reviews",
        EntityKind::ContactMessages => "contact_messages",
        EntityKind::Projects => "projects",
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn ping(&self) -> RepoResult<Duration> {
        Ok(super::health_check(&self.pool).await?)
    }

    async fn count(&self, kind: EntityKind) -> RepoResult<i64> {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table_name(kind)))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    // ------------------------------------------------------------------------
    // Certificates
    // ------------------------------------------------------------------------

    async fn list_certificates(&self, visibility: Visibility) -> RepoResult<Vec<Certificate>> {
        let filter = match visibility {
            Visibility::Public => "WHERE is_visible = true",
            Visibility::All => "",
        };
        let rows = sqlx::query_as::<_, Certificate>(&format!(
            "SELECT {} FROM certificates {} ORDER BY created_at DESC, id DESC",
            CERTIFICATE_COLUMNS, filter
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_certificate(&self, new: NewCertificate) -> RepoResult<Certificate> {
        let row = sqlx::query_as::<_, Certificate>(&format!(
            r#"
            INSERT INTO certificates (title, description, issue_date, image_url, is_visible)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            CERTIFICATE_COLUMNS
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.issue_date)
        .bind(&new.image_url)
        .bind(new.is_visible)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_certificate(&self, id: i64) -> RepoResult<()> {
        self.delete_by_id("certificates", id).await
    }

    async fn replace_certificates(&self, rows: Vec<NewCertificate>) -> RepoResult<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM certificates")
            .execute(&mut *tx)
            .await?;
        for new in &rows {
            sqlx::query(
                r#"
                INSERT INTO certificates (title, description, issue_date, image_url, is_visible)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&new.title)
            .bind(&new.description)
            .bind(&new.issue_date)
            .bind(&new.image_url)
            .bind(new.is_visible)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len())
    }

    // ------------------------------------------------------------------------
    // Reviews
    // ------------------------------------------------------------------------

    async fn list_reviews(&self, visibility: Visibility) -> RepoResult<Vec<Review>> {
        let filter = match visibility {
            Visibility::Public => "WHERE is_approved = true",
            Visibility::All => "",
        };
        let rows = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews {} ORDER BY created_at DESC, id DESC",
            REVIEW_COLUMNS, filter
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_review(&self, new: NewReview) -> RepoResult<Review> {
        let row = sqlx::query_as::<_, Review>(&format!(
            r#"
            INSERT INTO reviews (name, email, rating, comment, is_approved)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            REVIEW_COLUMNS
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(new.rating)
        .bind(&new.comment)
        .bind(new.is_approved)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn approve_review(&self, id: i64) -> RepoResult<Review> {
        sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET is_approved = true WHERE id = $1 RETURNING {}",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn delete_review(&self, id: i64) -> RepoResult<()> {
        self.delete_by_id("reviews", id).await
    }

    async fn replace_reviews(&self, rows: Vec<NewReview>) -> RepoResult<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM reviews").execute(&mut *tx).await?;
        for new in &rows {
            sqlx::query(
                r#"
                INSERT INTO reviews (name, email, rating, comment, is_approved)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&new.name)
            .bind(&new.email)
            .bind(new.rating)
            .bind(&new.comment)
            .bind(new.is_approved)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len())
    }

    // ------------------------------------------------------------------------
    // Contact messages
    // ------------------------------------------------------------------------

    async fn list_contact_messages(
        &self,
        visibility: Visibility,
    ) -> RepoResult<Vec<ContactMessage>> {
        if visibility == Visibility::Public {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ContactMessage>(&format!(
            "SELECT {} FROM contact_messages ORDER BY created_at DESC, id DESC",
            MESSAGE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_contact_message(&self, new: NewContactMessage) -> RepoResult<ContactMessage> {
        let row = sqlx::query_as::<_, ContactMessage>(&format!(
            r#"
            INSERT INTO contact_messages (name, email, subject, message, is_read)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.subject)
        .bind(&new.message)
        .bind(new.is_read)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn mark_message_read(&self, id: i64) -> RepoResult<ContactMessage> {
        sqlx::query_as::<_, ContactMessage>(&format!(
            "UPDATE contact_messages SET is_read = true WHERE id = $1 RETURNING {}",
            MESSAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn unread_message_count(&self) -> RepoResult<i64> {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM contact_messages WHERE is_read = false")
                .fetch_one(&self.pool)
                .await?;
        Ok(n)
    }

    async fn delete_contact_message(&self, id: i64) -> RepoResult<()> {
        self.delete_by_id("contact_messages", id).await
    }

    async fn replace_contact_messages(&self, rows: Vec<NewContactMessage>) -> RepoResult<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM contact_messages")
            .execute(&mut *tx)
            .await?;
        for new in &rows {
            sqlx::query(
                r#"
                INSERT INTO contact_messages (name, email, subject, message, is_read)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.subject)
            .bind(&new.message)
            .bind(new.is_read)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len())
    }

    // ------------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------------

    async fn list_projects(&self, visibility: Visibility) -> RepoResult<Vec<Project>> {
        let filter = match visibility {
            Visibility::Public => "WHERE is_visible = true",
            Visibility::All => "",
        };
        let rows = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects {} ORDER BY created_at DESC, id DESC",
            PROJECT_COLUMNS, filter
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_project(&self, new: NewProject) -> RepoResult<Project> {
        let row = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects
                (title, description, image_url, technologies, live_url, github_url, is_visible)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        ))
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.image_url)
        .bind(&new.technologies)
        .bind(&new.live_url)
        .bind(&new.github_url)
        .bind(new.is_visible)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_project(&self, id: i64, changes: ProjectChanges) -> RepoResult<Project> {
        // Read-modify-write; concurrent admin edits are last-write-wins.
        let mut project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {} FROM projects WHERE id = $1",
            PROJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)?;

        changes.apply(&mut project);

        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET title = $1, description = $2, image_url = $3, technologies = $4,
                live_url = $5, github_url = $6, is_visible = $7
            WHERE id = $8
            RETURNING {}
            "#,
            PROJECT_COLUMNS
        ))
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.image_url)
        .bind(&project.technologies)
        .bind(&project.live_url)
        .bind(&project.github_url)
        .bind(project.is_visible)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)
    }

    async fn delete_project(&self, id: i64) -> RepoResult<()> {
        self.delete_by_id("projects", id).await
    }

    async fn replace_projects(&self, rows: Vec<NewProject>) -> RepoResult<usize> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM projects").execute(&mut *tx).await?;
        for new in &rows {
            sqlx::query(
                r#"
                INSERT INTO projects
                    (title, description, image_url, technologies, live_url, github_url, is_visible)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(&new.title)
            .bind(&new.description)
            .bind(&new.image_url)
            .bind(&new.technologies)
            .bind(&new.live_url)
            .bind(&new.github_url)
            .bind(new.is_visible)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(rows.len())
    }
}
