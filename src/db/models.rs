//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// The single administrator account
#[derive(Debug, Clone, FromRow)]
pub struct Administrator {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Stored session; the token itself is never persisted, only its hash
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub token_hash: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Certificate model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub issue_date: Option<String>,
    pub image_url: Option<String>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

/// New certificate for insertion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCertificate {
    pub title: String,
    pub description: Option<String>,
    pub issue_date: Option<String>,
    pub image_url: Option<String>,
    pub is_visible: bool,
}

/// Review model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub rating: i32,
    pub comment: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
}

/// New review for insertion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub name: String,
    pub email: Option<String>,
    pub rating: i32,
    pub comment: String,
    pub is_approved: bool,
}

/// Contact message model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// New contact message for insertion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
}

/// Portfolio project model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub technologies: Vec<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
}

/// New project for insertion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub technologies: Vec<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub is_visible: bool,
}

/// Project update. `Some(None)` clears an optional column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<Option<String>>,
    pub technologies: Option<Vec<String>>,
    pub live_url: Option<Option<String>>,
    pub github_url: Option<Option<String>>,
    pub is_visible: Option<bool>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, project: &mut Project) {
        if let Some(title) = self.title {
            project.title = title;
        }
        if let Some(description) = self.description {
            project.description = description;
        }
        if let Some(image_url) = self.image_url {
            project.image_url = image_url;
        }
        if let Some(technologies) = self.technologies {
            project.technologies = technologies;
        }
        if let Some(live_url) = self.live_url {
            project.live_url = live_url;
        }
        if let Some(github_url) = self.github_url {
            project.github_url = github_url;
        }
        if let Some(is_visible) = self.is_visible {
            project.is_visible = is_visible;
        }
    }
}

// Stripping identity (id, createdAt) from a stored row yields the insert
// shape; restore relies on this to reinsert snapshot rows with fresh ids.

impl From<Certificate> for NewCertificate {
    fn from(c: Certificate) -> Self {
        Self {
            title: c.title,
            description: c.description,
            issue_date: c.issue_date,
            image_url: c.image_url,
            is_visible: c.is_visible,
        }
    }
}

impl From<Review> for NewReview {
    fn from(r: Review) -> Self {
        Self {
            name: r.name,
            email: r.email,
            rating: r.rating,
            comment: r.comment,
            is_approved: r.is_approved,
        }
    }
}

impl From<ContactMessage> for NewContactMessage {
    fn from(m: ContactMessage) -> Self {
        Self {
            name: m.name,
            email: m.email,
            subject: m.subject,
            message: m.message,
            is_read: m.is_read,
        }
    }
}

impl From<Project> for NewProject {
    fn from(p: Project) -> Self {
        Self {
            title: p.title,
            description: p.description,
            image_url: p.image_url,
            technologies: p.technologies,
            live_url: p.live_url,
            github_url: p.github_url,
            is_visible: p.is_visible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_serializes_camel_case() {
        let project = Project {
            id: 7,
            title: "Site".into(),
            description: "d".into(),
            image_url: None,
            technologies: vec!["Rust".into()],
            live_url: None,
            github_url: Some("https://github.com/me/site".into()),
            is_visible: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["isVisible"], true);
        assert_eq!(json["githubUrl"], "https://github.com/me/site");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_changes_apply_only_present_fields() {
        let mut project = Project {
            id: 1,
            title: "Old".into(),
            description: "Keep".into(),
            image_url: Some("/uploads/a.png".into()),
            technologies: vec![],
            live_url: None,
            github_url: None,
            is_visible: true,
            created_at: Utc::now(),
        };
        ProjectChanges {
            title: Some("New".into()),
            image_url: Some(None),
            ..Default::default()
        }
        .apply(&mut project);
        assert_eq!(project.title, "New");
        assert_eq!(project.description, "Keep");
        assert_eq!(project.image_url, None);
    }
}
