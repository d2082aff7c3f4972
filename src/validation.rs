//! Typed input validation for every content kind.
//!
//! Request bodies are deserialized into loose `*Input` structs (every field
//! optional) and then checked here. Validation either yields the value the
//! repository accepts or a list of field errors; nothing reaches persistence
//! unvalidated.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::models::{NewCertificate, NewContactMessage, NewProject, NewReview, ProjectChanges};

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

const MAX_NAME: usize = 100;
const MAX_TITLE: usize = 200;
const MAX_SHORT_TEXT: usize = 2000;
const MAX_LONG_TEXT: usize = 5000;
const MAX_URL: usize = 500;
const MAX_TECHNOLOGIES: usize = 30;
const MAX_TECHNOLOGY: usize = 50;

/// One offending field and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub type Validated<T> = Result<T, ValidationErrors>;

// ============================================================================
// Field helpers
// ============================================================================

fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max: usize,
) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => {
            errors.add(field, "is required");
            String::new()
        }
        Some(v) if v.chars().count() > max => {
            errors.add(field, format!("must be at most {} characters", max));
            String::new()
        }
        Some(v) => v,
        None => {
            errors.add(field, "is required");
            String::new()
        }
    }
}

/// Blank optional strings are treated as absent, the way HTML forms send them.
fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max: usize,
) -> Option<String> {
    let v = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;
    if v.chars().count() > max {
        errors.add(field, format!("must be at most {} characters", max));
        return None;
    }
    Some(v)
}

fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

fn is_http_url(url: &str) -> bool {
    (url.starts_with("https://") || url.starts_with("http://"))
        && url.len() > "https://".len()
        && !url.chars().any(char::is_whitespace)
}

/// Image urls are either site-relative upload paths or absolute http(s) urls.
fn is_image_url(url: &str) -> bool {
    (url.starts_with('/') && !url.contains("..") && !url.chars().any(char::is_whitespace))
        || is_http_url(url)
}

fn optional_url(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    accept: fn(&str) -> bool,
) -> Option<String> {
    let url = optional_text(errors, field, value, MAX_URL)?;
    if !accept(&url) {
        errors.add(field, "must be a valid URL");
        return None;
    }
    Some(url)
}

// ============================================================================
// Certificates
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub issue_date: Option<String>,
    pub image_url: Option<String>,
    pub is_visible: Option<bool>,
}

pub fn validate_certificate(input: CertificateInput) -> Validated<NewCertificate> {
    let mut errors = ValidationErrors::new();
    let title = required_text(&mut errors, "title", input.title, MAX_TITLE);
    let description = optional_text(&mut errors, "description", input.description, MAX_SHORT_TEXT);
    let issue_date = optional_text(&mut errors, "issueDate", input.issue_date, MAX_NAME);
    let image_url = optional_url(&mut errors, "imageUrl", input.image_url, is_image_url);

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(NewCertificate {
        title,
        description,
        issue_date,
        image_url,
        is_visible: input.is_visible.unwrap_or(true),
    })
}

// ============================================================================
// Reviews
// ============================================================================

/// `rating` is kept as a raw JSON value so a string or fractional rating is
/// reported as a field error instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub rating: Option<Value>,
    pub comment: Option<String>,
}

fn rating(errors: &mut ValidationErrors, value: Option<Value>) -> i32 {
    let parsed = match &value {
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    };
    match (value, parsed) {
        (None, _) | (Some(Value::Null), _) => {
            errors.add("rating", "is required");
            0
        }
        (_, Some(r)) if (1..=5).contains(&r) => r as i32,
        _ => {
            errors.add("rating", "must be an integer between 1 and 5");
            0
        }
    }
}

pub fn validate_review(input: ReviewInput) -> Validated<NewReview> {
    let mut errors = ValidationErrors::new();
    let name = required_text(&mut errors, "name", input.name, MAX_NAME);
    let email = optional_text(&mut errors, "email", input.email, 254);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            errors.add("email", "must be a valid email address");
        }
    }
    let rating = rating(&mut errors, input.rating);
    let comment = required_text(&mut errors, "comment", input.comment, MAX_SHORT_TEXT);

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(NewReview {
        name,
        email,
        rating,
        comment,
        is_approved: false,
    })
}

// ============================================================================
// Contact messages
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessageInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

pub fn validate_contact_message(input: ContactMessageInput) -> Validated<NewContactMessage> {
    let mut errors = ValidationErrors::new();
    let name = required_text(&mut errors, "name", input.name, MAX_NAME);
    let email = required_text(&mut errors, "email", input.email, 254);
    if !email.is_empty() && !is_valid_email(&email) {
        errors.add("email", "must be a valid email address");
    }
    let subject = optional_text(&mut errors, "subject", input.subject, MAX_TITLE);
    let message = required_text(&mut errors, "message", input.message, MAX_LONG_TEXT);

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(NewContactMessage {
        name,
        email,
        subject,
        message,
        is_read: false,
    })
}

// ============================================================================
// Projects
// ============================================================================

/// The admin form sends technologies as `"Rust, Axum"`; API clients send an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TechnologiesInput {
    List(Vec<String>),
    Csv(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub technologies: Option<TechnologiesInput>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub is_visible: Option<bool>,
}

fn technologies(errors: &mut ValidationErrors, input: TechnologiesInput) -> Vec<String> {
    let raw = match input {
        TechnologiesInput::List(list) => list,
        TechnologiesInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };
    let list: Vec<String> = raw
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if list.len() > MAX_TECHNOLOGIES {
        errors.add(
            "technologies",
            format!("must contain at most {} entries", MAX_TECHNOLOGIES),
        );
    }
    if list.iter().any(|t| t.chars().count() > MAX_TECHNOLOGY) {
        errors.add(
            "technologies",
            format!("entries must be at most {} characters", MAX_TECHNOLOGY),
        );
    }
    list
}

pub fn validate_project(input: ProjectInput) -> Validated<NewProject> {
    let mut errors = ValidationErrors::new();
    let title = required_text(&mut errors, "title", input.title, MAX_TITLE);
    let description = required_text(&mut errors, "description", input.description, MAX_LONG_TEXT);
    let image_url = optional_url(&mut errors, "imageUrl", input.image_url, is_image_url);
    let technologies = input
        .technologies
        .map(|t| technologies(&mut errors, t))
        .unwrap_or_default();
    let live_url = optional_url(&mut errors, "liveUrl", input.live_url, is_http_url);
    let github_url = optional_url(&mut errors, "githubUrl", input.github_url, is_http_url);

    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(NewProject {
        title,
        description,
        image_url,
        technologies,
        live_url,
        github_url,
        is_visible: input.is_visible.unwrap_or(true),
    })
}

/// Partial update: only present fields are checked and applied.
pub fn validate_project_changes(input: ProjectInput) -> Validated<ProjectChanges> {
    let mut errors = ValidationErrors::new();

    let title = input
        .title
        .map(|t| required_text(&mut errors, "title", Some(t), MAX_TITLE));
    let description = input
        .description
        .map(|d| required_text(&mut errors, "description", Some(d), MAX_LONG_TEXT));
    let image_url = input
        .image_url
        .map(|u| optional_url(&mut errors, "imageUrl", Some(u), is_image_url));
    let technologies = input.technologies.map(|t| technologies(&mut errors, t));
    let live_url = input
        .live_url
        .map(|u| optional_url(&mut errors, "liveUrl", Some(u), is_http_url));
    let github_url = input
        .github_url
        .map(|u| optional_url(&mut errors, "githubUrl", Some(u), is_http_url));

    let changes = ProjectChanges {
        title,
        description,
        image_url,
        technologies,
        live_url,
        github_url,
        is_visible: input.is_visible,
    };

    if errors.is_empty() && changes.is_empty() {
        errors.add("body", "at least one field must be provided");
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(changes)
}

// ============================================================================
// Stored rows (snapshot restore)
// ============================================================================

// Rows coming back from a snapshot get the same checks as client input.
// Flags a client may not set (approval, read state) are carried over as-is.

pub fn validate_stored_certificate(row: NewCertificate) -> Validated<NewCertificate> {
    validate_certificate(CertificateInput {
        title: Some(row.title),
        description: row.description,
        issue_date: row.issue_date,
        image_url: row.image_url,
        is_visible: Some(row.is_visible),
    })
}

pub fn validate_stored_review(row: NewReview) -> Validated<NewReview> {
    let is_approved = row.is_approved;
    let review = validate_review(ReviewInput {
        name: Some(row.name),
        email: row.email,
        rating: Some(Value::from(row.rating)),
        comment: Some(row.comment),
    })?;
    Ok(NewReview {
        is_approved,
        ..review
    })
}

pub fn validate_stored_contact_message(row: NewContactMessage) -> Validated<NewContactMessage> {
    let is_read = row.is_read;
    let message = validate_contact_message(ContactMessageInput {
        name: Some(row.name),
        email: Some(row.email),
        subject: row.subject,
        message: Some(row.message),
    })?;
    Ok(NewContactMessage { is_read, ..message })
}

pub fn validate_stored_project(row: NewProject) -> Validated<NewProject> {
    validate_project(ProjectInput {
        title: Some(row.title),
        description: Some(row.description),
        image_url: row.image_url,
        technologies: Some(TechnologiesInput::List(row.technologies)),
        live_url: row.live_url,
        github_url: row.github_url,
        is_visible: Some(row.is_visible),
    })
}
