//! HTTP-facing error type.
//!
//! Every handler returns `Result<_, AppError>`. Lower layers keep their own
//! error enums; the conversions below decide what a client may see. Storage
//! and hashing failures are logged here and answered with a generic 500.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::auth::AuthError;
use crate::repository::RepoError;
use crate::routes::ErrorResponse;
use crate::snapshot::SnapshotError;
use crate::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("too many login attempts")]
    Throttled,

    #[error("backup unavailable: {0}")]
    BackupUnavailable(String),

    #[error("restore unavailable: {0}")]
    RestoreUnavailable(String),

    #[error("no backup found")]
    NoBackupFound,

    #[error("snapshot is corrupt: {0}")]
    CorruptSnapshot(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::NoBackupFound => StatusCode::NOT_FOUND,
            AppError::Throttled => StatusCode::TOO_MANY_REQUESTS,
            AppError::BackupUnavailable(_) | AppError::RestoreUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::CorruptSnapshot(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a repository miss to a 404 naming the record kind.
    pub fn from_repo(kind: &'static str) -> impl FnOnce(RepoError) -> AppError {
        move |e| match e {
            RepoError::NotFound => AppError::NotFound(kind),
            other => other.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::Validation(errors) => ErrorResponse {
                error: "Validation failed".to_string(),
                message: None,
                fields: Some(errors.into_inner()),
            },
            AppError::BadRequest(message) => ErrorResponse::new(message),
            AppError::Unauthenticated => ErrorResponse::new("Authentication required"),
            AppError::InvalidCredentials => ErrorResponse::new("Invalid credentials"),
            AppError::NotFound(kind) => ErrorResponse::new(format!("{} not found", kind)),
            AppError::Throttled => {
                ErrorResponse::new("Too many login attempts. Please try again later.")
            }
            AppError::BackupUnavailable(reason) => {
                ErrorResponse::with_message("Backup not available", reason)
            }
            AppError::RestoreUnavailable(reason) => {
                ErrorResponse::with_message("Restore not available", reason)
            }
            AppError::NoBackupFound => ErrorResponse::new("No backup found"),
            AppError::CorruptSnapshot(reason) => {
                ErrorResponse::with_message("Snapshot is corrupt", reason)
            }
            AppError::Internal(details) => {
                tracing::error!("Internal error: {}", details);
                ErrorResponse::new("Internal server error")
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                let detail = e.body_text();
                let (field, message) = json_error_field(&detail);
                let mut errors = ValidationErrors::new();
                errors.add(field, message);
                AppError::Validation(errors)
            }
            JsonRejection::JsonSyntaxError(_) => {
                AppError::BadRequest("Request body is not valid JSON".to_string())
            }
            JsonRejection::MissingJsonContentType(_) => {
                AppError::BadRequest("Expected Content-Type: application/json".to_string())
            }
            other => {
                tracing::debug!("JSON body rejected: {}", other.body_text());
                AppError::BadRequest("Could not read request body".to_string())
            }
        }
    }
}

/// Split axum's data-error text (`<prefix>: <path>: <message> at line L
/// column C`) into the offending field and a short message. Errors about the
/// body as a whole are attributed to `body`.
fn json_error_field(detail: &str) -> (&str, &str) {
    let rest = detail
        .split_once("target type: ")
        .map_or(detail, |(_, rest)| rest);
    let (field, message) = match rest.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(' ') => (path, message),
        _ => ("body", rest),
    };
    let message = message
        .split_once(" at line ")
        .map_or(message, |(message, _)| message);
    (field, message)
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => AppError::NotFound("Record"),
            RepoError::Database(e) => AppError::Internal(format!("database: {}", e)),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            AuthError::Unauthenticated => AppError::Unauthenticated,
            AuthError::Storage(e) => AppError::Internal(format!("auth storage: {}", e)),
            AuthError::Hashing(e) => AppError::Internal(format!("auth hashing: {}", e)),
        }
    }
}

impl From<SnapshotError> for AppError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::BackupUnavailable(reason) => AppError::BackupUnavailable(reason),
            SnapshotError::RestoreUnavailable(reason) => AppError::RestoreUnavailable(reason),
            SnapshotError::NoBackupFound => AppError::NoBackupFound,
            SnapshotError::Corrupt(reason) => AppError::CorruptSnapshot(reason),
        }
    }
}
