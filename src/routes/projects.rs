/**
 * Project Routes
 * Portfolio projects: public listing plus administrator CRUD
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AdminSession;
use crate::db::models::Project;
use crate::error::AppError;
use crate::repository::Visibility;
use crate::routes::{JsonBody, SuccessResponse};
use crate::validation::{validate_project, validate_project_changes, ProjectInput};
use crate::AppState;

/// GET /api/projects - Visible projects, newest first
pub async fn list_public(State(state): State<AppState>) -> Result<Json<Vec<Project>>, AppError> {
    let rows = state.content.list_projects(Visibility::Public).await?;
    Ok(Json(rows))
}

/// GET /api/projects/all - Every project (admin)
pub async fn list_all(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, AppError> {
    let rows = state.content.list_projects(Visibility::All).await?;
    Ok(Json(rows))
}

/// POST /api/projects - Add a project (admin)
pub async fn create(
    _admin: AdminSession,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ProjectInput>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let new = validate_project(input)?;
    let project = state.content.create_project(new).await?;
    tracing::info!(id = project.id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT|PATCH /api/projects/{id} - Update the given fields of a project (admin)
pub async fn update(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<ProjectInput>,
) -> Result<Json<Project>, AppError> {
    let changes = validate_project_changes(input)?;
    let project = state
        .content
        .update_project(id, changes)
        .await
        .map_err(AppError::from_repo("Project"))?;
    tracing::info!(id, "Project updated");
    Ok(Json(project))
}

/// DELETE /api/projects/{id} - Remove a project (admin)
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .content
        .delete_project(id)
        .await
        .map_err(AppError::from_repo("Project"))?;
    tracing::info!(id, "Project deleted");
    Ok(Json(SuccessResponse::ok()))
}
