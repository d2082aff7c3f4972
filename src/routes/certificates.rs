/**
 * Certificate Routes
 * Public listing plus administrator create/delete
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AdminSession;
use crate::db::models::Certificate;
use crate::error::AppError;
use crate::repository::Visibility;
use crate::routes::{JsonBody, SuccessResponse};
use crate::validation::{validate_certificate, CertificateInput};
use crate::AppState;

/// GET /api/certificates - Visible certificates, newest first
pub async fn list_public(
    State(state): State<AppState>,
) -> Result<Json<Vec<Certificate>>, AppError> {
    let rows = state.content.list_certificates(Visibility::Public).await?;
    Ok(Json(rows))
}

/// GET /api/certificates/all - Every certificate (admin)
pub async fn list_all(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<Certificate>>, AppError> {
    let rows = state.content.list_certificates(Visibility::All).await?;
    Ok(Json(rows))
}

/// POST /api/certificates - Add a certificate (admin)
pub async fn create(
    _admin: AdminSession,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CertificateInput>,
) -> Result<(StatusCode, Json<Certificate>), AppError> {
    let new = validate_certificate(input)?;
    let certificate = state.content.create_certificate(new).await?;
    tracing::info!(id = certificate.id, "Certificate created");
    Ok((StatusCode::CREATED, Json(certificate)))
}

/// DELETE /api/certificates/{id} - Remove a certificate (admin)
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .content
        .delete_certificate(id)
        .await
        .map_err(AppError::from_repo("Certificate"))?;
    tracing::info!(id, "Certificate deleted");
    Ok(Json(SuccessResponse::ok()))
}
