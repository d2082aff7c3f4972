/**
 * Backup Routes
 * Administrator triggers for snapshot backup/restore and snapshot status
 */
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AdminSession;
use crate::error::AppError;
use crate::snapshot::{KindCounts, RestoreReport};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatusResponse {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    pub last_backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub counts: KindCounts,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: RestoreReport,
}

/// GET /api/admin/backup - Whether backups are configured and when the last one ran
pub async fn status(_admin: AdminSession, State(state): State<AppState>) -> Json<BackupStatusResponse> {
    let snapshots = &state.snapshots;
    if !snapshots.is_configured() {
        return Json(BackupStatusResponse {
            configured: false,
            store: None,
            last_backup: None,
            error: None,
        });
    }

    let (last_backup, error) = match snapshots.last_backup().await {
        Ok(ts) => (ts, None),
        Err(e) => {
            tracing::warn!("Could not read last backup timestamp: {}", e);
            (None, Some("snapshot store unreachable".to_string()))
        }
    };
    Json(BackupStatusResponse {
        configured: true,
        store: snapshots.store_kind().map(str::to_string),
        last_backup,
        error,
    })
}

/// POST /api/admin/backup - Take a snapshot now
pub async fn trigger_backup(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
) -> Result<Json<BackupResponse>, AppError> {
    tracing::info!(username = %admin.username, "Manual backup requested");
    let snapshot = state.snapshots.backup().await?;
    Ok(Json(BackupResponse {
        success: true,
        timestamp: snapshot.timestamp,
        counts: snapshot.counts(),
    }))
}

/// POST /api/admin/restore - Replace content with the stored snapshot
pub async fn trigger_restore(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
) -> Result<Json<RestoreResponse>, AppError> {
    tracing::warn!(username = %admin.username, "Manual restore requested");
    let report = state.snapshots.restore().await?;
    Ok(Json(RestoreResponse {
        success: true,
        report,
    }))
}
