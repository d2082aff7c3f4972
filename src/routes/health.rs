/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::AppState;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Snapshot store check; `lastBackup` tells the admin how stale the snapshot is
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_backup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detailed health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    pub checks: HealthChecks,
}

/// Health checks for all services
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: ServiceCheck,
    pub snapshots: SnapshotCheck,
}

/// Ready check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

async fn database_check(state: &AppState) -> ServiceCheck {
    match state.content.ping().await {
        Ok(duration) => ServiceCheck {
            status: "healthy".to_string(),
            response_time: Some(duration.as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Database health check failed: {}", e);
            ServiceCheck {
                status: "unhealthy".to_string(),
                response_time: None,
                error: Some("database unreachable".to_string()),
            }
        }
    }
}

async fn snapshot_check(state: &AppState) -> SnapshotCheck {
    let snapshots = &state.snapshots;
    if !snapshots.is_configured() {
        return SnapshotCheck {
            status: "disabled".to_string(),
            store: None,
            last_backup: None,
            error: None,
        };
    }

    let store = snapshots.store_kind().map(str::to_string);
    match snapshots.last_backup().await {
        Ok(last_backup) => SnapshotCheck {
            status: "healthy".to_string(),
            store,
            last_backup,
            error: None,
        },
        Err(e) => {
            tracing::warn!("Snapshot store health check failed: {}", e);
            SnapshotCheck {
                status: "unhealthy".to_string(),
                store,
                last_backup: None,
                error: Some("snapshot store unreachable".to_string()),
            }
        }
    }
}

/// GET /health - Simple health ping
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/detailed - Database and snapshot store checks
pub async fn health_detailed(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();

    let database = database_check(&state).await;
    let snapshots = snapshot_check(&state).await;

    // An unreachable snapshot store degrades backups only; the site still serves.
    let overall_status = if database.status == "healthy" {
        "ok"
    } else {
        "degraded"
    };

    let response = DetailedHealthResponse {
        status: overall_status.to_string(),
        timestamp: Utc::now(),
        uptime: Some(uptime),
        checks: HealthChecks {
            database,
            snapshots,
        },
    };

    (StatusCode::OK, Json(response))
}

/// GET /health/ready - Readiness check; ready once the database answers
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();
    let database = database_check(&state).await;
    let is_ready = database.status == "healthy";

    let response = ReadyResponse {
        status: if is_ready {
            "ready".to_string()
        } else {
            "not ready".to_string()
        },
        timestamp: Utc::now(),
        uptime: Some(uptime),
        reason: if is_ready {
            None
        } else {
            Some("Database is not healthy".to_string())
        },
    };

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::store::HttpKvStore;
    use crate::test_support::{self, empty_request};
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let res = app.oneshot(empty_request("GET", uri, None)).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: T = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        init_start_time();
        let app = test_support::app(test_support::state().await);
        let (status, body) = get_json::<SimpleHealthResponse>(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_health_detailed_without_snapshot_store() {
        init_start_time();
        let app = test_support::app(test_support::state().await);
        let (status, body) = get_json::<DetailedHealthResponse>(app, "/health/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert!(body.uptime.is_some());
        assert_eq!(body.checks.database.status, "healthy");
        assert_eq!(body.checks.snapshots.status, "disabled");
    }

    #[tokio::test]
    async fn test_unreachable_snapshot_store_does_not_degrade_site() {
        let store = HttpKvStore::new("http://127.0.0.1:1").unwrap();
        let app = test_support::app(test_support::state_with_store(Some(Arc::new(store))).await);
        let (status, body) = get_json::<DetailedHealthResponse>(app, "/health/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.snapshots.status, "unhealthy");
        assert_eq!(body.checks.snapshots.store.as_deref(), Some("http"));
    }

    #[tokio::test]
    async fn test_health_detailed_does_not_expose_store_url() {
        let store = HttpKvStore::new("http://127.0.0.1:1/v0/SECRETTOKEN123").unwrap();
        let app = test_support::app(test_support::state_with_store(Some(Arc::new(store))).await);
        let res = app
            .oneshot(empty_request("GET", "/health/detailed", None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(!body.contains("SECRETTOKEN123"), "{body}");
        assert!(!body.contains("/v0/"), "{body}");
        assert!(body.contains("snapshot store unreachable"));
    }

    #[tokio::test]
    async fn test_health_ready_returns_ready() {
        let app = test_support::app(test_support::state().await);
        let (status, body) = get_json::<ReadyResponse>(app, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ready");
    }
}
