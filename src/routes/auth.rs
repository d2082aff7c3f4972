/**
 * Authentication Routes
 * Session-cookie login, logout and current-user lookup for the administrator
 */
use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::auth::extract::{clear_session_cookie, session_cookie, session_token};
use crate::auth::{AdminSession, AuthError};
use crate::error::AppError;
use crate::routes::{JsonBody, SuccessResponse};
use crate::validation::ValidationErrors;
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserInfo,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/login
/// Verify the administrator's credentials and start a session
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip = addr.ip();

    let username = payload.username.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    let mut errors = ValidationErrors::new();
    if username.is_empty() {
        errors.add("username", "is required");
    }
    if password.is_empty() {
        errors.add("password", "is required");
    }
    if !errors.is_empty() {
        return Err(errors.into());
    }

    if !state.throttle.try_begin(ip).await {
        tracing::warn!(ip = %ip, "Login rejected by throttle");
        return Err(AppError::Throttled);
    }

    let session = match state.gate.login(&username, &password).await {
        Ok(session) => session,
        Err(AuthError::InvalidCredentials) => return Err(AppError::InvalidCredentials),
        Err(e) => {
            state.throttle.release(ip).await;
            return Err(e.into());
        }
    };
    state.throttle.record_success(ip).await;

    let cookie = session_cookie(
        &session.token,
        state.gate.ttl().num_seconds(),
        state.config.auth.cookie_secure,
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse {
            success: true,
            user: UserInfo {
                username: session.username,
            },
            expires_at: session.expires_at,
        }),
    ))
}

/// POST /api/logout
/// End the current session (if any) and clear the cookie. Always succeeds.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = session_token(&headers) {
        state.gate.logout(&token).await?;
    }

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            clear_session_cookie(state.config.auth.cookie_secure),
        )]),
        Json(SuccessResponse::ok()),
    ))
}

/// GET /api/auth/user
/// The administrator behind the current session, or 401
pub async fn current_user(AdminSession(identity): AdminSession) -> Json<UserInfo> {
    Json(UserInfo {
        username: identity.username,
    })
}
