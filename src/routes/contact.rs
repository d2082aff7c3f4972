/**
 * Contact Routes
 * Public contact form and the administrator's inbox
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::AdminSession;
use crate::db::models::ContactMessage;
use crate::error::AppError;
use crate::repository::Visibility;
use crate::routes::{JsonBody, SuccessResponse};
use crate::validation::{validate_contact_message, ContactMessageInput};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

/// POST /api/contact - Public contact form submission
pub async fn submit(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ContactMessageInput>,
) -> Result<(StatusCode, Json<ContactMessage>), AppError> {
    let new = validate_contact_message(input)?;
    let message = state.content.create_contact_message(new).await?;
    tracing::info!(id = message.id, "Contact message received");
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/contact/messages - Inbox, newest first (admin)
pub async fn list_messages(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<ContactMessage>>, AppError> {
    let rows = state.content.list_contact_messages(Visibility::All).await?;
    Ok(Json(rows))
}

/// GET /api/contact/unread-count - Badge count for the admin panel
pub async fn unread_count(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let count = state.content.unread_message_count().await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// PUT /api/contact/{id}/read - Mark a message as read (admin)
pub async fn mark_read(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ContactMessage>, AppError> {
    let message = state
        .content
        .mark_message_read(id)
        .await
        .map_err(AppError::from_repo("Message"))?;
    Ok(Json(message))
}

/// DELETE /api/contact/{id} - Remove a message (admin)
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .content
        .delete_contact_message(id)
        .await
        .map_err(AppError::from_repo("Message"))?;
    tracing::info!(id, "Contact message deleted");
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use crate::test_support::{self, empty_request, json_request, send};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_alice_message_read_flow() {
        let app = test_support::app(test_support::state().await);

        let (status, message) = send(
            &app,
            json_request(
                "POST",
                "/api/contact",
                None,
                &json!({ "name": "Alice", "email": "a@x.com", "message": "Hi" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(message["isRead"], false);
        assert_eq!(message["name"], "Alice");

        let cookie = test_support::login(&app).await;
        let (_, unread) = send(
            &app,
            empty_request("GET", "/api/contact/unread-count", Some(&cookie)),
        )
        .await;
        assert_eq!(unread["count"], 1);

        let uri = format!("/api/contact/{}/read", message["id"]);
        let (status, read) = send(&app, empty_request("PUT", &uri, Some(&cookie))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read["isRead"], true);

        let (_, unread) = send(
            &app,
            empty_request("GET", "/api/contact/unread-count", Some(&cookie)),
        )
        .await;
        assert_eq!(unread["count"], 0);
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let app = test_support::app(test_support::state().await);
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/contact",
                None,
                &json!({ "name": "Bob", "email": "not-an-email", "message": "Hi" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_inbox_is_private() {
        let app = test_support::app(test_support::state().await);
        let (status, _) = send(&app, empty_request("GET", "/api/contact/messages", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, empty_request("PUT", "/api/contact/1/read", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_mark_unknown_message_is_not_found() {
        let app = test_support::app(test_support::state().await);
        let cookie = test_support::login(&app).await;
        let (status, body) =
            send(&app, empty_request("PUT", "/api/contact/77/read", Some(&cookie))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Message not found");
    }
}
