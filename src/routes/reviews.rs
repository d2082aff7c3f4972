/**
 * Review Routes
 * Visitors submit reviews; only approved ones are shown publicly
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::AdminSession;
use crate::db::models::Review;
use crate::error::AppError;
use crate::repository::Visibility;
use crate::routes::{JsonBody, SuccessResponse};
use crate::validation::{validate_review, ReviewInput};
use crate::AppState;

/// GET /api/reviews - Approved reviews, newest first
pub async fn list_public(State(state): State<AppState>) -> Result<Json<Vec<Review>>, AppError> {
    let rows = state.content.list_reviews(Visibility::Public).await?;
    Ok(Json(rows))
}

/// GET /api/reviews/all - Every review including pending ones (admin)
pub async fn list_all(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<Review>>, AppError> {
    let rows = state.content.list_reviews(Visibility::All).await?;
    Ok(Json(rows))
}

/// POST /api/reviews - Public submission; held for approval
pub async fn submit(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<ReviewInput>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let new = validate_review(input)?;
    let review = state.content.create_review(new).await?;
    tracing::info!(id = review.id, rating = review.rating, "Review submitted");
    Ok((StatusCode::CREATED, Json(review)))
}

/// PATCH /api/reviews/{id}/approve - Publish a review (admin)
pub async fn approve(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Review>, AppError> {
    let review = state
        .content
        .approve_review(id)
        .await
        .map_err(AppError::from_repo("Review"))?;
    tracing::info!(id, "Review approved");
    Ok(Json(review))
}

/// DELETE /api/reviews/{id} - Remove a review (admin)
pub async fn delete(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .content
        .delete_review(id)
        .await
        .map_err(AppError::from_repo("Review"))?;
    tracing::info!(id, "Review deleted");
    Ok(Json(SuccessResponse::ok()))
}
