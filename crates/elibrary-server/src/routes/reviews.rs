//! Review routes.

use axum::{Json, Router, extract::State, routing::get};
use elibrary_core::{BookId, Review};
use serde::Deserialize;

use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::social::{self, ReviewRequest};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReviewListParams {
    pub book_id: BookId,
}

/// POST /api/reviews: one review per user and book; posting again edits it.
async fn upsert_review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<ReviewRequest>,
) -> ApiResult<Json<Review>> {
    Ok(Json(
        social::upsert_review(state.repo(), user.user_id, request).await?,
    ))
}

/// GET /api/reviews?book_id=
async fn list_reviews(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ReviewListParams>,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(
        social::reviews_for_book(state.repo(), params.book_id).await?,
    ))
}

/// GET /api/reviews/book/{id}
async fn list_book_reviews(
    State(state): State<AppState>,
    ApiPath(book_id): ApiPath<BookId>,
) -> ApiResult<Json<Vec<Review>>> {
    Ok(Json(social::reviews_for_book(state.repo(), book_id).await?))
}

/// Build review routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews", get(list_reviews).post(upsert_review))
        .route("/api/reviews/book/{id}", get(list_book_reviews))
}
