//! Author follow routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use elibrary_core::{AuthorId, FollowedAuthor};
use serde::Serialize;

use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath};
use crate::services::social::{self, AuthorKey, FollowRequest};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub followed: bool,
    pub author_id: AuthorId,
    pub name: String,
}

/// GET /api/follows
async fn list_follows(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<FollowedAuthor>>> {
    Ok(Json(social::follows(state.repo(), user.user_id).await?))
}

/// POST /api/follows with `{"author_id"}` or `{"author_name"}`.
async fn follow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<FollowRequest>,
) -> ApiResult<Json<FollowResponse>> {
    let key = AuthorKey::try_from(request)?;
    let author = social::follow(state.repo(), user.user_id, key).await?;
    Ok(Json(FollowResponse {
        followed: true,
        author_id: author.id,
        name: author.name,
    }))
}

/// DELETE /api/follows/{key}: key is an author id or an author name.
async fn unfollow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(key): ApiPath<String>,
) -> ApiResult<StatusCode> {
    social::unfollow(state.repo(), user.user_id, AuthorKey::parse(&key)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build follow routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/follows", get(list_follows).post(follow))
        .route("/api/follows/{key}", delete(unfollow))
}
