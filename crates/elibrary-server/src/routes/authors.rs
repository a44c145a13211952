//! Author routes: public listing and details, admin edits.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use elibrary_core::{Author, AuthorDetails, AuthorId, AuthorSummary};

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::catalog::{self, AuthorListParams, AuthorRequest};
use crate::state::AppState;

/// GET /api/authors?q=&take=
async fn list_authors(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<AuthorListParams>,
) -> ApiResult<Json<Vec<AuthorSummary>>> {
    Ok(Json(catalog::list_authors(state.repo(), params).await?))
}

/// GET /api/authors/{id}
async fn author_details(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<AuthorId>,
) -> ApiResult<Json<AuthorDetails>> {
    Ok(Json(catalog::author_details(state.repo(), id).await?))
}

/// POST /api/authors
async fn create_author(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiJson(request): ApiJson<AuthorRequest>,
) -> ApiResult<(StatusCode, Json<Author>)> {
    let author = catalog::create_author(state.repo(), request).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

/// PUT /api/authors/{id}
async fn update_author(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<AuthorId>,
    ApiJson(request): ApiJson<AuthorRequest>,
) -> ApiResult<Json<Author>> {
    Ok(Json(catalog::update_author(state.repo(), id, request).await?))
}

/// DELETE /api/authors/{id}: refused while any book references the author.
async fn delete_author(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<AuthorId>,
) -> ApiResult<StatusCode> {
    catalog::delete_author(state.repo(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build author routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/authors", get(list_authors).post(create_author))
        .route(
            "/api/authors/{id}",
            get(author_details).put(update_author).delete(delete_author),
        )
}
