//! Catalog routes: search, details and admin edits.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use elibrary_core::{Book, BookId, Page};

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::catalog::{self, BookRequest, BookSearchParams};
use crate::state::AppState;

/// GET /api/books?q=&author=&author_id=&genre=&available_only=&page=&page_size=
async fn list_books(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<BookSearchParams>,
) -> ApiResult<Json<Page<Book>>> {
    Ok(Json(catalog::search_books(state.repo(), params).await?))
}

/// GET /api/books/{id} and GET /api/books/{id}/details
async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
) -> ApiResult<Json<Book>> {
    Ok(Json(catalog::get_book(state.repo(), id).await?))
}

/// POST /api/books
async fn create_book(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiJson(request): ApiJson<BookRequest>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let book = catalog::create_book(state.repo(), state.broadcaster(), request).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// PUT /api/books/{id}
async fn update_book(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(request): ApiJson<BookRequest>,
) -> ApiResult<Json<Book>> {
    Ok(Json(catalog::update_book(state.repo(), id, request).await?))
}

/// DELETE /api/books/{id}
async fn delete_book(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiPath(id): ApiPath<BookId>,
) -> ApiResult<StatusCode> {
    catalog::delete_book(state.repo(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build book routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/books", get(list_books).post(create_book))
        .route(
            "/api/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/books/{id}/details", get(get_book))
}
