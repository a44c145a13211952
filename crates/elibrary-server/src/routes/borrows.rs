//! Loan routes: borrow, return, renew and the two listings.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use elibrary_core::{BookId, Borrow, BorrowId};
use elibrary_store::LoanFilter;
use serde::Deserialize;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::lending::{self, BorrowView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BorrowRequest {
    pub book_id: BookId,
    pub notes: Option<String>,
}

/// POST /api/borrows
async fn borrow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<BorrowRequest>,
) -> ApiResult<(StatusCode, Json<Borrow>)> {
    let borrow = lending::borrow(
        state.repo(),
        state.policy(),
        &user,
        request.book_id,
        request.notes,
        Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// POST /api/borrows/{id}/return
async fn return_book(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<BorrowId>,
) -> ApiResult<Json<Borrow>> {
    Ok(Json(
        lending::return_book(state.repo(), &user, id, Utc::now()).await?,
    ))
}

/// POST /api/borrows/{id}/renew
async fn renew(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<BorrowId>,
) -> ApiResult<Json<Borrow>> {
    Ok(Json(
        lending::renew(state.repo(), state.policy(), &user, id, Utc::now()).await?,
    ))
}

/// GET /api/borrows/me
async fn my_borrows(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<BorrowView>>> {
    Ok(Json(
        lending::my_borrows(state.repo(), &user, Utc::now()).await?,
    ))
}

/// GET /api/borrows?status=&user_id=&book_id=
async fn all_borrows(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    ApiQuery(filter): ApiQuery<LoanFilter>,
) -> ApiResult<Json<Vec<BorrowView>>> {
    Ok(Json(
        lending::all_borrows(state.repo(), &filter, Utc::now()).await?,
    ))
}

/// Build loan routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/borrows", get(all_borrows).post(borrow))
        .route("/api/borrows/me", get(my_borrows))
        .route("/api/borrows/{id}/return", post(return_book))
        .route("/api/borrows/{id}/renew", post(renew))
}

#[cfg(test)]
mod tests {
    use super::*;
    use elibrary_core::BorrowStatus;

    #[test]
    fn test_loan_filter_from_query() {
        let filter: LoanFilter = serde_urlencoded::from_str("status=Overdue").unwrap();
        assert_eq!(filter.status, Some(BorrowStatus::Overdue));
        assert!(filter.user_id.is_none());
    }

    #[test]
    fn test_borrow_request_notes_optional() {
        let request: BorrowRequest =
            serde_json::from_str(r#"{"book_id":"00000000-0000-0000-0000-000000000000"}"#).unwrap();
        assert!(request.notes.is_none());
    }
}
