//! Account routes outside the auth flow.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get},
};
use elibrary_core::UserId;

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiPath;
use crate::routes::auth::me;
use crate::state::AppState;

/// DELETE /api/users/{id}: removes an account with its loans, reviews,
/// follows and notifications.
async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiPath(id): ApiPath<UserId>,
) -> ApiResult<StatusCode> {
    if admin.user_id == id {
        return Err(ApiError::BadRequest(
            "Admins cannot delete their own account".to_string(),
        ));
    }

    state.repo().delete_user(id).await?;
    tracing::info!(user_id = %id, admin_id = %admin.user_id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Build user routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me))
        .route("/api/users/{id}", delete(delete_user))
}
