//! Reader profile route.

use axum::{Json, Router, extract::State, routing::get};

use crate::auth::AuthenticatedUser;
use crate::error::ApiResult;
use crate::services::profile::{self, ProfileResponse};
use crate::state::AppState;

/// GET /api/profile/me
async fn my_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<ProfileResponse>> {
    Ok(Json(
        profile::reader_profile(state.repo(), user.user_id).await?,
    ))
}

/// Build profile routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/profile/me", get(my_profile))
}
