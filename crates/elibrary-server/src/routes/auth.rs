//! Authentication routes: register, login, me.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use elibrary_core::catalog::non_blank;
use elibrary_core::{Role, UserId};
use elibrary_store::NewUser;
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthenticatedUser};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub expires_in_hours: u64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl From<AuthenticatedUser> for MeResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            id: user.user_id,
            username: user.username,
            role: user.role,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST /api/auth/register
async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let username = request.username.trim();
    if username.is_empty() || request.password.trim().is_empty() {
        return Err(ApiError::validation("username and password are required"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = auth::hash_password(&request.password)?;
    let user = state
        .repo()
        .insert_user(&NewUser {
            username: username.to_string(),
            password_hash,
            role: Role::User,
            display_name: Some(
                non_blank(request.display_name.as_deref()).unwrap_or_else(|| username.to_string()),
            ),
            avatar_url: non_blank(request.avatar_url.as_deref()),
            bio: non_blank(request.bio.as_deref()),
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            role: user.role,
        }),
    ))
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid username or password".to_string());

    let user = state
        .repo()
        .find_user_by_username(request.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !auth::verify_password(&request.password, &user.password_hash)? {
        tracing::warn!(username = %user.username, "Failed login attempt");
        return Err(invalid());
    }

    let config = state.config();
    let token = auth::create_token(
        user.id,
        &user.username,
        user.role,
        &config.jwt_secret,
        config.jwt_expiry_hours,
    )?;

    tracing::info!(user_id = %user.id, username = %user.username, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        role: user.role,
        expires_in_hours: config.jwt_expiry_hours,
    }))
}

/// GET /api/auth/me and GET /api/me: identity from the token claims.
pub(crate) async fn me(user: AuthenticatedUser) -> Json<MeResponse> {
    Json(MeResponse::from(user))
}

/// Build auth routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}
