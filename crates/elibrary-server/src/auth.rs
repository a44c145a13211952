//! Authentication module: JWT token management and password hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use elibrary_core::{Role, UserId};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// JWT claims.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID (subject).
    pub sub: Uuid,
    /// Username at the time the token was issued.
    pub username: String,
    /// User role ("Admin" or "User").
    pub role: String,
    /// Expiration time (unix timestamp).
    pub exp: usize,
    /// Issued at (unix timestamp).
    pub iat: usize,
}

/// Authenticated user extracted from JWT.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
}

impl AuthenticatedUser {
    /// Check if user is admin.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Check if user is the given user_id or is admin.
    pub fn is_self_or_admin(&self, user_id: UserId) -> bool {
        self.user_id == user_id || self.is_admin()
    }
}

/// An authenticated user holding the admin role. Anyone else is refused
/// with 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

/// Create a JWT token for a user.
pub fn create_token(
    user_id: UserId,
    username: &str,
    role: Role,
    secret: &str,
    expiry_hours: u64,
) -> Result<String, ApiError> {
    let now = chrono::Utc::now();
    let exp = (now + chrono::Duration::hours(expiry_hours as i64)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.0,
        username: username.to_string(),
        role: role.as_str().to_string(),
        exp,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to create token: {}", e)))
}

/// Validate a JWT token and return claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(password_hash.to_string())
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ApiError::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

impl TryFrom<Claims> for AuthenticatedUser {
    type Error = ApiError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {}", e)))?;
        Ok(Self {
            user_id: UserId::from_uuid(claims.sub),
            username: claims.username,
            role,
        })
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Authorization header must be Bearer <token>".to_string())
        })?;

        let claims = validate_token(token.trim(), &state.config().jwt_secret)?;
        AuthenticatedUser::try_from(claims)
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_against_garbage_hash() {
        assert!(verify_password("whatever", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_create_and_validate_token() {
        let secret = "test_secret_key_12345";
        let user_id = UserId::new();

        let token = create_token(user_id, "alice", Role::Admin, secret, 24).unwrap();
        let claims = validate_token(&token, secret).unwrap();

        assert_eq!(claims.sub, user_id.0);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, "Admin");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_validate_token_wrong_secret() {
        let token = create_token(UserId::new(), "bob", Role::User, "secret1", 24).unwrap();
        let result = validate_token(&token, "secret2");
        assert!(result.is_err());
    }

    #[test]
    fn test_claims_to_user() {
        let id = Uuid::new_v4();
        let user = AuthenticatedUser::try_from(Claims {
            sub: id,
            username: "carol".to_string(),
            role: "User".to_string(),
            exp: 0,
            iat: 0,
        })
        .unwrap();
        assert_eq!(user.user_id.0, id);
        assert!(!user.is_admin());
    }

    #[test]
    fn test_claims_with_unknown_role_rejected() {
        let result = AuthenticatedUser::try_from(Claims {
            sub: Uuid::new_v4(),
            username: "mallory".to_string(),
            role: "superuser".to_string(),
            exp: 0,
            iat: 0,
        });
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_authenticated_user_is_self_or_admin() {
        let uid = UserId::new();
        let user = AuthenticatedUser {
            user_id: uid,
            username: "dave".to_string(),
            role: Role::User,
        };
        assert!(user.is_self_or_admin(uid));
        assert!(!user.is_self_or_admin(UserId::new()));

        let admin = AuthenticatedUser {
            role: Role::Admin,
            ..user
        };
        assert!(admin.is_self_or_admin(UserId::new()));
    }
}
