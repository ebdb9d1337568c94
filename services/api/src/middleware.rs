//! Authentication middleware for JWT token validation
//!
//! Identity is injected per request: the middleware validates a bearer
//! access token when one is sent and stores the resulting [`AuthUser`] in
//! the request extensions. Handlers ask for it explicitly, either as
//! `AuthUser` (401 when absent) or as `Option<AuthUser>`.

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use subtle::ConstantTimeEq;
use tracing::{error, warn};

use crate::{error::ApiError, jwt::TokenType, models::UserRole, state::AppState};

/// Header carrying the administrative token
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
}

/// Authentication middleware
///
/// Requests without an `Authorization` header pass through anonymously;
/// a header that is malformed or carries an invalid access token is
/// rejected with 401.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = req
        .headers()
        .typed_try_get::<Authorization<Bearer>>()
        .map_err(|_| ApiError::Unauthorized)?;

    if let Some(Authorization(bearer)) = bearer {
        let claims = state
            .jwt_service
            .validate_token_of_type(bearer.token(), TokenType::Access)
            .map_err(|e| {
                warn!("Rejected access token: {}", e);
                ApiError::Unauthorized
            })?;

        let role = claims.role.parse::<UserRole>().map_err(|e| {
            error!("Access token carries an unknown role: {}", e);
            ApiError::Unauthorized
        })?;

        req.extensions_mut().insert(AuthUser {
            id: claims.sub,
            username: claims.username,
            role,
        });
    }

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

/// Guard for the administrative routes
pub async fn admin_middleware(
    State(state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    if !verify_admin_token(state.config.admin_token.as_deref(), presented) {
        warn!("Rejected administrative request to {}", req.uri().path());
        return Err(ApiError::Forbidden("Admin token required.".to_string()));
    }

    Ok(next.run(req).await)
}

/// Constant-time comparison of the presented admin token; always false
/// while no token is configured
pub fn verify_admin_token(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected, presented) {
        (Some(expected), Some(presented)) if !expected.is_empty() => {
            expected.as_bytes().ct_eq(presented.as_bytes()).into()
        }
        _ => false,
    }
}
