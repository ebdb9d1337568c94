//! Registration, login, token and profile routes

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{error, info, warn};

use crate::{
    error::{ApiError, ApiResult, FieldErrors},
    extract::ApiJson,
    jwt::{TokenPair, TokenType},
    middleware::AuthUser,
    models::{
        NewUser, ProfileResponse, User, UserRole,
        user::{LoginRequest, RefreshTokenRequest, RegisterRequest, TokenPairResponse},
    },
    password::{hash_password, verify_dummy, verify_password},
    state::AppState,
    validation::{
        ABOUT_MAX_LENGTH, validate_email, validate_gender, validate_max_length, validate_password,
        validate_password_confirmation, validate_phone_number, validate_username,
    },
};

/// Name of the cookie holding the refresh token
pub const REFRESH_COOKIE: &str = "refresh_token";

fn refresh_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE).path("/").build()
}

fn pair_response(message: &str, pair: TokenPair) -> TokenPairResponse {
    TokenPairResponse {
        message: message.to_string(),
        access: pair.access,
        refresh: pair.refresh,
    }
}

fn issue_pair(state: &AppState, user: &User) -> ApiResult<TokenPair> {
    state.jwt_service.issue_pair(user).map_err(|e| {
        error!("Failed to issue tokens: {}", e);
        ApiError::InternalServerError
    })
}

/// Check a registration request and turn it into a new user
pub fn validate_registration(payload: RegisterRequest) -> ApiResult<NewUser> {
    let mut errors = FieldErrors::new();

    let username = payload.username.trim().to_string();
    let email = payload.email.trim().to_string();

    errors.check("username", validate_username(&username));
    errors.check("email", validate_email(&email));
    errors.check("password", validate_password(&payload.password));
    errors.check(
        "confirm_password",
        validate_password_confirmation(&payload.password, &payload.confirm_password),
    );

    let role = match payload.role.as_deref().map(str::trim) {
        None | Some("") => UserRole::Guest,
        Some(requested) => match requested.parse::<UserRole>() {
            Ok(UserRole::Author) => {
                errors.add("role", "The author role is granted by an administrator.");
                UserRole::Guest
            }
            Ok(role) => role,
            Err(message) => {
                errors.add("role", message);
                UserRole::Guest
            }
        },
    };

    let profile = payload.profile;
    errors.check(
        "about",
        validate_max_length(profile.about.as_deref(), ABOUT_MAX_LENGTH),
    );
    errors.check(
        "phone_number",
        validate_phone_number(profile.phone_number.as_deref()),
    );
    errors.check("gender", validate_gender(profile.gender.as_deref()));

    errors.into_result()?;

    Ok(NewUser {
        username,
        email,
        password: payload.password,
        role,
        profile,
    })
}

/// User registration endpoint
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let new_user = validate_registration(payload)?;

    let password_hash = hash_password(&new_user.password).map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::InternalServerError
    })?;

    let user = state
        .user_repository
        .create(&new_user, &password_hash)
        .await?;

    info!("Registered user {} as {}", user.id, user.role);

    let pair = issue_pair(&state, &user)?;
    let jar = jar.add(refresh_cookie(pair.refresh.clone(), state.config.cookie_secure));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(pair_response("User registered successfully", pair)),
    ))
}

/// Resolve login credentials to a user
///
/// Unknown identifiers and wrong passwords are reported the same way.
async fn authenticate(state: &AppState, payload: &LoginRequest) -> ApiResult<User> {
    let identifier = match payload.identifier() {
        Some(identifier) if !payload.password.is_empty() => identifier,
        identifier => {
            let mut errors = FieldErrors::new();
            if identifier.is_none() {
                errors.add("username", "Username or email is required.");
            }
            if payload.password.is_empty() {
                errors.add("password", "This field is required.");
            }
            return Err(ApiError::Validation(errors));
        }
    };
    let limit_key = identifier.rate_limit_key();

    if !state.rate_limiter.is_allowed(&limit_key).await {
        warn!("Too many login attempts");
        return Err(ApiError::TooManyRequests);
    }

    let Some(user) = state.user_repository.find_by_login(identifier).await? else {
        verify_dummy(&payload.password);
        info!("Login failed: unknown account");
        return Err(ApiError::InvalidCredentials);
    };

    let valid = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!("Failed to verify password of user {}: {}", user.id, e);
        ApiError::InternalServerError
    })?;

    if !valid {
        info!("Login failed: wrong password for user {}", user.id);
        return Err(ApiError::InvalidCredentials);
    }

    state.rate_limiter.reset(&limit_key).await;
    Ok(user)
}

/// User login endpoint
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = authenticate(&state, &payload).await?;
    info!("User {} logged in", user.id);

    let pair = issue_pair(&state, &user)?;
    let jar = jar.add(refresh_cookie(pair.refresh.clone(), state.config.cookie_secure));

    Ok((jar, Json(pair_response("Login successful", pair))))
}

/// Token obtain endpoint for API clients
pub async fn obtain_token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = authenticate(&state, &payload).await?;
    let pair = issue_pair(&state, &user)?;

    Ok(Json(pair_response("Token issued", pair)))
}

/// Refresh token endpoint
///
/// The presented refresh token is revoked and a new pair issued; a token
/// that was already revoked is refused.
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RefreshTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = state
        .jwt_service
        .validate_token_of_type(&payload.refresh, TokenType::Refresh)
        .map_err(|_| ApiError::Unauthorized)?;

    let user = state
        .user_repository
        .find_by_id(claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    let pair = state
        .jwt_service
        .rotate_refresh_token(&state.redis_pool, &user, &claims)
        .await
        .map_err(|e| {
            error!("Failed to rotate refresh token: {}", e);
            ApiError::InternalServerError
        })?
        .ok_or_else(|| {
            warn!("Revoked refresh token presented for user {}", claims.sub);
            ApiError::Unauthorized
        })?;

    let jar = jar.add(refresh_cookie(pair.refresh.clone(), state.config.cookie_secure));

    Ok((jar, Json(pair_response("Token refreshed", pair))))
}

/// Logout endpoint
///
/// Revokes the refresh token held in the cookie. Without a cookie there
/// is nothing to revoke.
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    let Some(cookie) = jar.get(REFRESH_COOKIE) else {
        return Ok((StatusCode::NO_CONTENT, jar));
    };

    let claims = state
        .jwt_service
        .validate_token_of_type(cookie.value(), TokenType::Refresh)
        .ok()
        .filter(|claims| claims.sub == user.id)
        .ok_or_else(|| ApiError::BadRequest("Invalid token.".to_string()))?;

    let newly_revoked = state
        .jwt_service
        .revoke_token(&state.redis_pool, &claims)
        .await
        .map_err(|e| {
            error!("Failed to revoke refresh token: {}", e);
            ApiError::InternalServerError
        })?;
    if !newly_revoked {
        info!("Refresh token of user {} was already revoked", user.id);
    }

    info!("User {} logged out", user.id);

    Ok((StatusCode::NO_CONTENT, jar.remove(removal_cookie())))
}

/// Profile of the authenticated user
pub async fn profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .user_repository
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    let enrolled_courses = state.user_repository.enrolled_course_ids(user.id).await?;

    Ok(Json(ProfileResponse::new(account, enrolled_courses)))
}
