//! Administrative routes: author promotion and enrollment management

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

/// Enrollment request body
#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    pub user_id: i64,
    pub course_id: i64,
}

/// Promote a user to author
pub async fn promote_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    let author_id = state
        .user_repository
        .promote_to_author(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    info!("User {} is author {}", user_id, author_id);

    Ok(Json(json!({
        "user_id": user_id,
        "author_id": author_id,
        "role": "author",
    })))
}

/// Enroll a user in a course
pub async fn enroll(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EnrollmentRequest>,
) -> ApiResult<impl IntoResponse> {
    state
        .user_repository
        .find_by_id(payload.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    state
        .catalog_repository
        .find_course(payload.course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found.".to_string()))?;

    state
        .user_repository
        .enroll(payload.user_id, payload.course_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "user_id": payload.user_id,
            "course_id": payload.course_id,
            "enrolled": true,
        })),
    ))
}

/// Revoke an enrollment
pub async fn unenroll(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EnrollmentRequest>,
) -> ApiResult<impl IntoResponse> {
    let removed = state
        .user_repository
        .unenroll(payload.user_id, payload.course_id)
        .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Enrollment not found.".to_string()))
    }
}
