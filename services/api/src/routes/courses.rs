//! Course catalog and review routes

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::{
    course_detail::assemble,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    middleware::AuthUser,
    models::review::{SubmitReviewRequest, SubmitReviewResponse},
    state::AppState,
};

/// List all courses
pub async fn list_courses(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let courses = state.catalog_repository.list_courses().await?;
    Ok(Json(courses))
}

/// Course page; the review block depends on the viewer
pub async fn course_detail(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    ApiPath(course_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    let detail = assemble(
        &state.catalog_repository,
        &state.review_repository,
        course_id,
        viewer.as_ref(),
    )
    .await?;

    Ok(Json(detail))
}

/// Submit a review for a course
pub async fn submit_review(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<SubmitReviewRequest>,
) -> ApiResult<impl IntoResponse> {
    let review = state
        .review_repository
        .submit(user.id, course_id, &payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitReviewResponse {
            message: "Review submitted successfully.",
            review,
        }),
    ))
}

/// Lesson page; the lesson must belong to the addressed course
pub async fn lesson_detail(
    State(state): State<AppState>,
    ApiPath((course_id, lesson_id)): ApiPath<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    let lesson = state
        .catalog_repository
        .find_lesson_in_course(course_id, lesson_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lesson not found.".to_string()))?;

    Ok(Json(lesson))
}
