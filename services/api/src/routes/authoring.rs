//! Course authoring routes for promoted authors

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::{
    error::{ApiError, ApiResult, FieldErrors},
    extract::{ApiJson, ApiPath},
    middleware::AuthUser,
    models::{
        CourseLevel, NewCourse, NewLesson, NewModule,
        catalog::{NewCourseRequest, NewLessonRequest, NewModuleRequest},
    },
    state::AppState,
    validation::{
        TITLE_MAX_LENGTH, validate_course_duration, validate_module_duration, validate_title,
        validate_video_source,
    },
};

/// Author record of the caller; only promoted users may author
async fn require_author(state: &AppState, user: &AuthUser) -> ApiResult<i64> {
    state
        .user_repository
        .find_author_id(user.id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("Only authors can manage courses.".to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_new_course(payload: NewCourseRequest) -> ApiResult<NewCourse> {
    let mut errors = FieldErrors::new();

    let title = payload.title.trim().to_string();
    errors.check("title", validate_title(&title, TITLE_MAX_LENGTH));
    if payload.description.trim().is_empty() {
        errors.add("description", "This field is required");
    }
    errors.check("duration", validate_course_duration(payload.duration.trim()));

    let level = match payload.level.as_deref() {
        None => CourseLevel::All,
        Some(level) => level.parse().unwrap_or_else(|message: String| {
            errors.add("level", message);
            CourseLevel::All
        }),
    };

    errors.into_result()?;

    Ok(NewCourse {
        title,
        description: payload.description,
        duration: payload.duration.trim().to_string(),
        level,
        course_image: non_empty(payload.course_image),
    })
}

/// Checks a module payload; `position` is filled in by the caller when absent
pub fn validate_new_module(payload: NewModuleRequest, default_position: i32) -> ApiResult<NewModule> {
    let mut errors = FieldErrors::new();

    let title = payload.module.trim().to_string();
    errors.check("module", validate_title(&title, TITLE_MAX_LENGTH));
    errors.check("duration", validate_module_duration(payload.duration.trim()));

    errors.into_result()?;

    Ok(NewModule {
        title,
        duration: payload.duration.trim().to_string(),
        position: payload.position.unwrap_or(default_position),
    })
}

pub fn validate_new_lesson(payload: NewLessonRequest, default_position: i32) -> ApiResult<NewLesson> {
    let mut errors = FieldErrors::new();

    let name = payload.name.trim().to_string();
    errors.check("name", validate_title(&name, TITLE_MAX_LENGTH));

    let video = validate_video_source(
        payload.video_url.as_deref(),
        payload.uploaded_video.as_deref(),
    );
    if let Err(message) = &video {
        errors.add("video_url", message.clone());
    }

    errors.into_result()?;
    let video = video.map_err(|message| ApiError::field("video_url", message))?;

    Ok(NewLesson {
        name,
        short_description: non_empty(payload.short_description),
        content: non_empty(payload.content),
        video,
        position: payload.position.unwrap_or(default_position),
    })
}

/// Create a course owned by the caller
pub async fn create_course(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(payload): ApiJson<NewCourseRequest>,
) -> ApiResult<impl IntoResponse> {
    let author_id = require_author(&state, &user).await?;
    let course = validate_new_course(payload)?;

    let course = state
        .catalog_repository
        .create_course(author_id, &course)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": course.id,
            "title": course.title,
            "duration": course.duration,
            "level": course.level,
            "total_lessons": course.total_lessons,
        })),
    ))
}

/// Add a module to one of the caller's courses
pub async fn create_module(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(course_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<NewModuleRequest>,
) -> ApiResult<impl IntoResponse> {
    let author_id = require_author(&state, &user).await?;

    let position = match payload.position {
        Some(position) => position,
        None => state.catalog_repository.next_module_position(course_id).await?,
    };
    let module = validate_new_module(payload, position)?;

    let module = state
        .catalog_repository
        .create_module(author_id, course_id, &module)
        .await?;

    Ok((StatusCode::CREATED, Json(module)))
}

/// Add a lesson to a module of one of the caller's courses
pub async fn create_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(module_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<NewLessonRequest>,
) -> ApiResult<impl IntoResponse> {
    let author_id = require_author(&state, &user).await?;

    let position = match payload.position {
        Some(position) => position,
        None => state.catalog_repository.next_lesson_position(module_id).await?,
    };
    let lesson = validate_new_lesson(payload, position)?;

    let (lesson, total_lessons) = state
        .catalog_repository
        .create_lesson(author_id, module_id, &lesson)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "lesson": lesson,
            "total_lessons": total_lessons,
        })),
    ))
}

/// Remove a lesson from one of the caller's courses
pub async fn delete_lesson(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(lesson_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    let author_id = require_author(&state, &user).await?;

    let total_lessons = state
        .catalog_repository
        .delete_lesson(author_id, lesson_id)
        .await?;

    Ok(Json(json!({ "total_lessons": total_lessons })))
}

/// Remove a module and its lessons from one of the caller's courses
pub async fn delete_module(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(module_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    let author_id = require_author(&state, &user).await?;

    let total_lessons = state
        .catalog_repository
        .delete_module(author_id, module_id)
        .await?;

    Ok(Json(json!({ "total_lessons": total_lessons })))
}
