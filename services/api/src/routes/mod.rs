//! API service routes

use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use crate::{
    middleware::{admin_middleware, auth_middleware},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod authoring;
pub mod courses;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let admin_routes = Router::new()
        .route("/admin/users/:id/promote/", post(admin::promote_user))
        .route(
            "/admin/enrollments/",
            post(admin::enroll).delete(admin::unenroll),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/signup/", post(auth::signup))
        .route("/login/", post(auth::login))
        .route("/logout/", post(auth::logout))
        .route("/profile/", get(auth::profile))
        .route("/api/token/", post(auth::obtain_token))
        .route("/api/token/refresh/", post(auth::refresh_token))
        .route("/courses/", get(courses::list_courses))
        .route(
            "/courses/:id/",
            get(courses::course_detail).post(courses::submit_review),
        )
        .route("/courses/:id/:lesson_id/", get(courses::lesson_detail))
        .route("/authoring/courses/", post(authoring::create_course))
        .route(
            "/authoring/courses/:id/modules/",
            post(authoring::create_module),
        )
        .route(
            "/authoring/modules/:id/lessons/",
            post(authoring::create_lesson),
        )
        .route("/authoring/modules/:id/", delete(authoring::delete_module))
        .route("/authoring/lessons/:id/", delete(authoring::delete_lesson))
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint; reports the database and Redis
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match common::database::health_check(&state.db_pool).await {
        Ok(true) => "ok",
        Ok(false) => "unavailable",
        Err(e) => {
            error!("Database health check failed: {}", e);
            "unavailable"
        }
    };

    let cache = match state.redis_pool.health_check().await {
        Ok(true) => "ok",
        Ok(false) => "unavailable",
        Err(e) => {
            error!("Redis health check failed: {}", e);
            "unavailable"
        }
    };

    let (status, label) = if database == "ok" && cache == "ok" {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(json!({
            "status": label,
            "service": "edu-api",
            "database": database,
            "cache": cache,
        })),
    )
}
