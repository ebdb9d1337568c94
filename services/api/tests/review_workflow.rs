//! End-to-end workflow tests against live PostgreSQL and Redis instances
//!
//! ```text
//! DATABASE_URL=postgresql://... REDIS_URL=redis://... cargo test -p edu-api -- --ignored
//! ```

mod support;

use axum::{Router, http::StatusCode};
use common::database::{DatabaseConfig, init_pool, run_migrations};
use edu_api::{
    create_router,
    models::review::SubmitReviewRequest,
    repositories::{ReviewRepository, SubmitReviewError},
    review_policy::ReviewRejection,
};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use support::{ADMIN_TOKEN, TestRequest, app_config, online_state};

async fn pool() -> PgPool {
    let config = DatabaseConfig::from_env().expect("database config");
    let pool = init_pool(&config).await.expect("database reachable");
    run_migrations(&pool).await.expect("migrations apply");
    pool
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// Register a user and return (user id, access token)
async fn signup(app: &Router, pool: &PgPool, username: &str) -> (i64, String) {
    let response = TestRequest::post("/signup/")
        .json(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "longenough1",
            "confirm_password": "longenough1",
        }))
        .send(app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

    let id: i64 = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_one(pool)
        .await
        .expect("user stored");

    let access = response.body["access"].as_str().expect("access token");
    (id, access.to_string())
}

async fn admin(app: &Router, method: &str, uri: &str, body: Option<Value>) -> StatusCode {
    let mut request = TestRequest::new(method, uri).header("x-admin-token", ADMIN_TOKEN);
    if let Some(body) = body {
        request = request.json(body);
    }
    request.send(app).await.status
}

async fn create_lesson(app: &Router, token: &str, module_id: i64, name: &str) -> Value {
    let response = TestRequest::post(&format!("/authoring/modules/{}/lessons/", module_id))
        .bearer(token)
        .json(json!({
            "name": name,
            "video_url": "https://video.example/lesson",
        }))
        .send(app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_registration_stores_hash_and_rejects_duplicates() {
    let pool = pool().await;
    let app = create_router(online_state(pool.clone(), app_config()).await);
    let username = unique("ana");

    let response = TestRequest::post("/signup/")
        .json(json!({
            "username": username,
            "email": format!("{}@x.com", username),
            "password": "longenough1",
            "confirm_password": "longenough1",
        }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body["access"].is_string());
    assert!(response.body["refresh"].is_string());
    assert!(
        response
            .set_cookie
            .iter()
            .any(|c| c.starts_with("refresh_token=") && c.contains("HttpOnly"))
    );

    let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE username = $1")
        .bind(&username)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_ne!(stored, "longenough1");

    let response = TestRequest::post("/signup/")
        .json(json!({
            "username": username,
            "email": format!("other_{}@x.com", username),
            "password": "longenough1",
            "confirm_password": "longenough1",
        }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["fields"]["username"].is_array());

    // Login by email, then with a wrong password
    let response = TestRequest::post("/login/")
        .json(json!({ "email": format!("{}@x.com", username), "password": "longenough1" }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let wrong = TestRequest::post("/login/")
        .json(json!({ "username": username, "password": "longenough2" }))
        .send(&app)
        .await;
    let unknown = TestRequest::post("/login/")
        .json(json!({ "username": unique("nobody"), "password": "longenough2" }))
        .send(&app)
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body, unknown.body);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_review_workflow_and_lesson_count() {
    let pool = pool().await;
    let app = create_router(online_state(pool.clone(), app_config()).await);

    let (author_user_id, author_token) = signup(&app, &pool, &unique("author")).await;
    let (student_id, student_token) = signup(&app, &pool, &unique("student")).await;

    // Only promoted users may author
    let response = TestRequest::post("/authoring/courses/")
        .bearer(&author_token)
        .json(json!({ "title": "Rust", "description": "Ownership", "duration": "3 weeks" }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let status = admin(&app, "POST", &format!("/admin/users/{}/promote/", author_user_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let response = TestRequest::post("/authoring/courses/")
        .bearer(&author_token)
        .json(json!({
            "title": "Rust",
            "description": "Ownership and borrowing",
            "duration": "3 weeks",
            "level": "beginner",
        }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let course_id = response.body["id"].as_i64().unwrap();

    let response = TestRequest::post(&format!("/authoring/courses/{}/modules/", course_id))
        .bearer(&author_token)
        .json(json!({ "module": "Basics", "duration": "2 hours" }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let module_id = response.body["id"].as_i64().unwrap();

    create_lesson(&app, &author_token, module_id, "Moves").await;
    let second = create_lesson(&app, &author_token, module_id, "Borrows").await;
    assert_eq!(second["total_lessons"], 2);

    // Both video sources at once are refused
    let response = TestRequest::post(&format!("/authoring/modules/{}/lessons/", module_id))
        .bearer(&author_token)
        .json(json!({
            "name": "Lifetimes",
            "video_url": "https://video.example/3",
            "uploaded_video": "lesson_videos/3.mp4",
        }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let lesson_id = second["lesson"]["id"].as_i64().unwrap();
    let response = TestRequest::delete(&format!("/authoring/lessons/{}/", lesson_id))
        .bearer(&author_token)
        .send(&app)
        .await;
    assert_eq!(response.body["total_lessons"], 1);

    // Other users cannot edit the course
    let response = TestRequest::post(&format!("/authoring/courses/{}/modules/", course_id))
        .bearer(&student_token)
        .json(json!({ "module": "Extra", "duration": "1 hour" }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // Not enrolled yet
    let detail = TestRequest::get(&format!("/courses/{}/", course_id))
        .bearer(&student_token)
        .send(&app)
        .await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["author"]["id"], author_user_id);
    assert_eq!(detail.body["overview"]["total_lessons"], 1);
    assert_eq!(detail.body["curriculum"][0]["lessons"].as_array().unwrap().len(), 1);
    assert!(detail.body["reviews"]["write_review"].is_null());
    assert_eq!(detail.body["reviews"]["ineligible_reason"], "not_enrolled");

    let review_uri = format!("/courses/{}/", course_id);
    let response = TestRequest::post(&review_uri)
        .bearer(&student_token)
        .json(json!({ "rating": 5 }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let status = admin(
        &app,
        "POST",
        "/admin/enrollments/",
        Some(json!({ "user_id": student_id, "course_id": course_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let detail = TestRequest::get(&review_uri).bearer(&student_token).send(&app).await;
    assert_eq!(detail.body["reviews"]["write_review"]["allowed"], true);

    for rating in [json!(0), json!(6)] {
        let response = TestRequest::post(&review_uri)
            .bearer(&student_token)
            .json(json!({ "rating": rating }))
            .send(&app)
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    let response = TestRequest::post(&review_uri)
        .bearer(&student_token)
        .json(json!({ "rating": "4", "feedback": "Clear explanations" }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["review"]["rating"], 4);

    let response = TestRequest::post(&review_uri)
        .bearer(&student_token)
        .json(json!({ "rating": 5 }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let detail = TestRequest::get(&review_uri).bearer(&student_token).send(&app).await;
    assert!(detail.body["reviews"]["write_review"].is_null());
    assert_eq!(detail.body["reviews"]["ineligible_reason"], "already_reviewed");
    assert_eq!(
        detail.body["reviews"]["existing_reviews"].as_array().unwrap().len(),
        1
    );

    // Anonymous viewers see the page without a review block
    let detail = TestRequest::get(&review_uri).send(&app).await;
    assert_eq!(detail.status, StatusCode::OK);
    assert_eq!(detail.body["reviews"]["ineligible_reason"], "not_authenticated");

    let profile = TestRequest::get("/profile/").bearer(&student_token).send(&app).await;
    assert_eq!(profile.body["role"], "student");
    assert_eq!(profile.body["enrolled_courses"], json!([course_id]));

    // A lesson is only reachable through its own course
    let kept_lesson_id = detail.body["curriculum"][0]["lessons"][0]["id"]
        .as_i64()
        .unwrap();
    let lesson = TestRequest::get(&format!("/courses/{}/{}/", course_id, kept_lesson_id))
        .send(&app)
        .await;
    assert_eq!(lesson.status, StatusCode::OK);
    assert_eq!(lesson.body["module"], "Basics");

    let response = TestRequest::post("/authoring/courses/")
        .bearer(&author_token)
        .json(json!({ "title": "Other", "description": "Elsewhere", "duration": "1 day" }))
        .send(&app)
        .await;
    let other_course_id = response.body["id"].as_i64().unwrap();
    let lesson = TestRequest::get(&format!("/courses/{}/{}/", other_course_id, kept_lesson_id))
        .send(&app)
        .await;
    assert_eq!(lesson.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_concurrent_submissions_store_one_review() {
    let pool = pool().await;
    let app = create_router(online_state(pool.clone(), app_config()).await);

    let (author_user_id, author_token) = signup(&app, &pool, &unique("author")).await;
    let (student_id, _) = signup(&app, &pool, &unique("student")).await;
    admin(&app, "POST", &format!("/admin/users/{}/promote/", author_user_id), None).await;

    let response = TestRequest::post("/authoring/courses/")
        .bearer(&author_token)
        .json(json!({ "title": "Race", "description": "Conditions", "duration": "1 week" }))
        .send(&app)
        .await;
    let course_id = response.body["id"].as_i64().unwrap();

    admin(
        &app,
        "POST",
        "/admin/enrollments/",
        Some(json!({ "user_id": student_id, "course_id": course_id })),
    )
    .await;

    let repository = ReviewRepository::new(pool.clone());
    let request = SubmitReviewRequest {
        rating: Some(json!(5)),
        feedback: None,
    };

    let (first, second) = tokio::join!(
        repository.submit(student_id, course_id, &request),
        repository.submit(student_id, course_id, &request),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|o| matches!(
        o,
        Err(SubmitReviewError::Rejected(ReviewRejection::AlreadyReviewed))
    )));

    let stored: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE user_id = $1 AND course_id = $2")
            .bind(student_id)
            .bind(course_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, 1);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_email_login_is_not_shadowed_by_username() {
    let pool = pool().await;
    let app = create_router(online_state(pool.clone(), app_config()).await);

    let owner = unique("owner");
    let owner_email = format!("{}@example.com", owner);
    let (owner_id, _) = signup(&app, &pool, &owner).await;

    // A second account whose username is the owner's email address
    let response = TestRequest::post("/signup/")
        .json(json!({
            "username": owner_email,
            "email": format!("{}@x.com", unique("shadow")),
            "password": "otherpass1",
            "confirm_password": "otherpass1",
        }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);

    let response = TestRequest::post("/login/")
        .json(json!({ "email": owner_email, "password": "longenough1" }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);

    let access = response.body["access"].as_str().unwrap().to_string();
    let profile = TestRequest::get("/profile/").bearer(&access).send(&app).await;
    assert_eq!(profile.body["id"], owner_id);

    // The username field still reaches the other account
    let response = TestRequest::post("/login/")
        .json(json!({ "username": owner_email, "password": "otherpass1" }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = TestRequest::post("/login/")
        .json(json!({ "username": owner_email, "password": "longenough1" }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_module_deletion_keeps_lesson_count_and_course_list() {
    let pool = pool().await;
    let app = create_router(online_state(pool.clone(), app_config()).await);

    let author = unique("author");
    let (author_user_id, author_token) = signup(&app, &pool, &author).await;
    admin(&app, "POST", &format!("/admin/users/{}/promote/", author_user_id), None).await;

    let response = TestRequest::post("/authoring/courses/")
        .bearer(&author_token)
        .json(json!({
            "title": "Async Rust",
            "description": "Futures and executors",
            "duration": "2 weeks",
            "level": "intermediate",
        }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let course_id = response.body["id"].as_i64().unwrap();

    let mut module_ids = Vec::new();
    for name in ["Futures", "Executors"] {
        let response = TestRequest::post(&format!("/authoring/courses/{}/modules/", course_id))
            .bearer(&author_token)
            .json(json!({ "module": name, "duration": "1 hour" }))
            .send(&app)
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
        module_ids.push(response.body["id"].as_i64().unwrap());
    }

    create_lesson(&app, &author_token, module_ids[0], "Poll").await;
    create_lesson(&app, &author_token, module_ids[0], "Wake").await;
    let last = create_lesson(&app, &author_token, module_ids[1], "Spawn").await;
    assert_eq!(last["total_lessons"], 3);

    let listed = TestRequest::get("/courses/").send(&app).await;
    assert_eq!(listed.status, StatusCode::OK);
    let entry = listed
        .body
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == course_id)
        .cloned()
        .expect("course is listed");
    assert_eq!(entry["title"], "Async Rust");
    assert_eq!(entry["author_username"], author);
    assert_eq!(entry["description"], "Futures and executors");
    assert_eq!(entry["duration"], "2 weeks");
    assert_eq!(entry["level"], "intermediate");
    assert_eq!(entry["total_lessons"], 3);

    // Removing a module takes its lessons with it
    let response = TestRequest::delete(&format!("/authoring/modules/{}/", module_ids[0]))
        .bearer(&author_token)
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total_lessons"], 1);

    let (stored, live): (i32, i64) = sqlx::query_as(
        r#"
        SELECT c.total_lessons,
               (SELECT COUNT(*) FROM lessons l JOIN modules m ON m.id = l.module_id
                WHERE m.course_id = c.id)
        FROM courses c
        WHERE c.id = $1
        "#,
    )
    .bind(course_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(i64::from(stored), live);
    assert_eq!(live, 1);

    let listed = TestRequest::get("/courses/").send(&app).await;
    let entry = listed
        .body
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == course_id)
        .cloned()
        .unwrap();
    assert_eq!(entry["total_lessons"], 1);

    // The module is gone for good
    let response = TestRequest::delete(&format!("/authoring/modules/{}/", module_ids[0]))
        .bearer(&author_token)
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL and Redis instances"]
async fn test_refresh_token_is_single_use() {
    let pool = pool().await;
    let app = create_router(online_state(pool.clone(), app_config()).await);

    let username = unique("refresh");
    let response = TestRequest::post("/signup/")
        .json(json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "longenough1",
            "confirm_password": "longenough1",
        }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let refresh = response.body["refresh"].as_str().unwrap().to_string();

    let body = json!({ "refresh": refresh });
    let (first, second) = tokio::join!(
        TestRequest::post("/api/token/refresh/").json(body.clone()).send(&app),
        TestRequest::post("/api/token/refresh/").json(body.clone()).send(&app),
    );

    let statuses = [first.status, second.status];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert!(statuses.contains(&StatusCode::UNAUTHORIZED));

    // The rotated token works once more; the original never again
    let rotated = if first.status == StatusCode::OK { first } else { second };
    let next = rotated.body["refresh"].as_str().unwrap();
    let response = TestRequest::post("/api/token/refresh/")
        .json(json!({ "refresh": next }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = TestRequest::post("/api/token/refresh/")
        .json(body)
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
