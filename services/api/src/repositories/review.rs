//! Review ledger repository

use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgExecutor, PgPool};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::models::{Review, ReviewEntry};
use crate::models::review::SubmitReviewRequest;
use crate::review_policy::{ReviewEligibility, ReviewRejection, check_submission};

/// Why a review submission failed
#[derive(Error, Debug)]
pub enum SubmitReviewError {
    #[error("Course not found.")]
    CourseNotFound,

    #[error(transparent)]
    Rejected(#[from] ReviewRejection),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for SubmitReviewError {
    fn from(err: sqlx::Error) -> Self {
        let constraint = common::error::unique_violation(&err).map(str::to_owned);
        match constraint.as_deref() {
            Some("reviews_user_course_key") => {
                SubmitReviewError::Rejected(ReviewRejection::AlreadyReviewed)
            }
            _ => SubmitReviewError::Database(err.into()),
        }
    }
}

impl From<SubmitReviewError> for ApiError {
    fn from(err: SubmitReviewError) -> Self {
        match err {
            SubmitReviewError::CourseNotFound => ApiError::NotFound(err.to_string()),
            SubmitReviewError::Rejected(rejection) => rejection.into(),
            SubmitReviewError::Database(err) => ApiError::Database(err),
        }
    }
}

async fn fetch_eligibility<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    course_id: i64,
) -> Result<ReviewEligibility, sqlx::Error> {
    let (is_enrolled, has_reviewed): (bool, bool) = sqlx::query_as(
        r#"
        SELECT EXISTS (SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2),
               EXISTS (SELECT 1 FROM reviews WHERE user_id = $1 AND course_id = $2)
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(executor)
    .await?;

    Ok(ReviewEligibility::new(is_enrolled, has_reviewed))
}

/// Review repository
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    /// Create a new review repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reviews of a course, newest first
    pub async fn list_for_course(&self, course_id: i64) -> DatabaseResult<Vec<ReviewEntry>> {
        let reviews = sqlx::query_as::<_, ReviewEntry>(
            r#"
            SELECT r.id, u.username AS user_username, r.rating, r.feedback, r.created_at
            FROM reviews r
            JOIN users u ON u.id = r.user_id
            WHERE r.course_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// Current enrollment and review facts for a (user, course) pair
    pub async fn eligibility(
        &self,
        user_id: i64,
        course_id: i64,
    ) -> DatabaseResult<ReviewEligibility> {
        Ok(fetch_eligibility(&self.pool, user_id, course_id).await?)
    }

    /// Validate and store a review in one transaction
    ///
    /// The eligibility facts are read again inside the transaction; a
    /// concurrent submission that wins the race surfaces here as a unique
    /// violation and is reported as an existing review.
    pub async fn submit(
        &self,
        user_id: i64,
        course_id: i64,
        request: &SubmitReviewRequest,
    ) -> Result<Review, SubmitReviewError> {
        let mut tx = self.pool.begin().await?;

        let course_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM courses WHERE id = $1)")
                .bind(course_id)
                .fetch_one(&mut *tx)
                .await?;
        if !course_exists {
            return Err(SubmitReviewError::CourseNotFound);
        }

        let facts = fetch_eligibility(&mut *tx, user_id, course_id).await?;
        let draft = check_submission(facts, request.rating.as_ref(), request.feedback.as_deref())
            .inspect_err(|rejection| {
                warn!(
                    "Review by user {} for course {} rejected: {}",
                    user_id, course_id, rejection
                )
            })?;

        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (user_id, course_id, rating, feedback)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, course_id, rating, feedback, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(draft.rating)
        .bind(&draft.feedback)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            "User {} reviewed course {} with rating {}",
            user_id, course_id, review.rating
        );

        Ok(review)
    }
}
