//! Review model and the review section of the course page

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

/// Review entity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub rating: i16,
    pub feedback: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review as shown on the course page
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewEntry {
    pub id: i64,
    pub user_username: String,
    pub rating: i16,
    pub feedback: String,
    #[serde(serialize_with = "serialize_review_date")]
    pub created_at: DateTime<Utc>,
}

fn serialize_review_date<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&value.format("%d %B %Y"))
}

/// Review submission request body
///
/// `rating` stays untyped so that a missing, non-numeric or out-of-range
/// value is reported as a field error rather than a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitReviewRequest {
    pub rating: Option<serde_json::Value>,
    pub feedback: Option<String>,
}

/// Why a viewer may not write a review right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    NotAuthenticated,
    NotEnrolled,
    AlreadyReviewed,
}

/// Fields the review form expects
#[derive(Debug, Clone, Serialize)]
pub struct ReviewFormFields {
    pub rating: &'static str,
    pub feedback: &'static str,
}

/// Present on the course page only when the viewer may write a review
#[derive(Debug, Clone, Serialize)]
pub struct WriteReviewSection {
    pub allowed: bool,
    pub message: &'static str,
    pub form_fields: ReviewFormFields,
}

impl WriteReviewSection {
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            message: "You can write a review for this course",
            form_fields: ReviewFormFields {
                rating: "Integer (1-5)",
                feedback: "Optional text",
            },
        }
    }
}

/// Reviews block of the course page
#[derive(Debug, Clone, Serialize)]
pub struct CourseReviews {
    pub existing_reviews: Vec<ReviewEntry>,
    pub write_review: Option<WriteReviewSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ineligible_reason: Option<IneligibleReason>,
}

/// Response to a successful submission
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReviewResponse {
    pub message: &'static str,
    pub review: Review,
}
