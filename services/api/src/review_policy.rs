//! Review eligibility and submission rules
//!
//! A viewer may write a review for a course when enrolled in it and not
//! having reviewed it yet. Eligibility is computed per request from live
//! facts and never stored. The same facts are re-read inside the
//! submission transaction, and the `(user, course)` unique constraint of
//! the ledger is the final arbiter between concurrent submissions.

use serde_json::Value;
use thiserror::Error;

use crate::error::ApiError;
use crate::models::{CourseReviews, IneligibleReason, ReviewEntry, WriteReviewSection};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;
pub const FEEDBACK_MAX_CHARS: usize = 1000;

/// Live facts about a (viewer, course) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewEligibility {
    pub is_enrolled: bool,
    pub has_reviewed: bool,
}

impl ReviewEligibility {
    pub fn new(is_enrolled: bool, has_reviewed: bool) -> Self {
        Self {
            is_enrolled,
            has_reviewed,
        }
    }

    pub fn can_write_review(&self) -> bool {
        self.is_enrolled && !self.has_reviewed
    }

    /// Reason the viewer is not allowed; an existing review wins over a
    /// missing enrollment
    pub fn ineligible_reason(&self) -> Option<IneligibleReason> {
        if self.has_reviewed {
            Some(IneligibleReason::AlreadyReviewed)
        } else if !self.is_enrolled {
            Some(IneligibleReason::NotEnrolled)
        } else {
            None
        }
    }
}

/// Build the reviews block of a course page. `None` eligibility means an
/// anonymous viewer.
pub fn course_reviews(
    existing_reviews: Vec<ReviewEntry>,
    eligibility: Option<ReviewEligibility>,
) -> CourseReviews {
    let (write_review, ineligible_reason) = match eligibility {
        Some(facts) if facts.can_write_review() => (Some(WriteReviewSection::allowed()), None),
        Some(facts) => (None, facts.ineligible_reason()),
        None => (None, Some(IneligibleReason::NotAuthenticated)),
    };

    CourseReviews {
        existing_reviews,
        write_review,
        ineligible_reason,
    }
}

/// Why a submission was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewRejection {
    #[error("You have already reviewed this course.")]
    AlreadyReviewed,

    #[error("Rating must be between 1 and 5.")]
    InvalidRating,

    #[error("Feedback must be at most 1000 characters.")]
    FeedbackTooLong,

    #[error("You must be enrolled in this course to leave a review.")]
    NotEnrolled,
}

impl From<ReviewRejection> for ApiError {
    fn from(rejection: ReviewRejection) -> Self {
        let message = rejection.to_string();
        match rejection {
            ReviewRejection::AlreadyReviewed => ApiError::Conflict(message),
            ReviewRejection::InvalidRating => ApiError::field("rating", message),
            ReviewRejection::FeedbackTooLong => ApiError::field("feedback", message),
            ReviewRejection::NotEnrolled => ApiError::Forbidden(message),
        }
    }
}

/// A submission that passed every check and can be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub rating: i16,
    pub feedback: String,
}

/// Parse a rating given as a JSON integer or an integer string
pub fn parse_rating(value: Option<&Value>) -> Option<i16> {
    let rating = match value? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        i16::try_from(rating).ok()
    } else {
        None
    }
}

/// Apply the submission rules in order: duplicate review, malformed
/// input, missing enrollment.
pub fn check_submission(
    facts: ReviewEligibility,
    rating: Option<&Value>,
    feedback: Option<&str>,
) -> Result<ReviewDraft, ReviewRejection> {
    if facts.has_reviewed {
        return Err(ReviewRejection::AlreadyReviewed);
    }

    let rating = parse_rating(rating).ok_or(ReviewRejection::InvalidRating)?;

    let feedback = feedback.unwrap_or_default();
    if feedback.chars().count() > FEEDBACK_MAX_CHARS {
        return Err(ReviewRejection::FeedbackTooLong);
    }

    if !facts.is_enrolled {
        return Err(ReviewRejection::NotEnrolled);
    }

    Ok(ReviewDraft {
        rating,
        feedback: feedback.to_string(),
    })
}
