//! Course page assembly
//!
//! Composes catalog data, the author's public profile and the review
//! block for one viewer. Eligibility is computed on every request.

use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::models::{CourseDetail, CourseOverview};
use crate::repositories::{CatalogRepository, ReviewRepository};
use crate::review_policy::course_reviews;

/// Build the course page for `course_id` as seen by `viewer`
pub async fn assemble(
    catalog: &CatalogRepository,
    reviews: &ReviewRepository,
    course_id: i64,
    viewer: Option<&AuthUser>,
) -> ApiResult<CourseDetail> {
    let course = catalog
        .find_course(course_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Course not found.".to_string()))?;

    let curriculum = catalog.curriculum(course.id).await?;

    let author = match course.author_id {
        Some(author_id) => catalog.author_profile(author_id).await?,
        None => None,
    };

    let existing_reviews = reviews.list_for_course(course.id).await?;

    let eligibility = match viewer {
        Some(viewer) => {
            let facts = reviews.eligibility(viewer.id, course.id).await?;
            debug!(
                "Viewer {} on course {}: enrolled={}, reviewed={}",
                viewer.id, course.id, facts.is_enrolled, facts.has_reviewed
            );
            Some(facts)
        }
        None => None,
    };

    Ok(CourseDetail {
        overview: CourseOverview::from(course),
        curriculum,
        author,
        reviews: course_reviews(existing_reviews, eligibility),
    })
}
