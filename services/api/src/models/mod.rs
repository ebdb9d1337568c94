//! Storage entities and request/response payloads

pub mod catalog;
pub mod review;
pub mod user;

pub use catalog::{
    AuthorProfile, Course, CourseDetail, CourseLevel, CourseOverview, CourseSummary,
    CurriculumModule, Lesson, LessonDetail, Module, NewCourse, NewLesson, NewModule, VideoSource,
};
pub use review::{CourseReviews, IneligibleReason, Review, ReviewEntry, WriteReviewSection};
pub use user::{LoginIdentifier, NewUser, ProfileFields, ProfileResponse, User, UserRole};
