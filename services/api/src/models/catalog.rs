//! Course, module and lesson models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::review::CourseReviews;

/// Course difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    All,
    Beginner,
    Intermediate,
    Expert,
}

impl CourseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseLevel::All => "all",
            CourseLevel::Beginner => "beginner",
            CourseLevel::Intermediate => "intermediate",
            CourseLevel::Expert => "expert",
        }
    }
}

impl FromStr for CourseLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(CourseLevel::All),
            "beginner" => Ok(CourseLevel::Beginner),
            "intermediate" => Ok(CourseLevel::Intermediate),
            "expert" => Ok(CourseLevel::Expert),
            other => Err(format!("\"{}\" is not a valid choice.", other)),
        }
    }
}

/// Course entity
#[derive(Debug, Clone, FromRow)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub author_id: Option<i64>,
    pub description: String,
    pub duration: String,
    pub level: String,
    pub course_image: Option<String>,
    pub total_lessons: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Module entity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub duration: String,
    pub position: i32,
}

/// Lesson entity
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Lesson {
    pub id: i64,
    pub module_id: i64,
    pub name: String,
    pub short_description: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub uploaded_video: Option<String>,
    pub position: i32,
}

/// Where a lesson's video comes from; a lesson has exactly one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Link to an externally hosted video
    External(String),
    /// Key of a video asset in the blob store
    Uploaded(String),
}

impl VideoSource {
    pub fn video_url(&self) -> Option<&str> {
        match self {
            VideoSource::External(url) => Some(url),
            VideoSource::Uploaded(_) => None,
        }
    }

    pub fn uploaded_video(&self) -> Option<&str> {
        match self {
            VideoSource::External(_) => None,
            VideoSource::Uploaded(key) => Some(key),
        }
    }
}

/// Entry of the course list
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CourseSummary {
    pub id: i64,
    pub title: String,
    pub course_image: Option<String>,
    pub author_username: Option<String>,
    pub description: String,
    pub duration: String,
    pub level: String,
    pub total_lessons: i32,
}

/// Overview block of the course page
#[derive(Debug, Clone, Serialize)]
pub struct CourseOverview {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub course_image: Option<String>,
    pub duration: String,
    pub level: String,
    pub total_lessons: i32,
}

impl From<Course> for CourseOverview {
    fn from(course: Course) -> Self {
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            course_image: course.course_image,
            duration: course.duration,
            level: course.level,
            total_lessons: course.total_lessons,
        }
    }
}

/// Lesson as listed in the curriculum
#[derive(Debug, Clone, Serialize)]
pub struct CurriculumLesson {
    pub id: i64,
    pub name: String,
    pub short_description: Option<String>,
    pub video_url: Option<String>,
    pub uploaded_video: Option<String>,
    pub content: Option<String>,
}

impl From<Lesson> for CurriculumLesson {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id,
            name: lesson.name,
            short_description: lesson.short_description,
            video_url: lesson.video_url,
            uploaded_video: lesson.uploaded_video,
            content: lesson.content,
        }
    }
}

/// Module with its ordered lessons
#[derive(Debug, Clone, Serialize)]
pub struct CurriculumModule {
    pub id: i64,
    pub module: String,
    pub duration: String,
    pub lessons: Vec<CurriculumLesson>,
}

/// Public profile of a course author
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuthorProfile {
    /// Id of the author's user account
    pub id: i64,
    pub username: String,
    pub about: Option<String>,
    pub avatar: Option<String>,
}

/// Full course page
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    pub overview: CourseOverview,
    pub curriculum: Vec<CurriculumModule>,
    pub author: Option<AuthorProfile>,
    pub reviews: CourseReviews,
}

/// Lesson page
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LessonDetail {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub uploaded_video: Option<String>,
    pub module: String,
}

/// Course creation request body
#[derive(Debug, Clone, Deserialize)]
pub struct NewCourseRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    pub level: Option<String>,
    pub course_image: Option<String>,
}

/// Validated course creation payload
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub level: CourseLevel,
    pub course_image: Option<String>,
}

/// Module creation request body
#[derive(Debug, Clone, Deserialize)]
pub struct NewModuleRequest {
    #[serde(default)]
    pub module: String,
    #[serde(default)]
    pub duration: String,
    pub position: Option<i32>,
}

/// Validated module creation payload
#[derive(Debug, Clone)]
pub struct NewModule {
    pub title: String,
    pub duration: String,
    pub position: i32,
}

/// Lesson creation request body
#[derive(Debug, Clone, Deserialize)]
pub struct NewLessonRequest {
    #[serde(default)]
    pub name: String,
    pub short_description: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub uploaded_video: Option<String>,
    pub position: Option<i32>,
}

/// Validated lesson creation payload
#[derive(Debug, Clone)]
pub struct NewLesson {
    pub name: String,
    pub short_description: Option<String>,
    pub content: Option<String>,
    pub video: VideoSource,
    pub position: i32,
}
