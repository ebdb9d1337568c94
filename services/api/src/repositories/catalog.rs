//! Catalog repository: courses, modules and lessons
//!
//! Every write that adds or removes lessons runs in one transaction that
//! first locks the owning course row, then mutates, then recomputes the
//! stored `total_lessons` from the live count. Concurrent mutations of the
//! same course are serialized by the row lock, so the stored count always
//! matches the lessons that exist once the transaction commits.

use common::error::{DatabaseError, DatabaseResult};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::info;

use crate::error::ApiError;
use crate::models::{
    AuthorProfile, Course, CourseSummary, CurriculumModule, Lesson, LessonDetail, Module,
    NewCourse, NewLesson, NewModule,
};

const COURSE_COLUMNS: &str = "id, title, author_id, description, duration, level, course_image, \
                              total_lessons, created_at, updated_at";

/// Why an authoring operation was refused
#[derive(Error, Debug)]
pub enum AuthoringError {
    #[error("{0} not found.")]
    NotFound(&'static str),

    #[error("You do not own this course.")]
    NotOwner,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AuthoringError {
    fn from(err: sqlx::Error) -> Self {
        AuthoringError::Database(err.into())
    }
}

impl From<AuthoringError> for ApiError {
    fn from(err: AuthoringError) -> Self {
        match err {
            AuthoringError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AuthoringError::NotOwner => ApiError::Forbidden(err.to_string()),
            AuthoringError::Database(err) => ApiError::Database(err),
        }
    }
}

/// Lock a course row and check that `author_id` owns it
async fn lock_owned_course(
    conn: &mut PgConnection,
    author_id: i64,
    course_id: Option<i64>,
    what: &'static str,
) -> Result<i64, AuthoringError> {
    let course_id = course_id.ok_or(AuthoringError::NotFound(what))?;

    let owner: Option<Option<i64>> =
        sqlx::query_scalar("SELECT author_id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(course_id)
            .fetch_optional(&mut *conn)
            .await?;

    match owner {
        None => Err(AuthoringError::NotFound(what)),
        Some(owner) if owner == Some(author_id) => Ok(course_id),
        Some(_) => Err(AuthoringError::NotOwner),
    }
}

/// Store the live lesson count of a course and return it
pub async fn recompute_total_lessons(conn: &mut PgConnection, course_id: i64) -> DatabaseResult<i32> {
    let total = sqlx::query_scalar(
        r#"
        UPDATE courses
        SET total_lessons = (
                SELECT COUNT(*)
                FROM lessons l
                JOIN modules m ON m.id = l.module_id
                WHERE m.course_id = $1
            ),
            updated_at = NOW()
        WHERE id = $1
        RETURNING total_lessons
        "#,
    )
    .bind(course_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Catalog repository
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    /// Create a new catalog repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All courses with their author's username
    pub async fn list_courses(&self) -> DatabaseResult<Vec<CourseSummary>> {
        let courses = sqlx::query_as::<_, CourseSummary>(
            r#"
            SELECT c.id, c.title, c.course_image, u.username AS author_username,
                   c.description, c.duration, c.level, c.total_lessons
            FROM courses c
            LEFT JOIN authors a ON a.id = c.author_id
            LEFT JOIN users u ON u.id = a.user_id
            ORDER BY c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(courses)
    }

    /// Find a course by ID
    pub async fn find_course(&self, id: i64) -> DatabaseResult<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    /// Modules of a course with their lessons, both in display order
    pub async fn curriculum(&self, course_id: i64) -> DatabaseResult<Vec<CurriculumModule>> {
        let modules = sqlx::query_as::<_, Module>(
            r#"
            SELECT id, course_id, title, duration, position
            FROM modules
            WHERE course_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let lessons = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT l.id, l.module_id, l.name, l.short_description, l.content,
                   l.video_url, l.uploaded_video, l.position
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE m.course_id = $1
            ORDER BY l.position, l.id
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(group_curriculum(modules, lessons))
    }

    /// Public profile of an author
    pub async fn author_profile(&self, author_id: i64) -> DatabaseResult<Option<AuthorProfile>> {
        let author = sqlx::query_as::<_, AuthorProfile>(
            r#"
            SELECT u.id, u.username, u.about, u.avatar
            FROM authors a
            JOIN users u ON u.id = a.user_id
            WHERE a.id = $1
            "#,
        )
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(author)
    }

    /// A lesson, only if it sits in a module of the given course
    pub async fn find_lesson_in_course(
        &self,
        course_id: i64,
        lesson_id: i64,
    ) -> DatabaseResult<Option<LessonDetail>> {
        let lesson = sqlx::query_as::<_, LessonDetail>(
            r#"
            SELECT l.id, l.name, l.short_description AS description, l.content,
                   l.video_url, l.uploaded_video, m.title AS module
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE l.id = $2 AND m.course_id = $1
            "#,
        )
        .bind(course_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lesson)
    }

    /// Create a course owned by an author
    pub async fn create_course(&self, author_id: i64, course: &NewCourse) -> DatabaseResult<Course> {
        info!("Author {} creating course: {}", author_id, course.title);

        let course = sqlx::query_as::<_, Course>(&format!(
            r#"
            INSERT INTO courses (title, author_id, description, duration, level, course_image)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COURSE_COLUMNS}
            "#
        ))
        .bind(&course.title)
        .bind(author_id)
        .bind(&course.description)
        .bind(&course.duration)
        .bind(course.level.as_str())
        .bind(&course.course_image)
        .fetch_one(&self.pool)
        .await?;

        Ok(course)
    }

    /// Append a module to a course owned by the author
    pub async fn create_module(
        &self,
        author_id: i64,
        course_id: i64,
        module: &NewModule,
    ) -> Result<Module, AuthoringError> {
        let mut tx = self.pool.begin().await?;
        lock_owned_course(&mut tx, author_id, Some(course_id), "Course").await?;

        info!("Adding module '{}' to course {}", module.title, course_id);

        let module = sqlx::query_as::<_, Module>(
            r#"
            INSERT INTO modules (course_id, title, duration, position)
            VALUES ($1, $2, $3, $4)
            RETURNING id, course_id, title, duration, position
            "#,
        )
        .bind(course_id)
        .bind(&module.title)
        .bind(&module.duration)
        .bind(module.position)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(module)
    }

    /// Add a lesson to a module of a course owned by the author
    ///
    /// Returns the lesson and the course's new lesson count.
    pub async fn create_lesson(
        &self,
        author_id: i64,
        module_id: i64,
        lesson: &NewLesson,
    ) -> Result<(Lesson, i32), AuthoringError> {
        let mut tx = self.pool.begin().await?;

        let course_id = sqlx::query_scalar("SELECT course_id FROM modules WHERE id = $1")
            .bind(module_id)
            .fetch_optional(&mut *tx)
            .await?;
        let course_id = lock_owned_course(&mut tx, author_id, course_id, "Module").await?;

        info!("Adding lesson '{}' to module {}", lesson.name, module_id);

        // The module may have been removed while waiting for the course lock
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            INSERT INTO lessons (module_id, name, short_description, content,
                                 video_url, uploaded_video, position)
            SELECT id, $2, $3, $4, $5, $6, $7
            FROM modules
            WHERE id = $1
            RETURNING id, module_id, name, short_description, content,
                      video_url, uploaded_video, position
            "#,
        )
        .bind(module_id)
        .bind(&lesson.name)
        .bind(&lesson.short_description)
        .bind(&lesson.content)
        .bind(lesson.video.video_url())
        .bind(lesson.video.uploaded_video())
        .bind(lesson.position)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AuthoringError::NotFound("Module"))?;

        let total = recompute_total_lessons(&mut tx, course_id).await?;
        tx.commit().await?;

        Ok((lesson, total))
    }

    /// Delete a lesson of a course owned by the author
    ///
    /// Returns the course's new lesson count.
    pub async fn delete_lesson(&self, author_id: i64, lesson_id: i64) -> Result<i32, AuthoringError> {
        let mut tx = self.pool.begin().await?;

        let course_id = sqlx::query_scalar(
            r#"
            SELECT m.course_id
            FROM lessons l
            JOIN modules m ON m.id = l.module_id
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id)
        .fetch_optional(&mut *tx)
        .await?;
        let course_id = lock_owned_course(&mut tx, author_id, course_id, "Lesson").await?;

        info!("Deleting lesson {} of course {}", lesson_id, course_id);

        let deleted = sqlx::query("DELETE FROM lessons WHERE id = $1")
            .bind(lesson_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AuthoringError::NotFound("Lesson"));
        }

        let total = recompute_total_lessons(&mut tx, course_id).await?;
        tx.commit().await?;

        Ok(total)
    }

    /// Delete a module and its lessons from a course owned by the author
    ///
    /// Returns the course's new lesson count.
    pub async fn delete_module(&self, author_id: i64, module_id: i64) -> Result<i32, AuthoringError> {
        let mut tx = self.pool.begin().await?;

        let course_id = sqlx::query_scalar("SELECT course_id FROM modules WHERE id = $1")
            .bind(module_id)
            .fetch_optional(&mut *tx)
            .await?;
        let course_id = lock_owned_course(&mut tx, author_id, course_id, "Module").await?;

        info!("Deleting module {} of course {}", module_id, course_id);

        let deleted = sqlx::query("DELETE FROM modules WHERE id = $1")
            .bind(module_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AuthoringError::NotFound("Module"));
        }

        let total = recompute_total_lessons(&mut tx, course_id).await?;
        tx.commit().await?;

        Ok(total)
    }

    /// Next free position among the modules of a course
    pub async fn next_module_position(&self, course_id: i64) -> DatabaseResult<i32> {
        let position = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM modules WHERE course_id = $1",
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(position)
    }

    /// Next free position among the lessons of a module
    pub async fn next_lesson_position(&self, module_id: i64) -> DatabaseResult<i32> {
        let position = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM lessons WHERE module_id = $1",
        )
        .bind(module_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(position)
    }
}

/// Attach lessons to their modules, keeping both orders
fn group_curriculum(modules: Vec<Module>, lessons: Vec<Lesson>) -> Vec<CurriculumModule> {
    let mut curriculum: Vec<CurriculumModule> = modules
        .into_iter()
        .map(|module| CurriculumModule {
            id: module.id,
            module: module.title,
            duration: module.duration,
            lessons: Vec::new(),
        })
        .collect();

    for lesson in lessons {
        if let Some(module) = curriculum.iter_mut().find(|m| m.id == lesson.module_id) {
            module.lessons.push(lesson.into());
        }
    }

    curriculum
}
