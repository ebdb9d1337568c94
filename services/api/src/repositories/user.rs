//! User repository for database operations

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::error::{ApiError, FieldErrors};
use crate::models::{LoginIdentifier, NewUser, User, UserRole};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, avatar, about, birthday, \
                            phone_number, gender, created_at, updated_at";

/// Why an account could not be created
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("username or email already registered")]
    Duplicate { username: bool, email: bool },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for RegistrationError {
    fn from(err: sqlx::Error) -> Self {
        let constraint = common::error::unique_violation(&err).map(str::to_owned);
        match constraint.as_deref() {
            Some("users_username_key") => RegistrationError::Duplicate {
                username: true,
                email: false,
            },
            Some("users_email_key") => RegistrationError::Duplicate {
                username: false,
                email: true,
            },
            _ => RegistrationError::Database(err.into()),
        }
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Duplicate { username, email } => {
                let mut fields = FieldErrors::new();
                if username {
                    fields.add("username", "A user with that username already exists.");
                }
                if email {
                    fields.add("email", "A user with that email already exists.");
                }
                ApiError::Validation(fields)
            }
            RegistrationError::Database(err) => ApiError::Database(err),
        }
    }
}

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with an already hashed password
    ///
    /// Uniqueness is checked up front so both clashes are reported at once;
    /// the unique constraints still decide between concurrent signups.
    pub async fn create(
        &self,
        new_user: &NewUser,
        password_hash: &str,
    ) -> Result<User, RegistrationError> {
        info!("Creating new user: {}", new_user.username);

        let mut tx = self.pool.begin().await?;

        let (username_taken, email_taken): (bool, bool) = sqlx::query_as(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE username = $1),
                   EXISTS (SELECT 1 FROM users WHERE email = $2)
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .fetch_one(&mut *tx)
        .await?;

        if username_taken || email_taken {
            return Err(RegistrationError::Duplicate {
                username: username_taken,
                email: email_taken,
            });
        }

        let profile = &new_user.profile;
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, role, avatar, about, birthday,
                               phone_number, gender)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(password_hash)
        .bind(new_user.role.as_str())
        .bind(&profile.avatar)
        .bind(&profile.about)
        .bind(profile.birthday)
        .bind(&profile.phone_number)
        .bind(&profile.gender)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    /// Find the user a login names, matching only the field it was given
    pub async fn find_by_login(
        &self,
        identifier: LoginIdentifier<'_>,
    ) -> DatabaseResult<Option<User>> {
        match identifier {
            LoginIdentifier::Username(username) => self.find_by_username(username).await,
            LoginIdentifier::Email(email) => self.find_by_email(email).await,
        }
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// IDs of the courses a user is enrolled in
    pub async fn enrolled_course_ids(&self, user_id: i64) -> DatabaseResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT course_id FROM enrollments WHERE user_id = $1 ORDER BY course_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Author record of a user, if promoted
    pub async fn find_author_id(&self, user_id: i64) -> DatabaseResult<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM authors WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(id)
    }

    /// Promote a user to author and return the author record id
    ///
    /// Idempotent; returns `None` when the user does not exist.
    pub async fn promote_to_author(&self, user_id: i64) -> DatabaseResult<Option<i64>> {
        info!("Promoting user {} to author", user_id);

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(UserRole::Author.as_str())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let author_id = sqlx::query_scalar(
            r#"
            INSERT INTO authors (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            "#,
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(author_id))
    }

    /// Enroll a user in a course; a guest becomes a student
    ///
    /// Idempotent. Both rows must exist.
    pub async fn enroll(&self, user_id: i64, course_id: i64) -> DatabaseResult<()> {
        info!("Enrolling user {} in course {}", user_id, course_id);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO enrollments (user_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 AND role = $3")
            .bind(user_id)
            .bind(UserRole::Student.as_str())
            .bind(UserRole::Guest.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Revoke an enrollment; returns whether one existed
    pub async fn unenroll(&self, user_id: i64, course_id: i64) -> DatabaseResult<bool> {
        info!("Removing enrollment of user {} in course {}", user_id, course_id);

        let result = sqlx::query("DELETE FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_field_errors() {
        let err = ApiError::from(RegistrationError::Duplicate {
            username: true,
            email: true,
        });

        match err {
            ApiError::Validation(fields) => {
                assert!(fields.get("username").is_some());
                assert!(fields.get("email").is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_unique_driver_error_is_internal() {
        let err = RegistrationError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RegistrationError::Database(_)));
        assert!(matches!(ApiError::from(err), ApiError::Database(_)));
    }
}
