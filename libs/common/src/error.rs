//! Custom error types for the common library
//!
//! This module defines storage-level error types shared by every service
//! of the education platform.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::Query(err)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Return the violated constraint name when `err` is a unique violation
/// (SQLSTATE 23505).
///
/// A violation reported without a constraint name yields `Some("")`.
pub fn unique_violation(err: &SqlxError) -> Option<&str> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    Some(db_err.constraint().unwrap_or(""))
}

/// Whether `err` is a unique constraint violation
pub fn is_unique_violation(err: &SqlxError) -> bool {
    unique_violation(err).is_some()
}
