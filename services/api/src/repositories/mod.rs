//! Repositories for database operations

pub mod catalog;
pub mod review;
pub mod user;

pub use catalog::{AuthoringError, CatalogRepository};
pub use review::{ReviewRepository, SubmitReviewError};
pub use user::{RegistrationError, UserRepository};
