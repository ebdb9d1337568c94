//! Education platform API service
//!
//! Registration and token handling, the course catalog, the
//! enrollment-gated review ledger, course authoring and a small
//! administrative surface, served over HTTP with axum.

pub mod config;
pub mod course_detail;
pub mod error;
pub mod extract;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod rate_limiter;
pub mod repositories;
pub mod review_policy;
pub mod routes;
pub mod state;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;
