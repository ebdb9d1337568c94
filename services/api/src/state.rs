//! Application state shared across handlers

use std::sync::Arc;

use common::cache::RedisPool;
use sqlx::PgPool;

use crate::{
    config::AppConfig,
    jwt::JwtService,
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::{CatalogRepository, ReviewRepository, UserRepository},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub redis_pool: RedisPool,
    pub jwt_service: JwtService,
    pub user_repository: UserRepository,
    pub catalog_repository: CatalogRepository,
    pub review_repository: ReviewRepository,
    pub rate_limiter: RateLimiter,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire repositories and services around the shared pools
    pub fn new(
        db_pool: PgPool,
        redis_pool: RedisPool,
        jwt_service: JwtService,
        config: AppConfig,
    ) -> Self {
        Self {
            user_repository: UserRepository::new(db_pool.clone()),
            catalog_repository: CatalogRepository::new(db_pool.clone()),
            review_repository: ReviewRepository::new(db_pool.clone()),
            rate_limiter: RateLimiter::new(RateLimiterConfig::from(&config)),
            config: Arc::new(config),
            db_pool,
            redis_pool,
            jwt_service,
        }
    }
}
