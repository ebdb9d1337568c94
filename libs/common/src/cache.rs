//! Redis module for the education platform
//!
//! Redis holds short-lived keys only (revoked refresh tokens), so this
//! module exposes an atomic set-if-absent with TTL and a health check.

use anyhow::Result;
use redis::Client;
use tracing::info;

/// Configuration for Redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Redis connection handle
///
/// Connections are opened on demand, so building a pool never touches the
/// network.
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Initialize a new Redis connection pool
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.clone())?;
        info!("Redis client initialized");
        Ok(RedisPool { client })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }

    /// Store `key` only if it is not present yet, expiring after `ttl_seconds`
    ///
    /// Returns `true` when this call created the key. The TTL is at least
    /// one second since `SET ... EX 0` is rejected by Redis.
    pub async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds.max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pool_creation_does_not_connect() -> Result<()> {
        let config = RedisConfig {
            url: "redis://unreachable.invalid:6379".to_string(),
        };

        assert!(RedisPool::new(&config).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let config = RedisConfig {
            url: "not-a-redis-url".to_string(),
        };

        assert!(RedisPool::new(&config).await.is_err());
    }

    #[tokio::test]
    #[ignore = "requires a running Redis instance"]
    async fn test_set_if_absent_only_succeeds_once() -> Result<()> {
        let pool = RedisPool::new(&RedisConfig::from_env()?).await?;
        assert!(pool.health_check().await?);

        let key = format!("edu_test_key:{}", std::process::id());
        assert!(pool.set_if_absent(&key, "1", 5).await?);
        assert!(!pool.set_if_absent(&key, "1", 5).await?);

        // A zero TTL still stores the key briefly
        let short = format!("{}:short", key);
        assert!(pool.set_if_absent(&short, "1", 0).await?);

        Ok(())
    }
}
