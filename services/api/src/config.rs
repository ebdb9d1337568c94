//! Service settings
//!
//! Built-in defaults overridden by `EDU_`-prefixed environment variables,
//! e.g. `EDU_HTTP_ADDR=127.0.0.1:8080` or `EDU_COOKIE_SECURE=true`.

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

/// Service settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    pub http_addr: String,
    /// Token guarding the administrative routes; disabled when unset
    pub admin_token: Option<String>,
    /// Whether the refresh cookie is marked `Secure`
    pub cookie_secure: bool,
    /// Failed login attempts tolerated per identifier within the window
    pub login_max_attempts: u32,
    pub login_window_seconds: u64,
    pub login_ban_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:3001".to_string(),
            admin_token: None,
            cookie_secure: false,
            login_max_attempts: 5,
            login_window_seconds: 300,
            login_ban_seconds: 900,
        }
    }
}

impl AppConfig {
    /// Load settings from the environment
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();

        let settings = Config::builder()
            .set_default("http_addr", defaults.http_addr)?
            .set_default("cookie_secure", defaults.cookie_secure)?
            .set_default("login_max_attempts", i64::from(defaults.login_max_attempts))?
            .set_default("login_window_seconds", defaults.login_window_seconds as i64)?
            .set_default("login_ban_seconds", defaults.login_ban_seconds as i64)?
            .add_source(Environment::with_prefix("EDU").try_parsing(true))
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        config.admin_token = config.admin_token.filter(|token| !token.is_empty());

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 6] = [
        "EDU_HTTP_ADDR",
        "EDU_ADMIN_TOKEN",
        "EDU_COOKIE_SECURE",
        "EDU_LOGIN_MAX_ATTEMPTS",
        "EDU_LOGIN_WINDOW_SECONDS",
        "EDU_LOGIN_BAN_SECONDS",
    ];

    fn clear_env() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.http_addr, "0.0.0.0:3001");
        assert!(config.admin_token.is_none());
        assert!(!config.cookie_secure);
        assert_eq!(config.login_max_attempts, 5);
        assert_eq!(config.login_window_seconds, 300);
        assert_eq!(config.login_ban_seconds, 900);
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear_env();
        unsafe {
            env::set_var("EDU_HTTP_ADDR", "127.0.0.1:8080");
            env::set_var("EDU_ADMIN_TOKEN", "s3cret");
            env::set_var("EDU_COOKIE_SECURE", "true");
            env::set_var("EDU_LOGIN_MAX_ATTEMPTS", "3");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.http_addr, "127.0.0.1:8080");
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
        assert!(config.cookie_secure);
        assert_eq!(config.login_max_attempts, 3);
        assert_eq!(config.login_window_seconds, 300);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_empty_admin_token_disables_admin() {
        clear_env();
        unsafe {
            env::set_var("EDU_ADMIN_TOKEN", "");
        }

        let config = AppConfig::from_env().unwrap();
        assert!(config.admin_token.is_none());

        clear_env();
    }
}
