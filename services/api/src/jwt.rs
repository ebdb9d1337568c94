//! JWT service for token generation, validation, and revocation
//!
//! This module issues RS256 access and refresh tokens for platform users
//! and keeps a revocation list of refresh tokens in Redis, keyed by the
//! token id (`jti`) and kept only for the token's remaining lifetime.
//! Revocation is a single `SET NX`, which makes each refresh token
//! single-use even under concurrent refreshes.

use anyhow::Result;
use common::cache::RedisPool;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use uuid::Uuid;

use crate::models::User;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Private key for signing tokens
    pub private_key: String,
    /// Public key for verifying tokens
    pub public_key: String,
    /// Access token expiration time in seconds (default: 30 minutes)
    pub access_token_expiry: u64,
    /// Refresh token expiration time in seconds (default: 1 day)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Create a new JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY`: Private key for signing tokens (PEM format) or path to private key file
    /// - `JWT_PUBLIC_KEY`: Public key for verifying tokens (PEM format) or path to public key file
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: Access token expiry in seconds (default: 1800)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: Refresh token expiry in seconds (default: 86400)
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var("JWT_PRIVATE_KEY")
            .map_err(|_| anyhow::anyhow!("JWT_PRIVATE_KEY environment variable not set"))?;
        let private_key = read_key(private_key)
            .map_err(|e| anyhow::anyhow!("Failed to read private key file: {}", e))?;

        let public_key = std::env::var("JWT_PUBLIC_KEY")
            .map_err(|_| anyhow::anyhow!("JWT_PUBLIC_KEY environment variable not set"))?;
        let public_key = read_key(public_key)
            .map_err(|e| anyhow::anyhow!("Failed to read public key file: {}", e))?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "1800".to_string())
            .parse()
            .unwrap_or(1800);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| "86400".to_string())
            .parse()
            .unwrap_or(86400);

        Ok(JwtConfig {
            private_key,
            public_key,
            access_token_expiry,
            refresh_token_expiry,
        })
    }
}

/// Inline PEM is used as is; anything else is a path, tried relative to the
/// working directory and then to the crate root
fn read_key(value: String) -> std::io::Result<String> {
    if value.starts_with("-----BEGIN") {
        return Ok(value);
    }

    std::fs::read_to_string(&value)
        .or_else(|_| {
            let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
            path.push(&value);
            std::fs::read_to_string(path)
        })
        .map(|key| key.trim().to_string())
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: i64,
    /// Username at issue time
    pub username: String,
    /// Role at issue time
    pub role: String,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
    /// Token id, used for revocation
    pub jti: Uuid,
    /// Token type (access or refresh)
    pub token_type: TokenType,
}

/// Token type enum
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub enum TokenType {
    /// Access token
    Access,
    /// Refresh token
    Refresh,
}

/// Access and refresh token issued together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn now_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs())
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize a new JWT service
    pub fn new(config: JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    fn generate_token(&self, user: &User, token_type: TokenType, lifetime: u64) -> Result<String> {
        let now = now_secs()?;

        let claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            iat: now,
            exp: now + lifetime,
            jti: Uuid::new_v4(),
            token_type,
        };

        let token = encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> Result<String> {
        self.generate_token(user, TokenType::Access, self.config.access_token_expiry)
    }

    /// Generate a refresh token for a user
    pub fn generate_refresh_token(&self, user: &User) -> Result<String> {
        self.generate_token(user, TokenType::Refresh, self.config.refresh_token_expiry)
    }

    /// Generate an access/refresh pair for a user
    pub fn issue_pair(&self, user: &User) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.generate_access_token(user)?,
            refresh: self.generate_refresh_token(user)?,
        })
    }

    /// Validate a token and return the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Validate a token that must be of the given type
    pub fn validate_token_of_type(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(anyhow::anyhow!("Token is not a {:?} token", expected));
        }
        Ok(claims)
    }

    /// Revoke a token for the rest of its lifetime
    ///
    /// Returns `false` when the token was already revoked. The check and
    /// the write are one Redis command, so of two concurrent calls for the
    /// same token exactly one returns `true`.
    pub async fn revoke_token(&self, redis_pool: &RedisPool, claims: &Claims) -> Result<bool> {
        let expiry = claims.exp.saturating_sub(now_secs()?);
        info!("Revoking {:?} token of user {}", claims.token_type, claims.sub);
        redis_pool
            .set_if_absent(&revocation_key(claims), "1", expiry)
            .await
    }

    /// Rotate a refresh token
    ///
    /// Revokes the presented refresh token and issues a fresh pair. Yields
    /// `None` when the token had already been revoked, by logout or by an
    /// earlier rotation.
    pub async fn rotate_refresh_token(
        &self,
        redis_pool: &RedisPool,
        user: &User,
        old_claims: &Claims,
    ) -> Result<Option<TokenPair>> {
        if old_claims.token_type != TokenType::Refresh {
            return Err(anyhow::anyhow!("Token is not a refresh token"));
        }

        if old_claims.sub != user.id {
            return Err(anyhow::anyhow!("Token does not belong to user"));
        }

        if !self.revoke_token(redis_pool, old_claims).await? {
            return Ok(None);
        }

        self.issue_pair(user).map(Some)
    }
}

fn revocation_key(claims: &Claims) -> String {
    format!("revoked_token:{}", claims.jti)
}
