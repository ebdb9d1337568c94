//! User model and related functionality

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Platform role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Guest,
    Student,
    Author,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Guest => "guest",
            UserRole::Student => "student",
            UserRole::Author => "author",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(UserRole::Guest),
            "student" => Ok(UserRole::Student),
            "author" => Ok(UserRole::Author),
            other => Err(format!("\"{}\" is not a valid choice.", other)),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User entity
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub avatar: Option<String>,
    pub about: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Stored role; the column is CHECK-constrained so parsing only fails on
    /// schema drift, which degrades to the least privileged role
    pub fn role(&self) -> UserRole {
        self.role.parse().unwrap_or(UserRole::Guest)
    }
}

/// Optional profile fields accepted at registration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileFields {
    /// Blob-store key or URL of the avatar image
    pub avatar: Option<String>,
    pub about: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
}

/// Validated registration payload; `password` is still the raw secret
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub profile: ProfileFields,
}

/// Registration request body
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    pub role: Option<String>,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

/// Login request body; one of `username` or `email` identifies the account
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Field a login names the account by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginIdentifier<'a> {
    Username(&'a str),
    Email(&'a str),
}

impl LoginIdentifier<'_> {
    /// Key for counting failed attempts; usernames and emails never collide
    pub fn rate_limit_key(&self) -> String {
        match self {
            LoginIdentifier::Username(username) => format!("username:{}", username),
            LoginIdentifier::Email(email) => format!("email:{}", email),
        }
    }
}

impl LoginRequest {
    /// The account to look up: by username when one is given, by email otherwise
    pub fn identifier(&self) -> Option<LoginIdentifier<'_>> {
        let username = self.username.as_deref().filter(|s| !s.is_empty());
        let email = self.email.as_deref().filter(|s| !s.is_empty());

        username
            .map(LoginIdentifier::Username)
            .or_else(|| email.map(LoginIdentifier::Email))
    }
}

/// Token pair handed out on signup, login and refresh
#[derive(Debug, Clone, Serialize)]
pub struct TokenPairResponse {
    pub message: String,
    pub access: String,
    pub refresh: String,
}

/// Request for token refresh
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh: String,
}

/// Profile of the authenticated user
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub avatar: Option<String>,
    pub about: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub enrolled_courses: Vec<i64>,
}

impl ProfileResponse {
    pub fn new(user: User, enrolled_courses: Vec<i64>) -> Self {
        let role = user.role();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role,
            avatar: user.avatar,
            about: user.about,
            birthday: user.birthday,
            phone_number: user.phone_number,
            gender: user.gender,
            enrolled_courses,
        }
    }
}
