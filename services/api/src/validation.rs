//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::catalog::VideoSource;

pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 128;
pub const TITLE_MAX_LENGTH: usize = 200;
pub const ABOUT_MAX_LENGTH: usize = 500;
pub const PHONE_MAX_LENGTH: usize = 15;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() > 150 {
        return Err("Username must be at most 150 characters long".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(
            "Username can only contain letters, numbers, and @/./+/-/_ characters".to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    let length = password.chars().count();

    if length < PASSWORD_MIN_LENGTH {
        return Err("Password must be at least 8 characters long.".to_string());
    }

    if length > PASSWORD_MAX_LENGTH {
        return Err("Password must be at most 128 characters long.".to_string());
    }

    Ok(())
}

/// Validate that the confirmation repeats the password
pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<(), String> {
    if password != confirmation {
        return Err("Passwords do not match.".to_string());
    }

    Ok(())
}

/// Validate a course duration such as `"3 weeks"` or `"1 day"`
pub fn validate_course_duration(duration: &str) -> Result<(), String> {
    static COURSE_DURATION_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = COURSE_DURATION_REGEX.get_or_init(|| {
        Regex::new(r"^([1-9]|[1-2][0-9]|30) (day|days|week|weeks)$")
            .expect("Failed to compile course duration regex")
    });

    if !regex.is_match(duration) {
        return Err("Enter a valid duration (e.g., '3 weeks' or '1 day').".to_string());
    }

    Ok(())
}

/// Validate a module duration such as `"2 hours"` or `"15 minutes"`
pub fn validate_module_duration(duration: &str) -> Result<(), String> {
    static MODULE_DURATION_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = MODULE_DURATION_REGEX.get_or_init(|| {
        Regex::new(r"^([1-9]|[1-2][0-9]|30) (minute|minutes|hour|hours)$")
            .expect("Failed to compile module duration regex")
    });

    if !regex.is_match(duration) {
        return Err("Enter a valid duration (e.g., '2 hours' or '15 minutes').".to_string());
    }

    Ok(())
}

/// Validate a required, length-limited title
pub fn validate_title(title: &str, max: usize) -> Result<(), String> {
    if title.trim().is_empty() {
        return Err("This field is required".to_string());
    }

    if title.chars().count() > max {
        return Err(format!("Ensure this field has no more than {} characters", max));
    }

    Ok(())
}

/// Validate an optional free-text field against a maximum length
pub fn validate_max_length(value: Option<&str>, max: usize) -> Result<(), String> {
    match value {
        Some(value) if value.chars().count() > max => Err(format!(
            "Ensure this field has no more than {} characters",
            max
        )),
        _ => Ok(()),
    }
}

/// Validate an optional phone number
pub fn validate_phone_number(phone: Option<&str>) -> Result<(), String> {
    let Some(phone) = phone else {
        return Ok(());
    };

    validate_max_length(Some(phone), PHONE_MAX_LENGTH)?;

    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^\+?[0-9 -]+$").expect("Failed to compile phone regex"));

    if !regex.is_match(phone) {
        return Err("Invalid phone number".to_string());
    }

    Ok(())
}

/// Validate an optional gender code (`M`, `F` or `O`)
pub fn validate_gender(gender: Option<&str>) -> Result<(), String> {
    match gender {
        None | Some("M") | Some("F") | Some("O") => Ok(()),
        Some(other) => Err(format!("\"{}\" is not a valid choice.", other)),
    }
}

/// Validate an external video link
pub fn validate_video_url(url: &str) -> Result<(), String> {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URL_REGEX
        .get_or_init(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("Failed to compile URL regex"));

    if !regex.is_match(url) {
        return Err("Enter a valid URL.".to_string());
    }

    Ok(())
}

/// Resolve the lesson video source; exactly one of the two must be given
pub fn validate_video_source(
    video_url: Option<&str>,
    uploaded_video: Option<&str>,
) -> Result<VideoSource, String> {
    let video_url = video_url.map(str::trim).filter(|s| !s.is_empty());
    let uploaded_video = uploaded_video.map(str::trim).filter(|s| !s.is_empty());

    match (video_url, uploaded_video) {
        (Some(_), Some(_)) => {
            Err("You cannot provide both a video URL and an uploaded video.".to_string())
        }
        (None, None) => {
            Err("You must provide either a video URL or an uploaded video.".to_string())
        }
        (Some(url), None) => {
            validate_video_url(url)?;
            Ok(VideoSource::External(url.to_string()))
        }
        (None, Some(asset)) => Ok(VideoSource::Uploaded(asset.to_string())),
    }
}
