use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::repo_types::{User, UserRole};
use crate::error::AuthError;

/// Request body for signup.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    /// Taken from the body as-is; absent means least privilege.
    pub role: Option<UserRole>,
}

/// Request body for login. Fields are optional so an absent one maps to a
/// missing-credentials error rather than a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub password_current: String,
    pub password: String,
    pub password_confirm: String,
}

/// Response returned whenever a token is issued. The user rides along with
/// its secret fields already stripped at the serializer.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub status: &'static str,
    pub token: String,
    pub data: UserData,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: User,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Shared checks for any operation that installs a new password.
pub(crate) fn validate_new_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        return Err(AuthError::Validation("Password too short".into()));
    }
    if password != confirm {
        return Err(AuthError::Validation("Passwords do not match".into()));
    }
    Ok(())
}
