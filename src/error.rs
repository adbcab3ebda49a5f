use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Domain errors for the authentication subsystem.
///
/// Every variant carries its status class; all of them render through the
/// single [`IntoResponse`] boundary below instead of being formatted at the
/// call sites.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("Please provide email and password")]
    MissingCredentials,

    // One message for unknown email and wrong password, so a caller cannot
    // probe which half failed.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("User recently changed password. Please log in again")]
    CredentialsStale,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    UserNotFound(&'static str),

    #[error("Token is invalid or has expired")]
    ResetTokenInvalid,

    #[error("Your current password is wrong")]
    WrongCurrentPassword,

    #[error("There was an error sending the email. Try again later")]
    Notification(anyhow::Error),

    #[error("Something went very wrong")]
    Internal(anyhow::Error),
}

// Infrastructure failures (store, hasher, signer) all surface as opaque
// internal errors.
impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Internal(err)
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_)
            | AuthError::MissingCredentials
            | AuthError::ResetTokenInvalid => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::Unauthenticated(_)
            | AuthError::CredentialsStale
            | AuthError::WrongCurrentPassword => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Notification(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        }
        let body = Json(json!({
            "status": if status.is_server_error() { "error" } else { "fail" },
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes_match_taxonomy() {
        assert_eq!(
            AuthError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::MissingCredentials.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Unauthenticated("no").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AuthError::CredentialsStale.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::UserNotFound("gone").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::ResetTokenInvalid.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::WrongCurrentPassword.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Notification(anyhow::anyhow!("smtp down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unknown_email_and_wrong_password_render_identically() {
        // Both failure halves of login map to this same variant; the message
        // must not depend on which one happened.
        let a = AuthError::InvalidCredentials.to_string();
        let b = AuthError::InvalidCredentials.to_string();
        assert_eq!(a, b);
        assert_eq!(a, "Invalid email or password");
    }

    #[test]
    fn internal_error_hides_detail() {
        let err = AuthError::Internal(anyhow::anyhow!("signing key misconfigured"));
        assert!(!err.to_string().contains("signing key"));
    }
}
