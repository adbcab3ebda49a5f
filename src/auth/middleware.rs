use axum::{
    extract::{FromRef, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::auth::cookie;
use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::{User, UserRole};
use crate::error::AuthError;
use crate::state::AppState;

/// The resolved user a `protect` layer attaches to the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Soft-resolved user attached by `is_logged_in`; `None` means anonymous.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

/// Pull the session token off a request: `Authorization: Bearer` first,
/// `jwt` cookie as fallback.
pub(crate) fn token_from_request(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
        .or_else(|| cookie::token_from_cookie_header(headers))
}

/// Hard authorization gate. Verifies the token, checks the subject still
/// exists and that the token predates no password change, then attaches
/// [`CurrentUser`] for downstream handlers.
pub async fn protect(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = token_from_request(req.headers())
        .ok_or(AuthError::Unauthenticated("You are not logged in"))?;

    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify(&token).map_err(|e| {
        warn!(error = %e, "token verification failed");
        AuthError::Unauthenticated("Invalid or expired token")
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound(
            "The user belonging to this token does no longer exist",
        ))?;

    if user.changed_password_after(claims.iat as i64) {
        return Err(AuthError::CredentialsStale);
    }

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Soft variant of [`protect`] for anonymous-safe surfaces: runs the same
/// checks but never fails the request, resolving every failure to "no
/// user".
pub async fn is_logged_in(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let user = resolve_user(&state, req.headers()).await;
    req.extensions_mut().insert(MaybeUser(user));
    next.run(req).await
}

async fn resolve_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let token = token_from_request(headers)?;
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify(&token).ok()?;
    let user = User::find_by_id(&state.db, claims.sub).await.ok()??;
    if user.changed_password_after(claims.iat as i64) {
        return None;
    }
    Some(user)
}

/// Role gate. Reads the user `protect` attached, so it must be layered
/// after it; running it bare is a wiring bug, not a client error.
pub async fn restrict_to(
    allowed: &'static [UserRole],
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let CurrentUser(user) = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AuthError::Internal(anyhow::anyhow!("restrict_to ran without protect")))?;

    if !allowed.contains(&user.role) {
        return Err(AuthError::Forbidden);
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer header-token".parse().unwrap());
        headers.insert(header::COOKIE, "jwt=cookie-token".parse().unwrap());
        assert_eq!(
            token_from_request(&headers),
            Some("header-token".to_string())
        );
    }

    #[test]
    fn cookie_is_the_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "jwt=cookie-token".parse().unwrap());
        assert_eq!(
            token_from_request(&headers),
            Some("cookie-token".to_string())
        );
    }

    #[test]
    fn non_bearer_authorization_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwdw==".parse().unwrap());
        assert_eq!(token_from_request(&headers), None);
    }

    #[test]
    fn no_token_anywhere() {
        assert_eq!(token_from_request(&HeaderMap::new()), None);
    }
}
