use axum::{
    extract::{FromRef, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        cookie,
        dto::{
            is_valid_email, validate_new_password, AuthResponse, ForgotPasswordRequest,
            LoginRequest, ResetPasswordRequest, SignupRequest, UpdatePasswordRequest, UserData,
        },
        jwt::JwtKeys,
        middleware::{CurrentUser, MaybeUser},
        password, reset,
        repo_types::User,
    },
    error::AuthError,
    state::AppState,
};

/// Sign a token for `user` and send it both ways at once: as the `jwt`
/// cookie and in the response body.
fn send_token(state: &AppState, user: User, status: StatusCode) -> Result<Response, AuthError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user.id)?;
    let cookie = cookie::create_auth_cookie(&token, &state.config);
    let body = Json(AuthResponse {
        status: "success",
        token,
        data: UserData { user },
    });
    Ok((status, [(header::SET_COOKIE, cookie)], body).into_response())
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.is_unique_violation()
    )
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(mut payload): Json<SignupRequest>,
) -> Result<Response, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }
    validate_new_password(&payload.password, &payload.password_confirm)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(AuthError::Validation("Email already registered".into()));
    }

    let hash = password::hash_password(&payload.password)?;
    let role = payload.role.unwrap_or_default();
    let user =
        match User::create(&state.db, &payload.name, &payload.email, &hash, role).await {
            Ok(u) => u,
            // unique index backstops the pre-check against a signup race
            Err(e) if is_unique_violation(&e) => {
                return Err(AuthError::Validation("Email already registered".into()))
            }
            Err(e) => return Err(e.into()),
        };

    info!(user_id = %user.id, email = %user.email, "user signed up");
    send_token(&state, user, StatusCode::CREATED)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let (email, password) = match (payload.email.as_deref(), payload.password.as_deref()) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e.trim().to_lowercase(), p),
        _ => return Err(AuthError::MissingCredentials),
    };

    let user = match User::find_by_email(&state.db, &email).await? {
        Some(u) => u,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    if !password::verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    send_token(&state, user, StatusCode::OK)
}

/// Overwrite the client's cookie with a short-lived sentinel. Tokens
/// already handed out stay valid until they expire or the password
/// changes; there is no server-side session to revoke.
pub async fn logout() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie::create_logout_cookie())],
        Json(json!({"status": "success"})),
    )
        .into_response()
}

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Response {
    Json(json!({"status": "success", "data": {"user": user}})).into_response()
}

/// Anonymous-safe: `user` is null unless a valid session rode along.
pub async fn session(Extension(MaybeUser(user)): Extension<MaybeUser>) -> Response {
    Json(json!({"status": "success", "data": {"user": user}})).into_response()
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Response, AuthError> {
    let users = User::list(&state.db).await?;
    Ok(Json(json!({
        "status": "success",
        "results": users.len(),
        "data": {"users": users},
    }))
    .into_response())
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Response, AuthError> {
    let email = payload.email.trim().to_lowercase();
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or(AuthError::UserNotFound(
            "There is no user with that email address",
        ))?;

    // a fresh secret replaces any outstanding one; both fields move together
    let (plaintext, fingerprint, expires) = reset::generate();
    User::set_password_reset(&state.db, user.id, &fingerprint, expires).await?;

    let reset_url = format!(
        "{}/api/v1/users/resetPassword/{}",
        state.config.public_url, plaintext
    );

    if let Err(e) = state
        .mailer
        .send_password_reset(&user.email, &reset_url)
        .await
    {
        // an undeliverable secret must not linger
        User::clear_password_reset(&state.db, user.id).await?;
        error!(user_id = %user.id, error = %e, "reset email dispatch failed");
        return Err(AuthError::Notification(e));
    }

    info!(user_id = %user.id, "password reset token issued");
    Ok(Json(json!({"status": "success", "message": "Token sent to email"})).into_response())
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Response, AuthError> {
    validate_new_password(&payload.password, &payload.password_confirm)?;

    let fingerprint = reset::fingerprint(&token);
    let user = User::find_by_reset_fingerprint(&state.db, &fingerprint)
        .await?
        .ok_or(AuthError::ResetTokenInvalid)?;

    let hash = password::hash_password(&payload.password)?;
    let user = User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password reset completed");
    send_token(&state, user, StatusCode::OK)
}

#[instrument(skip(state, current, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Response, AuthError> {
    let CurrentUser(user) = current;
    if !password::verify_password(&payload.password_current, &user.password_hash)? {
        warn!(user_id = %user.id, "wrong current password");
        return Err(AuthError::WrongCurrentPassword);
    }
    validate_new_password(&payload.password, &payload.password_confirm)?;

    let hash = password::hash_password(&payload.password)?;
    let user = User::update_password(&state.db, user.id, &hash).await?;

    info!(user_id = %user.id, "password updated");
    send_token(&state, user, StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::UserRole;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            email: "ann@x.com".into(),
            password_hash: "$argon2id$fake".into(),
            role: UserRole::User,
            password_changed_at: None,
            password_reset_token_hash: None,
            password_reset_expires: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn send_token_sets_cookie_and_omits_password_hash() {
        let state = AppState::fake();
        let response = send_token(&state, sample_user(), StatusCode::CREATED).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("jwt="));
        assert!(cookie.contains("HttpOnly"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], "success");
        assert!(!value["token"].as_str().unwrap().is_empty());
        assert_eq!(value["data"]["user"]["email"], "ann@x.com");
        assert!(value["data"]["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn issued_token_round_trips_through_verify() {
        let state = AppState::fake();
        let user = sample_user();
        let user_id = user.id;
        let response = send_token(&state, user, StatusCode::OK).unwrap();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let token = value["token"].as_str().unwrap();

        let keys = JwtKeys::from_ref(&state);
        let claims = keys.verify(token).unwrap();
        assert_eq!(claims.sub, user_id);
    }
}
