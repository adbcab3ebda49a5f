use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::auth::repo_types::UserRole;
use crate::state::AppState;

pub(crate) mod cookie;
mod dto;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod reset;

/// All auth routes. The state is taken here so the `protect`,
/// `restrict_to` and `is_logged_in` layers can be attached to the route
/// groups that need them.
pub fn router(state: AppState) -> Router<AppState> {
    const ADMIN_ONLY: &[UserRole] = &[UserRole::Admin];

    let public = Router::new()
        .route("/users/signup", post(handlers::signup))
        .route("/users/login", post(handlers::login))
        .route("/users/logout", get(handlers::logout))
        .route("/users/forgotPassword", post(handlers::forgot_password))
        .route("/users/resetPassword/:token", patch(handlers::reset_password));

    let session = Router::new()
        .route("/session", get(handlers::session))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::is_logged_in,
        ));

    let protected = Router::new()
        .route("/users/me", get(handlers::me))
        .route("/users/updateMyPassword", patch(handlers::update_password))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::protect,
        ));

    // layers run outermost-last: protect resolves the user, then the role
    // gate reads it
    let admin = Router::new()
        .route("/users", get(handlers::list_users))
        .layer(axum::middleware::from_fn(|req, next| {
            middleware::restrict_to(ADMIN_ONLY, req, next)
        }))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::protect,
        ));

    public.merge(session).merge(protected).merge(admin)
}
