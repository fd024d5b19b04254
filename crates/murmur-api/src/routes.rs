use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::hello;
use crate::messages;
use crate::middleware::require_auth;

/// All API routes. Each path is also served with a trailing slash, which is
/// what the web client sends.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/hello", get(hello::hello))
        .route("/hello/", get(hello::hello))
        .route("/auth/register", post(auth::register))
        .route("/auth/register/", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/login/", post(auth::login));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/me/", get(auth::me))
        .route("/messages", get(messages::get_messages).post(messages::send_message))
        .route("/messages/", get(messages::get_messages).post(messages::send_message))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
