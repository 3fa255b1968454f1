//! API route handlers.

pub mod auth;

use crate::auth::middleware::AppState;
use axum::{routing::get, routing::post, Router};

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::request_challenge).post(auth::verify_login),
        )
        .route("/isLoggedIn", get(auth::is_logged_in))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::current_session))
}
