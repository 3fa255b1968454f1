//! Axum extractors for session credentials.

use crate::auth::service::AuthService;
use crate::auth::token::SessionClaims;
use crate::config::Config;
use crate::error::AppError;
use crate::storage::rate_limit::RateLimiter;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use std::convert::Infallible;
use std::sync::Arc;

/// Name of the cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "jwt";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AuthService>,
    pub config: Arc<Config>,
    pub limiter: RateLimiter,
}

/// Raw session credential presented by the client, if any.
///
/// Read from the `jwt` cookie first, then from an
/// `Authorization: Bearer {token}` header. Never rejects.
pub struct SessionToken(pub Option<String>);

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get(SESSION_COOKIE) {
            if !cookie.value().is_empty() {
                return Ok(SessionToken(Some(cookie.value().to_string())));
            }
        }

        let bearer = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(SessionToken(bearer))
    }
}

/// Authenticated session extractor.
///
/// Returns 401 Unauthorized if the credential is missing, forged or expired.
pub struct AuthSession {
    pub claims: SessionClaims,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = match SessionToken::from_request_parts(parts, state).await {
            Ok(token) => token,
            Err(never) => match never {},
        };

        let token = token.ok_or_else(|| AppError::Unauthorized("Not logged in".to_string()))?;

        let claims = state
            .service
            .session_claims(&token)
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        Ok(AuthSession { claims })
    }
}
