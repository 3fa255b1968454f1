//! Login API endpoints.

use crate::auth::middleware::{AppState, AuthSession, SessionToken, SESSION_COOKIE};
use crate::auth::service::LoginOutcome;
use crate::error::AppError;
use crate::models::{ChallengeResponse, LoginQuery, ResultResponse, SessionInfo, SignedLoginRequest};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        ConnectInfo, Query, State,
    },
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;

/// Window for `RATE_LIMIT_LOGIN_PER_MIN`.
const LOGIN_RATE_WINDOW_SECS: u64 = 60;

/// GET /login?address=..&chainId=.. - Issue a challenge to sign
pub async fn request_challenge(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    query: Result<Query<LoginQuery>, QueryRejection>,
) -> Result<Json<ChallengeResponse>, AppError> {
    // Rate limit by IP
    let rate_limit_key = format!("ratelimit:login:{}", addr.ip());
    let allowed = state
        .limiter
        .check(
            &rate_limit_key,
            state.config.rate_limit_login_per_min,
            LOGIN_RATE_WINDOW_SECS,
        )
        .await?;

    if !allowed {
        let mut hasher = std::hash::DefaultHasher::new();
        addr.ip().hash(&mut hasher);
        let ip_hash = format!("{:x}", hasher.finish());
        tracing::warn!(action = "rate_limited", endpoint = "login", ip_hash = %ip_hash, "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    let Query(query) = query.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let payload = state
        .service
        .begin_login(query.address.as_deref(), query.chain_id.as_deref())
        .await?;

    Ok(Json(ChallengeResponse { payload }))
}

/// POST /login - Exchange a signed challenge for a session cookie
pub async fn verify_login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<SignedLoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<ResultResponse>), AppError> {
    let Json(req) = body.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    match state.service.complete_login(req).await? {
        LoginOutcome::Accepted(credential) => {
            let cookie = session_cookie(
                credential.token,
                state.config.cookie_max_age(),
                state.config.cookie_secure,
            );
            Ok((jar.add(cookie), Json(ResultResponse::new(true))))
        }
        LoginOutcome::Rejected => Ok((jar, Json(ResultResponse::new(false)))),
    }
}

/// GET /isLoggedIn - Whether the presented credential is active
pub async fn is_logged_in(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Json<ResultResponse> {
    Json(ResultResponse::new(
        state.service.check_session(token.as_deref()),
    ))
}

/// POST /logout - Overwrite the client's credential with an expired one
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<ResultResponse>), AppError> {
    let expired = state.service.end_session()?;
    let cookie = session_cookie(expired, 0, state.config.cookie_secure);

    tracing::info!(action = "logout", "Session credential replaced");

    Ok((jar.add(cookie), Json(ResultResponse::new(true))))
}

/// GET /session - Details of the active session
pub async fn current_session(session: AuthSession) -> Json<SessionInfo> {
    let claims = session.claims;
    Json(SessionInfo {
        address: claims.address,
        chain_id: claims.chain_id,
        expires_at: claims.exp,
    })
}

fn session_cookie(token: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}
