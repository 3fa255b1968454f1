//! Security headers and CORS policy.

use crate::config::{Config, ConfigError};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::CorsLayer;

/// CORS policy for the login API.
///
/// With `CORS_ALLOWED_ORIGIN` set, that single origin may call the API with
/// credentials (the session cookie). Otherwise every cross-origin request
/// is refused.
pub fn cors_layer(config: &Config) -> Result<CorsLayer, ConfigError> {
    let Some(origin) = config.cors_allowed_origin.as_deref() else {
        return Ok(CorsLayer::new());
    };

    let origin = HeaderValue::from_str(origin.trim_end_matches('/')).map_err(|e| {
        ConfigError::InvalidValue("CORS_ALLOWED_ORIGIN".to_string(), e.to_string())
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

/// Middleware that adds security headers to every API response.
///
/// - **Cache-Control: no-store**
///   Challenges and session cookies must never be served from a cache.
///
/// - **Referrer-Policy: no-referrer**
///
/// - **X-Content-Type-Options: nosniff**
///   Browsers must treat JSON bodies as JSON.
///
/// - **X-Frame-Options: DENY** and CSP `frame-ancestors 'none'`
///   Nothing here is meant to be framed.
///
/// - **Content-Security-Policy: default-src 'none'**
///   The server only returns JSON, so no subresource should ever load.
///
/// # Usage
///
/// ```rust,no_run
/// use axum::Router;
/// use axum::middleware;
/// use siwe_auth::middleware::security_headers;
///
/// let app: Router = Router::new()
///     .layer(middleware::from_fn(security_headers));
/// ```
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );

    response
}
