use crate::errors::{Error, Result};
use crate::metrics::AUTH_FAILURES_TOTAL;
use crate::rest::ApiError;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::warn;

pub const MISSING_HEADER: &str = "Authorization header required";
pub const BAD_FORMAT: &str = "Invalid authorization format. Use: Bearer <token>";
pub const BAD_TOKEN: &str = "Invalid or expired token";

/// The shared secret every protected request must present.
#[derive(Clone)]
pub struct ApiToken(Arc<str>);

impl ApiToken {
    pub fn new(token: &str) -> Self {
        Self(Arc::from(token))
    }
}

/// Checks an `Authorization` header value against `expected`.
pub fn check_bearer(header: Option<&HeaderValue>, expected: &str) -> Result<()> {
    let header = header.ok_or(Error::Unauthorized(MISSING_HEADER))?;
    let header = header
        .to_str()
        .map_err(|_| Error::Unauthorized(BAD_FORMAT))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or(Error::Unauthorized(BAD_FORMAT))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(Error::Unauthorized(BAD_FORMAT));
    }

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        return Err(Error::Unauthorized(BAD_TOKEN));
    }
    Ok(())
}

/// Compares without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn require_bearer(
    State(token): State<ApiToken>,
    request: Request,
    next: Next,
) -> Response {
    match check_bearer(request.headers().get(AUTHORIZATION), &token.0) {
        Ok(()) => next.run(request).await,
        Err(e) => {
            AUTH_FAILURES_TOTAL.inc();
            warn!("Rejected request: {}", e);
            ApiError::from(e).into_response()
        }
    }
}
