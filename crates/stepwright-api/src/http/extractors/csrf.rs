//! Anti-forgery token extractor.
//!
//! Every mutating route takes a [`CsrfVerified`] argument. Axum runs parts
//! extractors before the body extractor, so a request with a missing or bad
//! `X-CSRF-Token` header is refused before its body is read.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use stepwright_infra::csrf::WORKFLOW_API_NAMESPACE;

use crate::http::error::AppError;
use crate::state::AppState;

/// Header carrying the anti-forgery token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Marker proving the request carried a valid anti-forgery token.
pub struct CsrfVerified;

impl FromRequestParts<AppState> for CsrfVerified {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        match state.csrf.verify(WORKFLOW_API_NAMESPACE, token) {
            Ok(()) => Ok(CsrfVerified),
            Err(e) => {
                tracing::warn!(method = %parts.method, path = %parts.uri.path(), error = %e, "anti-forgery check failed");
                Err(AppError::Forbidden("Invalid CSRF token".to_string()))
            }
        }
    }
}
