use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::AuthError;
use crate::error::ApiError;
use crate::state::AppState;

/// Bearer token from the Authorization header, if any.
///
/// A header that is absent, unreadable, empty, or uses another scheme counts
/// as "no credential"; the token itself is judged by the verifier.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Verifies the bearer token and stores the resulting
/// [`AuthenticatedIdentity`](crate::auth::AuthenticatedIdentity) in the
/// request extensions. Requests that fail never reach the handler.
pub async fn require_identity(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = state
        .verifier
        .verify(extract_bearer(request.headers()))
        .map_err(|e| {
            match &e {
                AuthError::Unauthenticated => tracing::debug!("Request without credentials"),
                AuthError::InvalidToken(reason) => tracing::warn!("Rejected token: {}", reason),
            }
            ApiError::from(e)
        })?;

    tracing::debug!("Authenticated subject {}", identity.subject());
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
