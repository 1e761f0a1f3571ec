use serde_json::{Map, Value};
use thiserror::Error;

pub mod jwt;

pub use jwt::TokenVerifier;

/// Decoded token payload, kept as an opaque map.
pub type Claims = Map<String, Value>;

/// Authentication failures. Both map to 401 at the HTTP boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    Unauthenticated,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Identity of the caller for one request.
///
/// Only [`TokenVerifier::verify`] can build one, so holding an
/// `AuthenticatedIdentity` proves the token was verified.
#[derive(Clone)]
pub struct AuthenticatedIdentity {
    subject: String,
    raw_token: String,
    claims: Claims,
}

impl AuthenticatedIdentity {
    pub(crate) fn new(subject: String, raw_token: String, claims: Claims) -> Self {
        Self {
            subject,
            raw_token,
            claims,
        }
    }

    /// Value of the `sub` claim.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The bearer token exactly as presented by the client.
    pub fn raw_token(&self) -> &str {
        &self.raw_token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }
}

// Keep the raw token out of logs.
impl std::fmt::Debug for AuthenticatedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedIdentity")
            .field("subject", &self.subject)
            .field("raw_token", &"<redacted>")
            .field("claims", &self.claims.keys().collect::<Vec<_>>())
            .finish()
    }
}
