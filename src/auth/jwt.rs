use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde_json::Value;

use super::{AuthError, AuthenticatedIdentity, Claims};
use crate::config::SecurityConfig;

/// Verifies HS256 bearer tokens issued by the hosted auth service.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        // Pinned to HS256: tokens whose header names any other algorithm are rejected.
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present but not required.
        validation.required_spec_claims.clear();
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_audience.as_deref())
    }

    /// Verify a bearer token and extract the caller's identity.
    ///
    /// `None` means no credential was presented at all, which is reported
    /// separately from a credential that fails verification.
    pub fn verify(&self, token: Option<&str>) -> Result<AuthenticatedIdentity, AuthError> {
        let token = match token {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(AuthError::Unauthenticated),
        };

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(describe(e.kind()).to_string()))?;

        let subject = match data.claims.get("sub") {
            Some(Value::String(sub)) if !sub.is_empty() => sub.clone(),
            _ => return Err(AuthError::InvalidToken("token has no 'sub' claim".to_string())),
        };

        Ok(AuthenticatedIdentity::new(subject, token.to_string(), data.claims))
    }
}

fn describe(kind: &ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidSignature => "signature mismatch",
        ErrorKind::ExpiredSignature => "token expired",
        ErrorKind::ImmatureSignature => "token not yet valid",
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => "algorithm not accepted",
        ErrorKind::InvalidAudience => "audience mismatch",
        ErrorKind::MissingRequiredClaim(_) => "required claim missing",
        _ => "malformed token",
    }
}
