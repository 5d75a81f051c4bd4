//! Request authorization.
//!
//! A request is authorized when it carries an `Authorization: Bearer <token>`
//! header, the configured [`IdentityVerifier`] accepts the token, and the
//! verified email is on the allow-list. The allow-list is injected through
//! [`AuthConfig`]; email matching ignores ASCII case.

#[cfg(feature = "google-auth")]
pub mod google;
pub mod verifier;

#[cfg(feature = "google-auth")]
pub use google::GoogleTokenVerifier;
pub use verifier::{IdentityVerifier, StaticTokenVerifier};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub email: String,
}

impl Identity {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

/// Authorization settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth client id that tokens must be issued for.
    #[serde(default)]
    pub audience: Option<String>,
    /// Emails allowed to use the API. Empty means nobody is allowed.
    #[serde(default)]
    pub authorized_emails: Vec<String>,
}

/// Reasons a request is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token verification unavailable: {0}")]
    VerifierUnavailable(String),

    #[error("{email} is not authorized")]
    Forbidden { email: String },
}

impl AuthError {
    /// Whether the caller was identified but is not allowed in.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, AuthError::Forbidden { .. })
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively; an empty token is rejected.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Gate combining a verifier with the allow-list.
#[derive(Clone)]
pub struct Authorizer {
    verifier: Arc<dyn IdentityVerifier>,
    allowed: Arc<HashSet<String>>,
}

impl Authorizer {
    pub fn new(config: &AuthConfig, verifier: Arc<dyn IdentityVerifier>) -> Self {
        let allowed: HashSet<String> = config
            .authorized_emails
            .iter()
            .map(|email| email.trim().to_ascii_lowercase())
            .filter(|email| !email.is_empty())
            .collect();

        if allowed.is_empty() {
            log::warn!("No authorized emails configured; every request will be refused");
        }

        Self {
            verifier,
            allowed: Arc::new(allowed),
        }
    }

    pub fn is_authorized_email(&self, email: &str) -> bool {
        self.allowed.contains(&email.trim().to_ascii_lowercase())
    }

    /// Authorize a request from its raw `Authorization` header.
    pub async fn authorize(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(AuthError::MissingToken)?;

        let identity = self.verifier.verify(token).await?;

        if !self.is_authorized_email(&identity.email) {
            log::info!("Refusing request from unlisted identity {}", identity.email);
            return Err(AuthError::Forbidden {
                email: identity.email,
            });
        }

        Ok(identity)
    }
}
