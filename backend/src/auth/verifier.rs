//! Identity verifier trait and the static-token implementation.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{AuthError, Identity};

/// Turns a bearer token into a verified identity.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to be shared across request handlers.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `token` and return the identity it was issued to.
    ///
    /// # Returns
    /// * `Err(AuthError::InvalidToken)` - If the token is not acceptable
    /// * `Err(AuthError::VerifierUnavailable)` - If verification could not be performed
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Verifier backed by a fixed token-to-email map.
///
/// Intended for local development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// Add a token issued to `email`.
    pub fn with_token(mut self, token: impl Into<String>, email: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), email.into());
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .get(token)
            .map(|email| Identity::new(email.clone()))
            .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string()))
    }
}
