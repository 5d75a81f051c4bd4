//! Google ID token verification through the `tokeninfo` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;

use super::{AuthError, Identity, IdentityVerifier};

/// Google's public token introspection endpoint.
pub const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Claims returned by `tokeninfo`. Numbers and booleans arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "bool_or_string")]
    pub email_verified: bool,
    #[serde(default, deserialize_with = "i64_or_string")]
    pub exp: Option<i64>,
}

fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn i64_or_string<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

impl TokenInfo {
    /// Check the claims for `audience` at unix time `now`.
    pub fn validate(self, audience: Option<&str>, now: i64) -> Result<Identity, AuthError> {
        if let Some(expected) = audience {
            if self.aud.as_deref() != Some(expected) {
                return Err(AuthError::InvalidToken("audience mismatch".to_string()));
            }
        }
        if !self.email_verified {
            return Err(AuthError::InvalidToken("email not verified".to_string()));
        }
        match self.exp {
            Some(exp) if exp > now => {}
            _ => return Err(AuthError::InvalidToken("token expired".to_string())),
        }
        self.email
            .filter(|e| !e.is_empty())
            .map(Identity::new)
            .ok_or_else(|| AuthError::InvalidToken("token has no email".to_string()))
    }
}

/// Verifies Google-issued ID tokens.
#[derive(Debug, Clone)]
pub struct GoogleTokenVerifier {
    client: reqwest::Client,
    audience: Option<String>,
    endpoint: String,
}

impl GoogleTokenVerifier {
    pub fn new(audience: Option<String>) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AuthError::VerifierUnavailable(e.to_string()))?;

        if audience.is_none() {
            log::warn!("No token audience configured; tokens for any client id are accepted");
        }

        Ok(Self {
            client,
            audience,
            endpoint: TOKENINFO_URL.to_string(),
        })
    }

    /// Point the verifier at a different `tokeninfo` endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl IdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", token)])
            .send()
            .await
            .map_err(|e| AuthError::VerifierUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::InvalidToken(format!(
                "tokeninfo returned {}",
                response.status()
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidToken(format!("unreadable tokeninfo: {}", e)))?;

        info.validate(self.audience.as_deref(), chrono::Utc::now().timestamp())
    }
}
