//! Session credentials and auth API payloads.

use serde::{Deserialize, Serialize};

/// Access/refresh credential pair held by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Short-lived bearer credential
    pub access_token: String,
    /// Longer-lived credential used only to mint access tokens
    pub refresh_token: String,
}

/// Response body of `POST /auth/refresh`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    pub access_token: String,
    /// Rotated refresh token; `None` keeps the current one
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl RefreshedTokens {
    /// Combine with the refresh token that was just spent.
    pub fn into_pair(self, previous_refresh_token: &str) -> TokenPair {
        TokenPair {
            access_token: self.access_token,
            refresh_token: self
                .refresh_token
                .unwrap_or_else(|| previous_refresh_token.to_string()),
        }
    }
}

/// Response body of `POST /auth/login`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// User profile, passed through opaquely
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

/// The API answers either with the payload itself or wrapped in `result`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiEnvelope<T> {
    Wrapped { result: T },
    Bare(T),
}

impl<T> ApiEnvelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            ApiEnvelope::Wrapped { result } => result,
            ApiEnvelope::Bare(inner) => inner,
        }
    }
}
