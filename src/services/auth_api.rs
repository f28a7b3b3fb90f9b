// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the platform's authentication endpoints.
//!
//! Handles:
//! - Refresh token exchange (`POST /auth/refresh`)
//! - Username/password login (`POST /auth/login`)
//! - Server-side logout (`POST /auth/logout`)
//!
//! A 401 from the refresh endpoint means the refresh token is dead and is
//! reported as [`SessionError::RefreshRejected`]. Everything else is transient.

use crate::error::SessionError;
use crate::models::{ApiEnvelope, LoginResponse, RefreshedTokens};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Authentication operations the session manager depends on.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange a refresh token for a new access token (and maybe a new refresh token).
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, SessionError>;

    /// Log in with username and password.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, SessionError>;

    /// Invalidate a refresh token on the server.
    async fn logout(&self, refresh_token: &str) -> Result<(), SessionError>;
}

/// HTTP implementation of [`AuthApi`].
#[derive(Clone)]
pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a JSON body and return the raw response.
    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, SessionError> {
        self.http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| SessionError::RefreshTransient(format!("{} request failed: {}", path, e)))
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, SessionError> {
        let body = serde_json::json!({ "refreshToken": refresh_token });
        let response = self.post_json("/auth/refresh", &body).await?;

        if response.status().as_u16() == 401 {
            tracing::info!("Refresh token rejected (401)");
            return Err(SessionError::RefreshRejected);
        }

        check_response_json::<RefreshedTokens>(response).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, SessionError> {
        let body = serde_json::json!({ "username": username, "password": password });
        let response = self.post_json("/auth/login", &body).await?;

        if response.status().as_u16() == 401 {
            return Err(SessionError::InvalidCredentials);
        }

        check_response_json::<LoginResponse>(response).await
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), SessionError> {
        let body = serde_json::json!({ "refreshToken": refresh_token });
        let response = self.post_json("/auth/logout", &body).await?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(SessionError::RefreshTransient(format!(
            "HTTP {}: {}",
            status, body
        )))
    }
}

/// Check response status and parse the (possibly wrapped) JSON body.
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, SessionError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Auth API rate limit hit (429)");
        }

        return Err(SessionError::RefreshTransient(format!(
            "HTTP {}: {}",
            status, body
        )));
    }

    response
        .json::<ApiEnvelope<T>>()
        .await
        .map(ApiEnvelope::into_inner)
        .map_err(|e| SessionError::RefreshTransient(format!("JSON parse error: {}", e)))
}
