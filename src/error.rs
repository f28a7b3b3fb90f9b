// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session error types.

use crate::token::DecodeError;

/// Errors produced while decoding, refreshing or persisting a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Token decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Refresh token rejected")]
    RefreshRejected,

    #[error("Token refresh failed: {0}")]
    RefreshTransient(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl SessionError {
    /// True when the session cannot be recovered without logging in again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionError::RefreshRejected)
    }

    /// True for failures that may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionError::RefreshTransient(_) | SessionError::Storage(_)
        )
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
