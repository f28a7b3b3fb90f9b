// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-facing side effects of a terminal session failure.

/// Shows messages and sends the user back to sign in.
pub trait SessionUi: Send + Sync {
    fn show_message(&self, message: &str);

    fn redirect_to_login(&self);
}

/// Headless implementation that writes both effects to the log.
#[derive(Debug, Clone)]
pub struct TracingUi {
    login_url: String,
}

impl TracingUi {
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
        }
    }
}

impl SessionUi for TracingUi {
    fn show_message(&self, message: &str) {
        tracing::warn!(notice = message, "Session notice");
    }

    fn redirect_to_login(&self) {
        tracing::info!(login_url = %self.login_url, "Sign-in required");
    }
}
