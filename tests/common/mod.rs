// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use session_keeper::clock::ManualClock;
use session_keeper::error::SessionError;
use session_keeper::models::{LoginResponse, RefreshedTokens};
use session_keeper::services::session::DEFAULT_REFRESH_BUFFER;
use session_keeper::services::{AuthApi, SessionManager};
use session_keeper::store::{keys, MemoryStore, SessionStore};
use session_keeper::ui::SessionUi;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Mint a signed access token expiring at `exp` (mirrors what the API issues).
#[allow(dead_code)]
pub fn make_token(exp: i64) -> String {
    make_token_with_claims(&serde_json::json!({
        "sub": "learner-1",
        "scope": "USER",
        "iat": exp - 3600,
        "exp": exp,
    }))
}

#[allow(dead_code)]
pub fn make_token_with_claims(claims: &serde_json::Value) -> String {
    encode(
        &Header::new(Algorithm::HS512),
        claims,
        &EncodingKey::from_secret(b"server_side_signing_key_not_known_to_clients"),
    )
    .expect("Failed to create JWT")
}

/// Scripted answer of the fake refresh endpoint.
#[allow(dead_code)]
pub enum FakeRefresh {
    Tokens {
        access_token: String,
        refresh_token: Option<String>,
    },
    Rejected,
    Transient,
}

#[allow(dead_code)]
impl FakeRefresh {
    pub fn tokens(access_token: &str, refresh_token: Option<&str>) -> Self {
        FakeRefresh::Tokens {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.map(str::to_string),
        }
    }

    fn into_result(self) -> Result<RefreshedTokens, SessionError> {
        match self {
            FakeRefresh::Tokens {
                access_token,
                refresh_token,
            } => Ok(RefreshedTokens {
                access_token,
                refresh_token,
            }),
            FakeRefresh::Rejected => Err(SessionError::RefreshRejected),
            FakeRefresh::Transient => Err(SessionError::RefreshTransient(
                "operation timed out".to_string(),
            )),
        }
    }
}

/// In-process stand-in for the auth API.
///
/// When gated, `refresh` signals `entered` and then waits for `release`,
/// which lets tests observe a refresh while it is outstanding.
#[derive(Default)]
pub struct FakeAuthApi {
    refresh_responses: Mutex<VecDeque<FakeRefresh>>,
    refresh_calls: Mutex<Vec<String>>,
    login_response: Mutex<Option<LoginResponse>>,
    logout_calls: Mutex<Vec<String>>,
    gated: bool,
    pub entered: Notify,
    pub release: Notify,
}

#[allow(dead_code)]
impl FakeAuthApi {
    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Self::default()
        }
    }

    pub fn push_refresh(&self, response: FakeRefresh) {
        self.refresh_responses.lock().unwrap().push_back(response);
    }

    pub fn set_login(&self, response: LoginResponse) {
        *self.login_response.lock().unwrap() = Some(response);
    }

    /// Refresh tokens presented so far, in order.
    pub fn refresh_calls(&self) -> Vec<String> {
        self.refresh_calls.lock().unwrap().clone()
    }

    pub fn logout_calls(&self) -> Vec<String> {
        self.logout_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthApi for FakeAuthApi {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, SessionError> {
        self.refresh_calls
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        self.entered.notify_one();

        if self.gated {
            self.release.notified().await;
        }

        let response = self.refresh_responses.lock().unwrap().pop_front();
        response.unwrap_or(FakeRefresh::Transient).into_result()
    }

    async fn login(&self, _username: &str, _password: &str) -> Result<LoginResponse, SessionError> {
        let response = self.login_response.lock().unwrap().clone();
        response.ok_or(SessionError::InvalidCredentials)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), SessionError> {
        self.logout_calls
            .lock()
            .unwrap()
            .push(refresh_token.to_string());
        Ok(())
    }
}

/// Records user-facing effects instead of performing them.
#[derive(Default)]
pub struct RecordingUi {
    messages: Mutex<Vec<String>>,
    redirects: Mutex<usize>,
}

#[allow(dead_code)]
impl RecordingUi {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn redirects(&self) -> usize {
        *self.redirects.lock().unwrap()
    }
}

impl SessionUi for RecordingUi {
    fn show_message(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn redirect_to_login(&self) {
        *self.redirects.lock().unwrap() += 1;
    }
}

/// A session manager wired to fakes, with handles to each of them.
#[allow(dead_code)]
pub struct TestSession {
    pub clock: ManualClock,
    pub store: Arc<MemoryStore>,
    pub api: Arc<FakeAuthApi>,
    pub ui: Arc<RecordingUi>,
    pub manager: SessionManager,
}

#[allow(dead_code)]
impl TestSession {
    pub fn new(now: i64) -> Self {
        Self::with_api(now, FakeAuthApi::default())
    }

    pub fn with_api(now: i64, api: FakeAuthApi) -> Self {
        let clock = ManualClock::new(now);
        let store = Arc::new(MemoryStore::new());
        let api = Arc::new(api);
        let ui = Arc::new(RecordingUi::default());

        let manager = SessionManager::new(
            Arc::new(clock.clone()),
            store.clone(),
            api.clone(),
            ui.clone(),
            DEFAULT_REFRESH_BUFFER,
        );

        Self {
            clock,
            store,
            api,
            ui,
            manager,
        }
    }

    /// Store credentials the way a completed login would.
    pub fn seed(&self, access_token: &str, refresh_token: &str) {
        self.store
            .set_all(&[
                (keys::ACCESS_TOKEN, access_token),
                (keys::REFRESH_TOKEN, refresh_token),
                (keys::USER, r#"{"id":"learner-1","username":"ada"}"#),
            ])
            .unwrap();
    }
}
