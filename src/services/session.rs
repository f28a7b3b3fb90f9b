// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Proactive session token refresh.
//!
//! [`SessionManager`] owns the single outstanding refresh timer of a session.
//! The timer is armed `exp - now - buffer` seconds ahead of the access
//! token's expiry; when it fires, the refresh token is exchanged for a new
//! pair, the pair is persisted, and the next timer is armed from the new
//! access token.
//!
//! Failure handling:
//! - 401 from the refresh endpoint ends the session (credentials cleared,
//!   `Ended` event, message, redirect to sign-in).
//! - Any other failure leaves the stored credentials alone and does not
//!   re-arm. A later caller can still use [`SessionManager::refresh_now`].
//!
//! Every logout, teardown and install starts a new session generation. A
//! refresh only commits its result if the generation it started under is
//! still current and the manager is running; otherwise the result is
//! dropped.

use crate::clock::{Clock, TimerHandle};
use crate::error::Result;
use crate::events::{EventBus, SessionEndReason, SessionEvent};
use crate::models::TokenPair;
use crate::services::auth_api::AuthApi;
use crate::store::{keys, SessionStore};
use crate::time_utils::format_unix_secs;
use crate::token::decode_claims;
use crate::ui::SessionUi;
use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;

/// Margin before token expiration when we proactively refresh (5 minutes).
pub const DEFAULT_REFRESH_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Shown to the user when the refresh token is rejected.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Delay until a token expiring at `exp` should be refreshed.
///
/// `max(exp - now - buffer, 0)`, all in seconds since the epoch.
pub fn refresh_delay(exp: i64, now: i64, buffer: Duration) -> Duration {
    let buffer = i64::try_from(buffer.as_secs()).unwrap_or(i64::MAX);
    let secs = exp.saturating_sub(now).saturating_sub(buffer);
    Duration::from_secs(secs.max(0) as u64)
}

/// Result of a scheduling request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A timer is armed to fire after `delay`.
    Armed { delay: Duration },
    /// A refresh is running; it will arm the next timer itself.
    RefreshInFlight,
    /// The manager is stopped.
    Stopped,
    /// The access token could not be decoded.
    DecodeFailed,
    /// The access token has no `exp` claim.
    MissingExpiry,
}

/// Result of a refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New tokens were stored and the next refresh armed.
    Refreshed,
    /// Another refresh was already running; nothing was done.
    AlreadyInFlight,
    /// No refresh token is stored.
    MissingRefreshToken,
    /// The refresh token was rejected and the session ended.
    Rejected,
    /// The refresh failed for a recoverable reason; the session is unchanged.
    TransientFailure,
    /// The manager was stopped, or the session ended or was replaced,
    /// while the request was outstanding.
    Discarded,
}

/// Clears the in-flight flag on every exit path.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Inner {
    clock: Arc<dyn Clock>,
    store: Arc<dyn SessionStore>,
    api: Arc<dyn AuthApi>,
    ui: Arc<dyn SessionUi>,
    events: EventBus,
    refresh_buffer: Duration,
    /// Session generation. Held while credentials are replaced, cleared or
    /// committed by a refresh. Lock before `timer`.
    generation: Mutex<u64>,
    /// The single armed refresh timer.
    timer: Mutex<Option<TimerHandle>>,
    refreshing: AtomicBool,
    stopped: AtomicBool,
}

/// Keeps one session's access token fresh.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        clock: Arc<dyn Clock>,
        store: Arc<dyn SessionStore>,
        api: Arc<dyn AuthApi>,
        ui: Arc<dyn SessionUi>,
        refresh_buffer: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                store,
                api,
                ui,
                events: EventBus::default(),
                refresh_buffer,
                generation: Mutex::new(0),
                timer: Mutex::new(None),
                refreshing: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Resume the stored session, if any, and arm its refresh timer.
    ///
    /// A refresh still outstanding from before a `stop` is allowed to commit
    /// and will replace the timer armed here.
    pub fn start(&self) -> Option<ScheduleOutcome> {
        let _generation = self.inner.lock_generation();
        self.inner.stopped.store(false, Ordering::SeqCst);

        match self.inner.store.get(keys::ACCESS_TOKEN) {
            Some(access_token) => Some(self.inner.arm(&access_token)),
            None => {
                tracing::info!("No stored session, refresh not scheduled");
                None
            }
        }
    }

    /// Cancel the refresh timer. Stored credentials are kept.
    pub fn stop(&self) {
        let _generation = self.inner.lock_generation();
        self.inner.stopped.store(true, Ordering::SeqCst);
        self.inner.cancel_timer();
        tracing::debug!("Session manager stopped");
    }

    /// Install credentials obtained by a login or OAuth callback and arm
    /// their refresh timer.
    pub fn install(
        &self,
        tokens: &TokenPair,
        user: Option<&serde_json::Value>,
    ) -> Result<ScheduleOutcome> {
        let user_json = user.map(serde_json::Value::to_string);

        let mut generation = self.inner.lock_generation();
        *generation = generation.wrapping_add(1);

        let mut entries = vec![
            (keys::ACCESS_TOKEN, tokens.access_token.as_str()),
            (keys::REFRESH_TOKEN, tokens.refresh_token.as_str()),
        ];
        if let Some(user_json) = user_json.as_deref() {
            entries.push((keys::USER, user_json));
        } else {
            self.inner.store.clear(&[keys::USER])?;
        }
        self.inner.store.set_all(&entries)?;

        self.inner.stopped.store(false, Ordering::SeqCst);
        let outcome = self.inner.arm(&tokens.access_token);
        drop(generation);

        self.inner.events.emit(SessionEvent::LoggedIn);
        Ok(outcome)
    }

    /// Log in with username and password, then install the session.
    pub async fn login(&self, username: &str, password: &str) -> Result<ScheduleOutcome> {
        let response = self.inner.api.login(username, password).await?;
        tracing::info!(username, "Logged in");

        let tokens = TokenPair {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        };
        self.install(&tokens, response.user.as_ref())
    }

    /// End the session: cancel the timer, clear credentials, tell the server.
    ///
    /// The server call is best effort; local state is cleared regardless.
    pub async fn logout(&self) {
        let refresh_token = self.inner.store.get(keys::REFRESH_TOKEN);
        self.inner.end_session(SessionEndReason::LoggedOut);

        if let Some(refresh_token) = refresh_token {
            if let Err(e) = self.inner.api.logout(&refresh_token).await {
                tracing::warn!(error = %e, "Server-side logout failed");
            }
        }
        tracing::info!("Logged out");
    }

    // ─── Refresh ─────────────────────────────────────────────────────────────

    /// Arm the refresh timer for `access_token`, replacing any armed timer.
    pub fn schedule(&self, access_token: &str) -> ScheduleOutcome {
        self.inner.schedule(access_token)
    }

    /// Exchange the refresh token now.
    ///
    /// This is what the timer runs. Concurrent calls are collapsed: while one
    /// is outstanding, others return [`RefreshOutcome::AlreadyInFlight`].
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.inner.refresh().await
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.load(Ordering::SeqCst)
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    pub fn access_token(&self) -> Option<String> {
        self.inner.store.get(keys::ACCESS_TOKEN)
    }

    /// Cached user profile, if one is stored and parses.
    pub fn current_user(&self) -> Option<serde_json::Value> {
        let raw = self.inner.store.get(keys::USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Stored user profile is not valid JSON");
                None
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }
}

impl Inner {
    fn schedule(self: &Arc<Self>, access_token: &str) -> ScheduleOutcome {
        let _generation = self.lock_generation();
        if self.refreshing.load(Ordering::SeqCst) {
            tracing::debug!("Refresh in flight, ignoring schedule request");
            return ScheduleOutcome::RefreshInFlight;
        }
        if self.stopped.load(Ordering::SeqCst) {
            return ScheduleOutcome::Stopped;
        }
        self.arm(access_token)
    }

    /// Replace the armed timer with one derived from `access_token`.
    fn arm(self: &Arc<Self>, access_token: &str) -> ScheduleOutcome {
        let claims = match decode_claims(access_token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "Cannot decode access token, refresh not scheduled");
                return ScheduleOutcome::DecodeFailed;
            }
        };

        let Some(exp) = claims.exp else {
            tracing::warn!("Access token has no exp claim, refresh not scheduled");
            return ScheduleOutcome::MissingExpiry;
        };

        let delay = refresh_delay(exp, self.clock.now(), self.refresh_buffer);

        // The callback only holds a weak reference, so a dropped manager is
        // never kept alive (or refreshed) by its own timer.
        let weak = Arc::downgrade(self);
        let task: BoxFuture<'static, ()> = Box::pin(async move {
            if let Some(inner) = weak.upgrade() {
                inner.refresh().await;
            }
        });

        let mut slot = self.lock_timer();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        *slot = Some(self.clock.schedule(delay, task));
        drop(slot);

        let expires_at = format_unix_secs(exp);
        tracing::info!(
            delay_secs = delay.as_secs(),
            expires_at = expires_at.as_deref(),
            "Token refresh scheduled"
        );
        ScheduleOutcome::Armed { delay }
    }

    async fn refresh(self: &Arc<Self>) -> RefreshOutcome {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Refresh already in flight, skipping");
            return RefreshOutcome::AlreadyInFlight;
        }
        let _guard = RefreshGuard(&self.refreshing);

        let (started_in, refresh_token) = {
            let generation = self.lock_generation();
            let started_in = *generation;
            (started_in, self.store.get(keys::REFRESH_TOKEN))
        };
        let Some(refresh_token) = refresh_token else {
            tracing::info!("No refresh token stored, nothing to refresh");
            return RefreshOutcome::MissingRefreshToken;
        };

        tracing::info!("Refreshing access token");
        let result = self.api.refresh(&refresh_token).await;

        // Checked and committed under one lock so a concurrent stop, logout
        // or install lands entirely before or entirely after this block.
        let mut generation = self.lock_generation();
        if *generation != started_in {
            tracing::info!("Session replaced during refresh, discarding result");
            return RefreshOutcome::Discarded;
        }
        if self.stopped.load(Ordering::SeqCst) {
            tracing::info!("Session stopped during refresh, discarding result");
            return RefreshOutcome::Discarded;
        }

        match result {
            Ok(refreshed) => {
                let pair = refreshed.into_pair(&refresh_token);

                if let Err(e) = self.store.set_all(&[
                    (keys::ACCESS_TOKEN, pair.access_token.as_str()),
                    (keys::REFRESH_TOKEN, pair.refresh_token.as_str()),
                ]) {
                    tracing::warn!(error = %e, "Failed to persist refreshed tokens");
                    return RefreshOutcome::TransientFailure;
                }

                // Persist before re-arming so the next delay comes from the new token.
                self.arm(&pair.access_token);

                let expires_at = decode_claims(&pair.access_token)
                    .ok()
                    .and_then(|claims| claims.expires_at());
                self.events.emit(SessionEvent::Refreshed { expires_at });

                tracing::info!("Access token refreshed");
                RefreshOutcome::Refreshed
            }
            Err(e) if e.is_terminal() => {
                tracing::warn!(error = %e, "Refresh token rejected, ending session");
                self.end_session_locked(&mut generation, SessionEndReason::RefreshRejected);
                drop(generation);

                self.ui.show_message(SESSION_EXPIRED_MESSAGE);
                self.ui.redirect_to_login();
                RefreshOutcome::Rejected
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, keeping current session");
                RefreshOutcome::TransientFailure
            }
        }
    }

    fn end_session(&self, reason: SessionEndReason) {
        let mut generation = self.lock_generation();
        self.end_session_locked(&mut generation, reason);
    }

    fn end_session_locked(&self, generation: &mut u64, reason: SessionEndReason) {
        *generation = generation.wrapping_add(1);
        self.stopped.store(true, Ordering::SeqCst);
        self.cancel_timer();

        if let Err(e) = self.store.clear(&keys::ALL) {
            tracing::error!(error = %e, "Failed to clear session storage");
        }
        self.events.emit(SessionEvent::Ended { reason });
    }

    fn cancel_timer(&self) {
        if let Some(timer) = self.lock_timer().take() {
            timer.cancel();
        }
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_timer(&self) -> MutexGuard<'_, Option<TimerHandle>> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_delay_law() {
        let buffer = Duration::from_secs(300);
        assert_eq!(refresh_delay(2000, 1000, buffer), Duration::from_secs(700));
        assert_eq!(refresh_delay(1200, 1000, buffer), Duration::ZERO);
        assert_eq!(refresh_delay(1300, 1000, buffer), Duration::ZERO);
        assert_eq!(refresh_delay(500, 1000, buffer), Duration::ZERO);
    }

    #[test]
    fn test_refresh_delay_extreme_values() {
        assert_eq!(
            refresh_delay(i64::MIN, i64::MAX, DEFAULT_REFRESH_BUFFER),
            Duration::ZERO
        );
        assert_eq!(
            refresh_delay(i64::MAX, 0, Duration::ZERO),
            Duration::from_secs(i64::MAX as u64)
        );
    }
}
