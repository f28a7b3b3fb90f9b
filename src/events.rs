// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle notifications.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

/// Capacity of the event channel; slow subscribers miss older events.
pub const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEndReason {
    /// The user logged out.
    LoggedOut,
    /// The auth API rejected the refresh token.
    RefreshRejected,
}

/// Events announced by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// New credentials were installed (login or OAuth callback).
    LoggedIn,
    /// The access token was renewed.
    Refreshed { expires_at: Option<DateTime<Utc>> },
    /// The session is gone; credentials were cleared.
    Ended { reason: SessionEndReason },
}

/// Sending half of the event channel, owned by the session manager.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }
}

impl EventBus {
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: SessionEvent) {
        tracing::debug!(?event, "Session event");
        let _ = self.sender.send(event);
    }
}
