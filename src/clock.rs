// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Time source and one-shot timers.
//!
//! The session manager never touches the system clock or the tokio timer
//! directly; it goes through [`Clock`] so that tests can drive time by hand.

use futures_util::future::BoxFuture;
use std::time::Duration;

/// Wall-clock time plus one-shot deferred callbacks.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> i64;

    /// Run `task` once after `delay`. The returned handle cancels it.
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle;
}

/// Handle to an armed timer.
///
/// Dropping the handle does not cancel the timer; call [`TimerHandle::cancel`].
pub struct TimerHandle {
    cancel: Box<dyn FnOnce() + Send>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Cancel the timer. A no-op if it already fired.
    pub fn cancel(self) {
        (self.cancel)()
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}

/// Real clock backed by `chrono` and the tokio timer.
///
/// `schedule` must be called from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle {
        let sleeper = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detach the callback so cancelling this timer from inside the
            // callback (re-arming) cannot abort it halfway.
            tokio::spawn(task);
        });
        let abort = sleeper.abort_handle();
        TimerHandle::new(move || abort.abort())
    }
}

#[cfg(any(test, debug_assertions, feature = "test-util"))]
pub use manual::ManualClock;

#[cfg(any(test, debug_assertions, feature = "test-util"))]
mod manual {
    use super::{Clock, TimerHandle};
    use futures_util::future::BoxFuture;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct Entry {
        id: u64,
        due_at: i64,
        task: BoxFuture<'static, ()>,
    }

    #[derive(Default)]
    struct State {
        now: i64,
        next_id: u64,
        entries: Vec<Entry>,
    }

    /// Hand-driven clock for tests.
    ///
    /// Available in debug builds and with the `test-util` feature.
    ///
    /// Time only moves through [`ManualClock::advance`], which runs every due
    /// timer in due order.
    #[derive(Clone, Default)]
    pub struct ManualClock {
        state: Arc<Mutex<State>>,
    }

    impl ManualClock {
        pub fn new(now: i64) -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    now,
                    ..State::default()
                })),
            }
        }

        /// Number of armed, uncancelled timers.
        pub fn pending(&self) -> usize {
            self.lock().entries.len()
        }

        /// Due time of the earliest armed timer.
        pub fn next_due(&self) -> Option<i64> {
            self.lock().entries.iter().map(|e| e.due_at).min()
        }

        /// Move time forward and run every timer that becomes due.
        ///
        /// Time steps to each timer's due instant before its callback runs.
        /// Callbacks run one at a time with the internal lock released, so
        /// they may arm or cancel timers themselves; a timer armed by a
        /// callback runs in the same call if it falls due before the target.
        pub async fn advance(&self, by: Duration) {
            let target = self.now().saturating_add(whole_secs(by));

            while let Some(task) = self.take_due(target) {
                task.await;
            }
            self.lock().now = target;
        }

        fn take_due(&self, target: i64) -> Option<BoxFuture<'static, ()>> {
            let mut state = self.lock();
            let index = state
                .entries
                .iter()
                .enumerate()
                .filter(|(_, e)| e.due_at <= target)
                .min_by_key(|(_, e)| (e.due_at, e.id))
                .map(|(i, _)| i)?;
            let entry = state.entries.remove(index);
            state.now = state.now.max(entry.due_at);
            Some(entry.task)
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, State> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    /// Whole seconds in `d`, clamped to `i64::MAX`.
    fn whole_secs(d: Duration) -> i64 {
        i64::try_from(d.as_secs()).unwrap_or(i64::MAX)
    }

    impl Clock for ManualClock {
        fn now(&self) -> i64 {
            self.lock().now
        }

        fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle {
            let id = {
                let mut state = self.lock();
                let id = state.next_id;
                state.next_id += 1;
                let due_at = state.now.saturating_add(whole_secs(delay));
                state.entries.push(Entry { id, due_at, task });
                id
            };

            let state = Arc::downgrade(&self.state);
            TimerHandle::new(move || {
                if let Some(state) = state.upgrade() {
                    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                    state.entries.retain(|e| e.id != id);
                }
            })
        }
    }
}
