// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - auth API access and session management.

pub mod auth_api;
pub mod session;

pub use auth_api::{AuthApi, HttpAuthApi};
pub use session::{RefreshOutcome, ScheduleOutcome, SessionManager};
