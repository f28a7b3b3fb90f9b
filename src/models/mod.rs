// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the session and the auth API.

pub mod session;

pub use session::{ApiEnvelope, LoginResponse, RefreshedTokens, TokenPair};
