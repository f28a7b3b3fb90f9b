// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session-Keeper: keeps a learning platform API session alive.
//!
//! This crate decodes the access token's expiry, refreshes the credential
//! pair shortly before it lapses, and tears the session down when the
//! refresh token is rejected.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod services;
pub mod store;
pub mod time_utils;
pub mod token;
pub mod ui;
