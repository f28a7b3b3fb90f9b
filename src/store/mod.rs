// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session storage layer.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// Storage key names as constants.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    /// Serialized user profile (JSON)
    pub const USER: &str = "user";

    /// Every key owned by a session.
    pub const ALL: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, USER];
}

/// Key-value store holding the session credentials.
///
/// `set_all` and `clear` apply all of their keys together: a concurrent
/// `get` sees either none or all of the changes.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set_all(&self, entries: &[(&str, &str)]) -> Result<()>;

    fn clear(&self, keys: &[&str]) -> Result<()>;
}
