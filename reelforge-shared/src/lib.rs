//! # Reelforge Shared Library
//!
//! Data access, models, and authentication used by the Reelforge API server.
//!
//! ## Module Organization
//!
//! - `db`: Database handle, pool configuration, and migrations
//! - `models`: Database models and their queries
//! - `auth`: Password hashing, session tokens, the authentication adapter, and the auth service

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the Reelforge shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
