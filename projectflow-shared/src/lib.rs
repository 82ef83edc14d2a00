//! # ProjectFlow Shared Library
//!
//! Domain core of the ProjectFlow task tracker, used by the API server.
//!
//! ## Module Organization
//!
//! - `rank`: Lexicographic rank keys for ordering tasks within a lane
//! - `auth`: Passwords, tokens, the token lifecycle and project authorization
//! - `models`: Persisted entities and their PostgreSQL queries
//! - `store`: Repository traits with PostgreSQL and in-memory backends
//! - `service`: Project, task, account and user operations
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod rank;
pub mod service;
pub mod store;

/// Current version of the ProjectFlow shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
