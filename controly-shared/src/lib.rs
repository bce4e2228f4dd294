//! # Controly Shared Library
//!
//! Domain types and business rules shared by the Controly API server.
//!
//! ## Module Organization
//!
//! - `models`: database models (plans, accounts, users, CRM records)
//! - `entitlement`: module/plan entitlement resolver and limit enforcement
//! - `auth`: passwords, JWT, middleware, role gates
//! - `db`: connection pool and embedded migrations

pub mod auth;
pub mod db;
pub mod entitlement;
pub mod models;

/// Current version of the Controly shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
