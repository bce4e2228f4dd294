/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh, current user
/// - `modules`, `plans`: Public catalog used during plan selection
/// - `permissions`: Per-module verdicts of the current user
/// - `account`: The current business account and its plan
/// - `users`, `companies`, `opportunities`, `activities`: Tenant resources
/// - `admin`: Platform operator endpoints

pub mod account;
pub mod activities;
pub mod admin;
pub mod auth;
pub mod companies;
pub mod health;
pub mod modules;
pub mod opportunities;
pub mod permissions;
pub mod plans;
pub mod users;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Clamps `limit`/`offset` query parameters
pub(crate) fn page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset.unwrap_or(0).max(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults_and_bounds() {
        assert_eq!(page(None, None), (50, 0));
        assert_eq!(page(Some(0), Some(-5)), (1, 0));
        assert_eq!(page(Some(10_000), Some(40)), (200, 40));
    }
}
