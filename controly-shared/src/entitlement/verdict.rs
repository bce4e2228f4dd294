/// Entitlement resolver
///
/// Pure decision logic: given the actor's role, the plan's settings for one
/// module, and a fresh resource count, produce an [`EntitlementVerdict`]. The
/// same function backs both the enforcement path and the read-only
/// permissions endpoint, so the two can never disagree.
///
/// # Rules
///
/// 1. `SUPER_ADMIN` gets every capability, no limit, no limit flags.
/// 2. A missing role, a missing settings row or `is_included = false` gives
///    nothing ("module not available").
/// 3. Otherwise `can_view` is true and the write flags come from the plan.
/// 4. With a limit `L` and count `c`: at limit when `c >= L`, near limit when
///    `c >= 0.8 * L`. At limit forces `can_create` to false.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::module::ModuleType;
use crate::models::user::UserRole;

/// Percentage of the item limit from which a module is "near limit"
pub const NEAR_LIMIT_PERCENT: u64 = 80;

/// Plan settings for one module, as consumed by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanModuleConfig {
    pub is_included: bool,

    /// `None` means unbounded
    pub item_limit: Option<u32>,

    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

/// Action requested on a module's resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computed allow/deny and limit state for one module
///
/// Derived per request and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementVerdict {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub item_limit: Option<u32>,
    pub current_count: u32,
    pub is_near_limit: bool,
    pub is_at_limit: bool,
}

impl EntitlementVerdict {
    /// Verdict that grants nothing
    pub fn unavailable(current_count: u32) -> Self {
        EntitlementVerdict {
            can_view: false,
            can_create: false,
            can_edit: false,
            can_delete: false,
            item_limit: None,
            current_count,
            is_near_limit: false,
            is_at_limit: false,
        }
    }

    /// Verdict that grants everything without a limit
    pub fn unrestricted(current_count: u32) -> Self {
        EntitlementVerdict {
            can_view: true,
            can_create: true,
            can_edit: true,
            can_delete: true,
            item_limit: None,
            current_count,
            is_near_limit: false,
            is_at_limit: false,
        }
    }

    /// Whether the verdict permits `action`
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.can_view,
            Action::Create => self.can_create,
            Action::Edit => self.can_edit,
            Action::Delete => self.can_delete,
        }
    }

    /// Converts the verdict into a decision for one action
    ///
    /// Denials are ordered: module not available first, then the limit (only
    /// for creates), then the capability flag. Limit state never blocks edits
    /// or deletes, so an over-limit account can always free up space.
    pub fn authorize(&self, module: ModuleType, action: Action) -> Result<(), EntitlementDenial> {
        let details = || DenialDetails {
            module_type: module,
            action,
            current_count: self.current_count,
            limit: self.item_limit,
        };

        if !self.can_view {
            return Err(EntitlementDenial::ModuleNotAvailable(details()));
        }

        match action {
            Action::View => Ok(()),
            Action::Create if self.is_at_limit => Err(EntitlementDenial::PlanLimitExceeded(details())),
            _ if self.allows(action) => Ok(()),
            _ => Err(EntitlementDenial::InsufficientRole(details())),
        }
    }
}

/// Resolves the entitlement verdict for one module
///
/// Pure: identical inputs always give identical verdicts.
///
/// # Example
///
/// ```
/// use controly_shared::entitlement::{resolve, Action, PlanModuleConfig};
/// use controly_shared::models::module::ModuleType;
/// use controly_shared::models::user::UserRole;
///
/// let config = PlanModuleConfig {
///     is_included: true,
///     item_limit: Some(100),
///     can_create: true,
///     can_edit: true,
///     can_delete: true,
/// };
///
/// let verdict = resolve(Some(UserRole::User), Some(&config), 80);
/// assert!(verdict.is_near_limit);
/// assert!(verdict.authorize(ModuleType::Contacts, Action::Create).is_ok());
///
/// let verdict = resolve(Some(UserRole::User), Some(&config), 100);
/// assert!(!verdict.can_create);
/// assert_eq!(
///     verdict.authorize(ModuleType::Contacts, Action::Create).unwrap_err().code(),
///     "PLAN_LIMIT_EXCEEDED"
/// );
/// ```
pub fn resolve(
    role: Option<UserRole>,
    config: Option<&PlanModuleConfig>,
    current_count: u32,
) -> EntitlementVerdict {
    let role = match role {
        Some(role) => role,
        None => return EntitlementVerdict::unavailable(current_count),
    };

    if role == UserRole::SuperAdmin {
        return EntitlementVerdict::unrestricted(current_count);
    }

    let config = match config {
        Some(config) if config.is_included => config,
        _ => return EntitlementVerdict::unavailable(current_count),
    };

    let (is_at_limit, is_near_limit) = match config.item_limit {
        Some(limit) => limit_state(current_count, limit),
        None => (false, false),
    };

    EntitlementVerdict {
        can_view: true,
        can_create: config.can_create && !is_at_limit,
        can_edit: config.can_edit,
        can_delete: config.can_delete,
        item_limit: config.item_limit,
        current_count,
        is_near_limit,
        is_at_limit,
    }
}

/// `(at_limit, near_limit)` for a bounded module
fn limit_state(current_count: u32, limit: u32) -> (bool, bool) {
    let count = u64::from(current_count);
    let limit = u64::from(limit);

    (count >= limit, count * 100 >= limit * NEAR_LIMIT_PERCENT)
}

/// Context attached to every denial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialDetails {
    pub module_type: ModuleType,
    pub action: Action,
    pub current_count: u32,
    pub limit: Option<u32>,
}

/// Negative entitlement decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntitlementDenial {
    /// The account's plan doesn't include the module
    ModuleNotAvailable(DenialDetails),

    /// A create would exceed the plan's item limit
    PlanLimitExceeded(DenialDetails),

    /// The module is included but the plan withholds this capability
    InsufficientRole(DenialDetails),
}

impl EntitlementDenial {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            EntitlementDenial::ModuleNotAvailable(_) => "MODULE_NOT_AVAILABLE",
            EntitlementDenial::PlanLimitExceeded(_) => "PLAN_LIMIT_EXCEEDED",
            EntitlementDenial::InsufficientRole(_) => "INSUFFICIENT_ROLE",
        }
    }

    pub fn details(&self) -> &DenialDetails {
        match self {
            EntitlementDenial::ModuleNotAvailable(details)
            | EntitlementDenial::PlanLimitExceeded(details)
            | EntitlementDenial::InsufficientRole(details) => details,
        }
    }
}

impl fmt::Display for EntitlementDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let details = self.details();
        let module = details.module_type.definition().name;

        match self {
            EntitlementDenial::ModuleNotAvailable(_) => write!(
                f,
                "The {} module is not included in your plan",
                module
            ),
            EntitlementDenial::PlanLimitExceeded(_) => write!(
                f,
                "{} limit reached ({}/{}); upgrade your plan or remove items to add more",
                module,
                details.current_count,
                details.limit.unwrap_or(details.current_count)
            ),
            EntitlementDenial::InsufficientRole(_) => write!(
                f,
                "Your plan does not allow the {} action on {}",
                details.action, module
            ),
        }
    }
}

impl std::error::Error for EntitlementDenial {}

#[cfg(test)]
mod tests {
    use super::*;

    fn included(item_limit: Option<u32>) -> PlanModuleConfig {
        PlanModuleConfig {
            is_included: true,
            item_limit,
            can_create: true,
            can_edit: true,
            can_delete: true,
        }
    }

    #[test]
    fn test_super_admin_ignores_plan() {
        let verdict = resolve(Some(UserRole::SuperAdmin), None, 42);
        assert_eq!(verdict, EntitlementVerdict::unrestricted(42));

        let excluded = PlanModuleConfig::default();
        let verdict = resolve(Some(UserRole::SuperAdmin), Some(&excluded), 42);
        assert!(verdict.can_create);
        assert_eq!(verdict.item_limit, None);
    }

    #[test]
    fn test_missing_role_fails_closed() {
        let verdict = resolve(None, Some(&included(None)), 3);
        assert_eq!(verdict, EntitlementVerdict::unavailable(3));
    }

    #[test]
    fn test_excluded_module_ignores_stored_flags() {
        let config = PlanModuleConfig {
            is_included: false,
            item_limit: Some(10),
            can_create: true,
            can_edit: true,
            can_delete: true,
        };

        let verdict = resolve(Some(UserRole::BusinessAdmin), Some(&config), 50);
        assert!(!verdict.can_view);
        assert!(!verdict.can_create);
        assert!(!verdict.is_at_limit);
        assert_eq!(verdict.item_limit, None);
    }

    #[test]
    fn test_zero_limit_is_at_limit_immediately() {
        let verdict = resolve(Some(UserRole::User), Some(&included(Some(0))), 0);
        assert!(verdict.can_view);
        assert!(verdict.is_at_limit);
        assert!(verdict.is_near_limit);
        assert!(!verdict.can_create);
    }

    #[test]
    fn test_near_limit_uses_exact_integer_threshold() {
        // 0.8 * 7 = 5.6
        assert_eq!(limit_state(5, 7), (false, false));
        assert_eq!(limit_state(6, 7), (false, true));
        assert_eq!(limit_state(u32::MAX, u32::MAX), (true, true));
    }

    #[test]
    fn test_authorize_order() {
        let unavailable = EntitlementVerdict::unavailable(0);
        let err = unavailable.authorize(ModuleType::Crm, Action::View).unwrap_err();
        assert_eq!(err.code(), "MODULE_NOT_AVAILABLE");

        let at_limit = resolve(Some(UserRole::User), Some(&included(Some(5))), 5);
        let err = at_limit.authorize(ModuleType::Users, Action::Create).unwrap_err();
        assert_eq!(err.code(), "PLAN_LIMIT_EXCEEDED");
        assert_eq!(err.details().limit, Some(5));
        assert_eq!(err.details().current_count, 5);

        assert!(at_limit.authorize(ModuleType::Users, Action::Edit).is_ok());
        assert!(at_limit.authorize(ModuleType::Users, Action::Delete).is_ok());
    }

    #[test]
    fn test_authorize_withheld_capability() {
        let config = PlanModuleConfig {
            can_create: false,
            can_delete: false,
            ..included(None)
        };
        let verdict = resolve(Some(UserRole::BusinessAdmin), Some(&config), 0);

        assert!(verdict.authorize(ModuleType::Crm, Action::View).is_ok());
        assert!(verdict.authorize(ModuleType::Crm, Action::Edit).is_ok());
        assert_eq!(
            verdict.authorize(ModuleType::Crm, Action::Create).unwrap_err().code(),
            "INSUFFICIENT_ROLE"
        );
        assert_eq!(
            verdict.authorize(ModuleType::Crm, Action::Delete).unwrap_err().code(),
            "INSUFFICIENT_ROLE"
        );
    }

    #[test]
    fn test_verdict_serializes_camel_case() {
        let verdict = resolve(Some(UserRole::User), Some(&included(Some(100))), 80);
        let json = serde_json::to_value(verdict).unwrap();

        assert_eq!(json["canView"], true);
        assert_eq!(json["itemLimit"], 100);
        assert_eq!(json["currentCount"], 80);
        assert_eq!(json["isNearLimit"], true);
        assert_eq!(json["isAtLimit"], false);
    }

    #[test]
    fn test_denial_details_serialization() {
        let details = DenialDetails {
            module_type: ModuleType::Contacts,
            action: Action::Create,
            current_count: 100,
            limit: Some(100),
        };
        let json = serde_json::to_value(details).unwrap();

        assert_eq!(json["moduleType"], "CONTACTS");
        assert_eq!(json["action"], "create");
        assert_eq!(json["currentCount"], 100);
        assert_eq!(json["limit"], 100);
    }

    #[test]
    fn test_denial_display() {
        let denial = EntitlementDenial::PlanLimitExceeded(DenialDetails {
            module_type: ModuleType::Contacts,
            action: Action::Create,
            current_count: 100,
            limit: Some(100),
        });
        assert!(denial.to_string().contains("Contacts limit reached (100/100)"));
    }
}
