/// Role checks on the authenticated actor
///
/// Role gates are separate from plan entitlements: a `USER` may be allowed by
/// the plan to create companies but still not be allowed to invite users or
/// change the plan. These helpers answer "who may do this"; the entitlement
/// service answers "does the plan allow it".
///
/// # Role Hierarchy
///
/// `SUPER_ADMIN` > `BUSINESS_ADMIN` > `USER`
///
/// # Example
///
/// ```
/// use controly_shared::auth::authorization::{require_account, require_role};
/// use controly_shared::auth::middleware::AuthContext;
/// use controly_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// let auth = AuthContext {
///     user_id: Uuid::new_v4(),
///     role: Some(UserRole::User),
///     business_account_id: Some(Uuid::new_v4()),
/// };
///
/// assert!(require_account(&auth).is_ok());
/// assert!(require_role(&auth, UserRole::BusinessAdmin).is_err());
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::UserRole;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Actor isn't attached to a business account
    #[error("No business account associated with this user")]
    NoAccount,

    /// Token carries no role
    #[error("No role associated with this user")]
    MissingRole,

    #[error("Insufficient permissions: requires {}, has {}", .required.as_str(), .actual.as_str())]
    InsufficientRole { required: UserRole, actual: UserRole },
}

/// Returns the actor's business account
pub fn require_account(auth: &AuthContext) -> Result<Uuid, AuthzError> {
    auth.business_account_id.ok_or(AuthzError::NoAccount)
}

/// Requires the actor's role to be at least `required`
pub fn require_role(auth: &AuthContext, required: UserRole) -> Result<(), AuthzError> {
    let actual = auth.role.ok_or(AuthzError::MissingRole)?;

    if !actual.has_permission(&required) {
        return Err(AuthzError::InsufficientRole { required, actual });
    }

    Ok(())
}

/// Requires a platform operator
pub fn require_super_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    require_role(auth, UserRole::SuperAdmin)
}

/// Requires an administrator of a business account; returns the account
pub fn require_account_admin(auth: &AuthContext) -> Result<Uuid, AuthzError> {
    require_role(auth, UserRole::BusinessAdmin)?;
    require_account(auth)
}
