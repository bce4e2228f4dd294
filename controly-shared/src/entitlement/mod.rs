/// Module/plan entitlements and limit enforcement
///
/// An account's plan decides, per module, whether the module is available,
/// which write actions are allowed, and how many items may exist. This module
/// resolves those settings into a verdict and enforces it.
///
/// # Modules
///
/// - [`verdict`]: the pure resolver, actions and denials
/// - [`store`]: data access the service depends on
/// - [`service`]: request-level enforcement, including the locked create path
///
/// # Denials
///
/// | Code                   | Meaning                                       |
/// |------------------------|-----------------------------------------------|
/// | `MODULE_NOT_AVAILABLE` | plan doesn't include the module               |
/// | `PLAN_LIMIT_EXCEEDED`  | create attempted at or over the item limit    |
/// | `INSUFFICIENT_ROLE`    | module included but the action is withheld    |

pub mod service;
pub mod store;
pub mod verdict;

pub use service::{EntitlementError, EntitlementService, GuardedCreate, ModulePermission};
pub use store::{AccountPlanRef, EntitlementStore, PgEntitlementStore};
pub use verdict::{
    resolve, Action, DenialDetails, EntitlementDenial, EntitlementVerdict, PlanModuleConfig,
    NEAR_LIMIT_PERCENT,
};
