/// Entitlement enforcement service
///
/// Loads the inputs of the resolver for an authenticated request (account
/// plan, module settings, live count) and turns the verdict into an
/// allow/deny decision.
///
/// # Creates and the limit race
///
/// [`EntitlementService::enforce`] is check-then-act: the count is read, the
/// verdict computed, and the caller inserts afterwards. Two concurrent creates
/// that both read `limit - 1` are both allowed and the account ends one over
/// its limit.
///
/// [`EntitlementService::begin_create`] closes that window. It opens a
/// transaction, takes `SELECT ... FOR UPDATE` on the account row, counts inside
/// the transaction and hands the transaction back to the caller, who inserts
/// through [`GuardedCreate::conn`] and commits. Creates for one account are
/// serialized on the row lock; reads and other accounts are unaffected.
/// With `strict_limits = false` the lock is skipped and the race is back.

use std::fmt;

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use super::store::{count_module_resources, AccountPlanRef, EntitlementStore, PgEntitlementStore};
use super::verdict::{resolve, Action, EntitlementDenial, EntitlementVerdict};
use crate::auth::middleware::AuthContext;
use crate::models::business_account::BusinessAccount;
use crate::models::module::ModuleType;
use crate::models::plan_module::PlanModule;
use crate::models::user::UserRole;

/// Entitlement service errors
#[derive(Debug, Error)]
pub enum EntitlementError {
    /// The verdict denies the action
    #[error("{0}")]
    Denied(EntitlementDenial),

    /// The actor isn't attached to a business account
    #[error("No business account associated with this user")]
    NoAccount,

    /// The account doesn't exist or was deleted
    #[error("Business account not found: {0}")]
    AccountNotFound(Uuid),

    /// The account has been deactivated
    #[error("Business account is inactive: {0}")]
    AccountInactive(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<EntitlementDenial> for EntitlementError {
    fn from(denial: EntitlementDenial) -> Self {
        EntitlementError::Denied(denial)
    }
}

/// Verdict of one module, as listed by the permissions endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModulePermission {
    pub module_type: ModuleType,
    #[serde(flatten)]
    pub verdict: EntitlementVerdict,
}

/// Resolves and enforces entitlements for authenticated requests
///
/// # Example
///
/// ```no_run
/// use controly_shared::auth::middleware::AuthContext;
/// use controly_shared::entitlement::{Action, EntitlementService};
/// use controly_shared::models::company::{Company, CreateCompany};
/// use controly_shared::models::module::ModuleType;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, auth: AuthContext) -> Result<(), Box<dyn std::error::Error>> {
/// let service = EntitlementService::postgres(pool, true);
///
/// // Read paths
/// service.enforce(&auth, ModuleType::Contacts, Action::View).await?;
///
/// // Limit-checked create
/// let mut guard = service.begin_create(&auth, ModuleType::Contacts).await?;
/// let account_id = auth.business_account_id.unwrap();
/// Company::create(guard.conn(), account_id, auth.user_id, CreateCompany {
///     name: "Initech".to_string(),
///     ..Default::default()
/// }).await?;
/// guard.commit().await?;
/// # Ok(())
/// # }
/// ```
pub struct EntitlementService<S = PgEntitlementStore> {
    store: S,
    strict_limits: bool,
}

impl<S> fmt::Debug for EntitlementService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitlementService")
            .field("strict_limits", &self.strict_limits)
            .finish()
    }
}

impl EntitlementService<PgEntitlementStore> {
    /// Creates a service backed by PostgreSQL
    pub fn postgres(pool: PgPool, strict_limits: bool) -> Self {
        EntitlementService::new(PgEntitlementStore::new(pool), strict_limits)
    }

    /// Opens a limit-checked create for `module`
    ///
    /// On success the returned guard holds an open transaction in which the
    /// account's count was read and found below the limit. Insert through
    /// [`GuardedCreate::conn`] and call [`GuardedCreate::commit`]; dropping the
    /// guard rolls back.
    ///
    /// # Errors
    ///
    /// - `Denied(PlanLimitExceeded)` when the account is at its limit
    /// - `Denied(ModuleNotAvailable)` / `Denied(InsufficientRole)` per verdict
    /// - `NoAccount`, `AccountNotFound`, `AccountInactive` (never for `SUPER_ADMIN`)
    pub async fn begin_create(
        &self,
        auth: &AuthContext,
        module: ModuleType,
    ) -> Result<GuardedCreate, EntitlementError> {
        let mut tx = self.store.pool().begin().await?;

        let verdict = match auth.business_account_id {
            Some(account_id) => {
                let account = if self.strict_limits {
                    BusinessAccount::lock_for_update(&mut tx, account_id).await?
                } else {
                    BusinessAccount::find_by_id(&mut *tx, account_id).await?
                };

                if auth.is_super_admin() {
                    let count = match account {
                        Some(_) => count_module_resources(&mut *tx, account_id, module).await?,
                        None => 0,
                    };
                    EntitlementVerdict::unrestricted(count)
                } else {
                    let plan =
                        check_account(account_id, account.as_ref().map(AccountPlanRef::from))?;
                    let config = match plan.plan_id {
                        Some(plan_id) => PlanModule::find(&mut *tx, plan_id, module)
                            .await?
                            .map(|row| row.config()),
                        None => None,
                    };
                    let count = count_module_resources(&mut *tx, account_id, module).await?;

                    resolve(auth.role, config.as_ref(), count)
                }
            }
            None if auth.role == Some(UserRole::SuperAdmin) => EntitlementVerdict::unrestricted(0),
            None => return Err(EntitlementError::NoAccount),
        };

        if let Err(denial) = verdict.authorize(module, Action::Create) {
            log_denial(auth, &denial);
            // tx dropped here, rolling back and releasing the lock
            return Err(denial.into());
        }

        Ok(GuardedCreate { tx, verdict })
    }
}

impl<S: EntitlementStore> EntitlementService<S> {
    /// Creates a service over any store
    pub fn new(store: S, strict_limits: bool) -> Self {
        EntitlementService { store, strict_limits }
    }

    /// Whether creates go through the locked path
    pub fn strict_limits(&self) -> bool {
        self.strict_limits
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Computes the verdict of `module` for the request's actor
    ///
    /// A `SUPER_ADMIN` always gets the unrestricted verdict, whether its
    /// account is inactive, deleted or absent. The count is the account's
    /// live count when the account exists, zero otherwise.
    pub async fn verdict(
        &self,
        auth: &AuthContext,
        module: ModuleType,
    ) -> Result<EntitlementVerdict, EntitlementError> {
        let account_id = match auth.business_account_id {
            Some(account_id) => account_id,
            None if auth.role == Some(UserRole::SuperAdmin) => {
                return Ok(EntitlementVerdict::unrestricted(0));
            }
            None => return Err(EntitlementError::NoAccount),
        };

        let account = self.store.account_plan(account_id).await?;

        // Operators are never gated by the state or plan of their account
        if auth.is_super_admin() {
            let count = match account {
                Some(_) => self.store.count_resources(account_id, module).await?,
                None => 0,
            };
            return Ok(EntitlementVerdict::unrestricted(count));
        }

        let plan = check_account(account_id, account)?;

        let config = match plan.plan_id {
            Some(plan_id) => self.store.plan_module_config(plan_id, module).await?,
            None => None,
        };
        let count = self.store.count_resources(account_id, module).await?;

        Ok(resolve(auth.role, config.as_ref(), count))
    }

    /// Checks `action` on `module` and returns the verdict it was decided on
    ///
    /// This is the unguarded check: for creates, prefer
    /// [`EntitlementService::begin_create`] when limits must hold under
    /// concurrency.
    pub async fn enforce(
        &self,
        auth: &AuthContext,
        module: ModuleType,
        action: Action,
    ) -> Result<EntitlementVerdict, EntitlementError> {
        let verdict = self.verdict(auth, module).await?;

        if let Err(denial) = verdict.authorize(module, action) {
            log_denial(auth, &denial);
            return Err(denial.into());
        }

        Ok(verdict)
    }

    /// Verdicts of every catalog module, in catalog order
    pub async fn permissions(
        &self,
        auth: &AuthContext,
    ) -> Result<Vec<ModulePermission>, EntitlementError> {
        let mut permissions = Vec::with_capacity(ModuleType::ALL.len());

        for module_type in ModuleType::ALL {
            let verdict = self.verdict(auth, module_type).await?;
            permissions.push(ModulePermission { module_type, verdict });
        }

        Ok(permissions)
    }
}

fn check_account(
    account_id: Uuid,
    plan: Option<AccountPlanRef>,
) -> Result<AccountPlanRef, EntitlementError> {
    let plan = plan.ok_or(EntitlementError::AccountNotFound(account_id))?;

    if !plan.is_active {
        return Err(EntitlementError::AccountInactive(account_id));
    }

    Ok(plan)
}

fn log_denial(auth: &AuthContext, denial: &EntitlementDenial) {
    let details = denial.details();

    tracing::info!(
        user_id = %auth.user_id,
        account_id = ?auth.business_account_id,
        module = %details.module_type,
        action = %details.action,
        current_count = details.current_count,
        limit = ?details.limit,
        code = denial.code(),
        "Entitlement denied"
    );
}

/// Open transaction of an allowed, limit-checked create
///
/// Holds the account row lock (in strict mode) until committed or dropped.
pub struct GuardedCreate {
    tx: Transaction<'static, Postgres>,
    verdict: EntitlementVerdict,
}

impl GuardedCreate {
    /// Connection to insert through
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Verdict the create was allowed on
    pub fn verdict(&self) -> &EntitlementVerdict {
        &self.verdict
    }

    /// Commits the insert and releases the lock
    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}

impl fmt::Debug for GuardedCreate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedCreate")
            .field("verdict", &self.verdict)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::verdict::PlanModuleConfig;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FixedStore {
        account: Option<AccountPlanRef>,
        configs: HashMap<ModuleType, PlanModuleConfig>,
        count: u32,
    }

    #[async_trait]
    impl EntitlementStore for FixedStore {
        async fn account_plan(&self, _: Uuid) -> Result<Option<AccountPlanRef>, sqlx::Error> {
            Ok(self.account)
        }

        async fn plan_module_config(
            &self,
            _: Uuid,
            module: ModuleType,
        ) -> Result<Option<PlanModuleConfig>, sqlx::Error> {
            Ok(self.configs.get(&module).copied())
        }

        async fn count_resources(&self, _: Uuid, _: ModuleType) -> Result<u32, sqlx::Error> {
            Ok(self.count)
        }
    }

    fn contacts_plan(limit: u32, count: u32) -> FixedStore {
        let mut configs = HashMap::new();
        configs.insert(
            ModuleType::Contacts,
            PlanModuleConfig {
                is_included: true,
                item_limit: Some(limit),
                can_create: true,
                can_edit: true,
                can_delete: false,
            },
        );

        FixedStore {
            account: Some(AccountPlanRef {
                plan_id: Some(Uuid::new_v4()),
                is_active: true,
            }),
            configs,
            count,
        }
    }

    fn member(role: UserRole) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role: Some(role),
            business_account_id: Some(Uuid::new_v4()),
        }
    }

    #[tokio::test]
    async fn test_enforce_allows_within_limit() {
        let service = EntitlementService::new(contacts_plan(100, 79), true);
        let verdict = service
            .enforce(&member(UserRole::User), ModuleType::Contacts, Action::Create)
            .await
            .unwrap();

        assert!(verdict.can_create);
        assert!(!verdict.is_near_limit);
    }

    #[tokio::test]
    async fn test_enforce_denies_create_at_limit() {
        let service = EntitlementService::new(contacts_plan(100, 100), true);
        let err = service
            .enforce(&member(UserRole::User), ModuleType::Contacts, Action::Create)
            .await
            .unwrap_err();

        match err {
            EntitlementError::Denied(denial) => assert_eq!(denial.code(), "PLAN_LIMIT_EXCEEDED"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_enforce_module_without_row_is_unavailable() {
        let service = EntitlementService::new(contacts_plan(100, 0), true);
        let err = service
            .enforce(&member(UserRole::BusinessAdmin), ModuleType::Crm, Action::View)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EntitlementError::Denied(EntitlementDenial::ModuleNotAvailable(_))
        ));
    }

    #[tokio::test]
    async fn test_account_without_plan_gets_nothing() {
        let store = FixedStore {
            account: Some(AccountPlanRef {
                plan_id: None,
                is_active: true,
            }),
            configs: HashMap::new(),
            count: 0,
        };
        let service = EntitlementService::new(store, true);

        let permissions = service.permissions(&member(UserRole::BusinessAdmin)).await.unwrap();
        assert_eq!(permissions.len(), 3);
        assert!(permissions.iter().all(|p| !p.verdict.can_view));
    }

    #[tokio::test]
    async fn test_inactive_and_missing_accounts() {
        let mut store = contacts_plan(10, 0);
        store.account = Some(AccountPlanRef {
            plan_id: None,
            is_active: false,
        });
        let service = EntitlementService::new(store, true);
        let err = service
            .verdict(&member(UserRole::User), ModuleType::Contacts)
            .await
            .unwrap_err();
        assert!(matches!(err, EntitlementError::AccountInactive(_)));

        let mut store = contacts_plan(10, 0);
        store.account = None;
        let service = EntitlementService::new(store, true);
        let err = service
            .verdict(&member(UserRole::User), ModuleType::Contacts)
            .await
            .unwrap_err();
        assert!(matches!(err, EntitlementError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn test_super_admin_ignores_account_state() {
        let mut store = contacts_plan(10, 4);
        store.account = Some(AccountPlanRef {
            plan_id: None,
            is_active: false,
        });
        let service = EntitlementService::new(store, true);

        let operator = member(UserRole::SuperAdmin);
        for module in ModuleType::ALL {
            let verdict = service.verdict(&operator, module).await.unwrap();
            assert_eq!(verdict, EntitlementVerdict::unrestricted(4));
        }
        service
            .enforce(&operator, ModuleType::Contacts, Action::Create)
            .await
            .unwrap();

        let mut store = contacts_plan(10, 4);
        store.account = None;
        let service = EntitlementService::new(store, true);

        let verdict = service.verdict(&operator, ModuleType::Contacts).await.unwrap();
        assert_eq!(verdict, EntitlementVerdict::unrestricted(0));

        let permissions = service.permissions(&operator).await.unwrap();
        assert!(permissions.iter().all(|p| p.verdict.can_delete && p.verdict.item_limit.is_none()));
    }

    #[tokio::test]
    async fn test_user_without_account() {
        let service = EntitlementService::new(contacts_plan(10, 0), true);

        let orphan = AuthContext {
            user_id: Uuid::new_v4(),
            role: Some(UserRole::User),
            business_account_id: None,
        };
        let err = service.verdict(&orphan, ModuleType::Users).await.unwrap_err();
        assert!(matches!(err, EntitlementError::NoAccount));

        let operator = AuthContext {
            role: Some(UserRole::SuperAdmin),
            ..orphan
        };
        let verdict = service.verdict(&operator, ModuleType::Users).await.unwrap();
        assert_eq!(verdict, EntitlementVerdict::unrestricted(0));
    }

    #[test]
    fn test_module_permission_flattens_verdict() {
        let permission = ModulePermission {
            module_type: ModuleType::Crm,
            verdict: EntitlementVerdict::unavailable(0),
        };
        let json = serde_json::to_value(permission).unwrap();

        assert_eq!(json["moduleType"], "CRM");
        assert_eq!(json["canView"], false);
        assert!(json.get("verdict").is_none());
    }
}
