/// Data access for entitlement checks
///
/// [`EntitlementStore`] is the seam between the resolver and the database.
/// [`PgEntitlementStore`] is the production implementation; tests may provide
/// an in-memory one.

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::verdict::PlanModuleConfig;
use crate::models::business_account::BusinessAccount;
use crate::models::company::Company;
use crate::models::module::ModuleType;
use crate::models::opportunity::Opportunity;
use crate::models::plan_module::PlanModule;
use crate::models::user::User;

/// Plan reference of a business account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountPlanRef {
    pub plan_id: Option<Uuid>,
    pub is_active: bool,
}

impl From<&BusinessAccount> for AccountPlanRef {
    fn from(account: &BusinessAccount) -> Self {
        AccountPlanRef {
            plan_id: account.plan_id,
            is_active: account.is_active,
        }
    }
}

/// Queries the entitlement service depends on
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Plan reference of a non-deleted account, `None` if it doesn't exist
    async fn account_plan(&self, account_id: Uuid) -> Result<Option<AccountPlanRef>, sqlx::Error>;

    /// Settings row for a plan/module pair, `None` if the plan has no row
    async fn plan_module_config(
        &self,
        plan_id: Uuid,
        module: ModuleType,
    ) -> Result<Option<PlanModuleConfig>, sqlx::Error>;

    /// Live count of the account's resources in a module
    async fn count_resources(&self, account_id: Uuid, module: ModuleType) -> Result<u32, sqlx::Error>;
}

/// PostgreSQL-backed entitlement store
#[derive(Debug, Clone)]
pub struct PgEntitlementStore {
    pool: PgPool,
}

impl PgEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        PgEntitlementStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EntitlementStore for PgEntitlementStore {
    async fn account_plan(&self, account_id: Uuid) -> Result<Option<AccountPlanRef>, sqlx::Error> {
        let account = BusinessAccount::find_by_id(&self.pool, account_id).await?;
        Ok(account.as_ref().map(AccountPlanRef::from))
    }

    async fn plan_module_config(
        &self,
        plan_id: Uuid,
        module: ModuleType,
    ) -> Result<Option<PlanModuleConfig>, sqlx::Error> {
        let row = PlanModule::find(&self.pool, plan_id, module).await?;
        Ok(row.map(|row| row.config()))
    }

    async fn count_resources(&self, account_id: Uuid, module: ModuleType) -> Result<u32, sqlx::Error> {
        count_module_resources(&self.pool, account_id, module).await
    }
}

/// Counts the non-deleted rows backing `module` for an account
///
/// | Module     | Counted table   |
/// |------------|-----------------|
/// | `USERS`    | `users`         |
/// | `CONTACTS` | `companies`     |
/// | `CRM`      | `opportunities` |
pub async fn count_module_resources<'e, E>(
    executor: E,
    account_id: Uuid,
    module: ModuleType,
) -> Result<u32, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let count = match module {
        ModuleType::Users => User::count_by_account(executor, account_id).await?,
        ModuleType::Contacts => Company::count_by_account(executor, account_id).await?,
        ModuleType::Crm => Opportunity::count_by_account(executor, account_id).await?,
    };

    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}
