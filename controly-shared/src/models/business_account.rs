/// Business account (tenant) model and database operations
///
/// A business account is the ownership and billing unit: it owns users,
/// companies, opportunities and activities, and references one plan. Accounts
/// are soft-deleted only; rows referenced by tenant data are never removed.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE business_accounts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(255) NOT NULL,
///     plan_id UUID REFERENCES plans(id) ON DELETE RESTRICT,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use controly_shared::models::business_account::{BusinessAccount, CreateBusinessAccount};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, pro_plan: Uuid) -> Result<(), sqlx::Error> {
/// let account = BusinessAccount::create(&pool, CreateBusinessAccount {
///     name: "Acme Corp".to_string(),
///     plan_id: None,
/// }).await?;
///
/// BusinessAccount::change_plan(&pool, account.id, pro_plan).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgExecutor};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, name, plan_id, is_active, created_at, updated_at, deleted_at";

/// Business account record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAccount {
    pub id: Uuid,

    /// Organization name
    pub name: String,

    /// Active plan; an account without a plan has no module available
    pub plan_id: Option<Uuid>,

    /// Deactivated accounts keep their data but lose every entitlement
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a business account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBusinessAccount {
    pub name: String,
    pub plan_id: Option<Uuid>,
}

impl BusinessAccount {
    /// Creates a business account
    pub async fn create<'e, E>(executor: E, data: CreateBusinessAccount) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BusinessAccount>(&format!(
            r#"
            INSERT INTO business_accounts (name, plan_id)
            VALUES ($1, $2)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.plan_id)
        .fetch_one(executor)
        .await
    }

    /// Finds a non-deleted account by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BusinessAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM business_accounts WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Locks the account row until the surrounding transaction ends
    ///
    /// Every create that is checked against a plan limit takes this lock
    /// first, so two creates for the same account cannot both read a count
    /// below the limit and both insert.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, BusinessAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM business_accounts \
             WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await
    }

    /// Switches the account to another plan
    ///
    /// Downgrading never deletes data. Modules where the account now exceeds
    /// the new limit simply stay create-blocked until items are removed.
    pub async fn change_plan<'e, E>(
        executor: E,
        id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BusinessAccount>(&format!(
            r#"
            UPDATE business_accounts
            SET plan_id = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(plan_id)
        .fetch_optional(executor)
        .await
    }

    /// Renames an account
    pub async fn rename<'e, E>(executor: E, id: Uuid, name: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, BusinessAccount>(&format!(
            r#"
            UPDATE business_accounts
            SET name = $2, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .fetch_optional(executor)
        .await
    }

    /// Activates or deactivates an account
    pub async fn set_active<'e, E>(executor: E, id: Uuid, is_active: bool) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE business_accounts SET is_active = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(is_active)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Soft-deletes an account and deactivates it
    pub async fn soft_delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE business_accounts SET deleted_at = NOW(), is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
