/// Plan model and database operations
///
/// A plan is a priced bundle of module settings. Business accounts reference a
/// plan; they never own it. Plans are managed by platform administrators.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE plans (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL UNIQUE,
///     description TEXT,
///     status plan_status NOT NULL DEFAULT 'ACTIVE',
///     monthly_price_cents BIGINT NOT NULL DEFAULT 0,
///     annual_price_cents BIGINT NOT NULL DEFAULT 0,
///     is_default BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// CREATE UNIQUE INDEX plans_single_default_idx ON plans (is_default) WHERE is_default;
/// ```
///
/// # Example
///
/// ```no_run
/// use controly_shared::models::plan::{CreatePlan, Plan, PlanStatus};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let plan = Plan::create(&pool, CreatePlan {
///     name: "Starter".to_string(),
///     description: None,
///     status: PlanStatus::Active,
///     monthly_price_cents: 1500,
///     annual_price_cents: 15000,
///     is_default: false,
/// }).await?;
///
/// let default_plan = Plan::find_default(&pool).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

const PLAN_COLUMNS: &str = "id, name, description, status, monthly_price_cents, \
                            annual_price_cents, is_default, created_at, updated_at";

/// Lifecycle status of a plan
///
/// Only `Active` plans can be newly assigned to an account. Accounts already on
/// an inactive or deprecated plan keep its entitlements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Active,
    Inactive,
    Deprecated,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "ACTIVE",
            PlanStatus::Inactive => "INACTIVE",
            PlanStatus::Deprecated => "DEPRECATED",
        }
    }

    /// Whether accounts may switch to a plan in this status
    pub fn is_assignable(&self) -> bool {
        matches!(self, PlanStatus::Active)
    }
}

/// Plan record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,

    /// Unique display name
    pub name: String,

    pub description: Option<String>,

    pub status: PlanStatus,

    /// Monthly price in cents
    pub monthly_price_cents: i64,

    /// Annual price in cents
    pub annual_price_cents: i64,

    /// Plan given to newly registered accounts
    pub is_default: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlan {
    pub name: String,
    pub description: Option<String>,
    pub status: PlanStatus,
    pub monthly_price_cents: i64,
    pub annual_price_cents: i64,
    pub is_default: bool,
}

/// Input for updating a plan; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePlan {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<PlanStatus>,
    pub monthly_price_cents: Option<i64>,
    pub annual_price_cents: Option<i64>,
    pub is_default: Option<bool>,
}

impl Plan {
    /// Creates a plan
    ///
    /// When `is_default` is set, the previous default plan is cleared in the
    /// same transaction so the single-default index is never violated.
    pub async fn create(pool: &PgPool, data: CreatePlan) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if data.is_default {
            clear_default(&mut *tx).await?;
        }

        let plan = sqlx::query_as::<_, Plan>(&format!(
            r#"
            INSERT INTO plans (name, description, status, monthly_price_cents,
                               annual_price_cents, is_default)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(data.name)
        .bind(data.description)
        .bind(data.status)
        .bind(data.monthly_price_cents)
        .bind(data.annual_price_cents)
        .bind(data.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(plan)
    }

    /// Finds a plan by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Returns the plan assigned to new accounts, if one is marked default
    pub async fn find_default<'e, E>(executor: E) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Plan>(&format!(
            "SELECT {PLAN_COLUMNS} FROM plans WHERE is_default AND status = 'ACTIVE'"
        ))
        .fetch_optional(executor)
        .await
    }

    /// Lists plans ordered by monthly price, optionally filtered by status
    pub async fn list(pool: &PgPool, status: Option<PlanStatus>) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Plan>(&format!(
            r#"
            SELECT {PLAN_COLUMNS}
            FROM plans
            WHERE $1::plan_status IS NULL OR status = $1
            ORDER BY monthly_price_cents ASC, name ASC
            "#
        ))
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// Updates a plan
    ///
    /// Returns `None` if the plan doesn't exist. Setting `is_default = true`
    /// moves the default flag from whichever plan held it.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdatePlan,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if data.is_default == Some(true) {
            clear_default(&mut *tx).await?;
        }

        let plan = sqlx::query_as::<_, Plan>(&format!(
            r#"
            UPDATE plans SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                monthly_price_cents = COALESCE($5, monthly_price_cents),
                annual_price_cents = COALESCE($6, annual_price_cents),
                is_default = COALESCE($7, is_default),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PLAN_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.status)
        .bind(data.monthly_price_cents)
        .bind(data.annual_price_cents)
        .bind(data.is_default)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(plan)
    }
}

async fn clear_default<'e, E>(executor: E) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE plans SET is_default = FALSE, updated_at = NOW() WHERE is_default")
        .execute(executor)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_status_assignable() {
        assert!(PlanStatus::Active.is_assignable());
        assert!(!PlanStatus::Inactive.is_assignable());
        assert!(!PlanStatus::Deprecated.is_assignable());
    }

    #[test]
    fn test_plan_status_serde() {
        let json = serde_json::to_string(&PlanStatus::Deprecated).unwrap();
        assert_eq!(json, "\"DEPRECATED\"");
        let parsed: PlanStatus = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(parsed, PlanStatus::Active);
    }

    #[test]
    fn test_update_plan_default_is_noop() {
        let update = UpdatePlan::default();
        assert!(update.name.is_none());
        assert!(update.status.is_none());
        assert!(update.is_default.is_none());
    }
}
