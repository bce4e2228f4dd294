/// Plan module settings and database operations
///
/// One row per (plan, module) pair. The row says whether the plan includes the
/// module, how many items an account may hold in it, and which write actions
/// are permitted. A missing row is equivalent to "not included".
///
/// # Schema
///
/// ```sql
/// CREATE TABLE plan_modules (
///     plan_id UUID NOT NULL REFERENCES plans(id) ON DELETE CASCADE,
///     module_type module_type NOT NULL,
///     is_included BOOLEAN NOT NULL DEFAULT FALSE,
///     item_limit INTEGER,            -- NULL = unbounded
///     can_create BOOLEAN NOT NULL DEFAULT FALSE,
///     can_edit BOOLEAN NOT NULL DEFAULT FALSE,
///     can_delete BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (plan_id, module_type)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::module::ModuleType;
use crate::entitlement::PlanModuleConfig;

const PLAN_MODULE_COLUMNS: &str = "plan_id, module_type, is_included, item_limit, \
                                   can_create, can_edit, can_delete, created_at, updated_at";

/// Stored settings of one module within one plan
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlanModule {
    pub plan_id: Uuid,
    pub module_type: ModuleType,
    pub is_included: bool,

    /// Maximum number of items, `None` for unbounded
    pub item_limit: Option<i32>,

    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanModule {
    /// Resolver input for this row
    pub fn config(&self) -> PlanModuleConfig {
        PlanModuleConfig {
            is_included: self.is_included,
            item_limit: self.item_limit.map(|limit| limit.max(0) as u32),
            can_create: self.can_create,
            can_edit: self.can_edit,
            can_delete: self.can_delete,
        }
    }
}

/// Input for inserting or replacing a plan's module settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpsertPlanModule {
    pub is_included: bool,
    pub item_limit: Option<u32>,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl PlanModule {
    /// Finds the settings row for a plan/module pair
    pub async fn find<'e, E>(
        executor: E,
        plan_id: Uuid,
        module_type: ModuleType,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, PlanModule>(&format!(
            "SELECT {PLAN_MODULE_COLUMNS} FROM plan_modules WHERE plan_id = $1 AND module_type = $2"
        ))
        .bind(plan_id)
        .bind(module_type)
        .fetch_optional(executor)
        .await
    }

    /// Lists every module row of a plan
    pub async fn list_by_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PlanModule>(&format!(
            "SELECT {PLAN_MODULE_COLUMNS} FROM plan_modules WHERE plan_id = $1 ORDER BY module_type"
        ))
        .bind(plan_id)
        .fetch_all(pool)
        .await
    }

    /// Lists module rows for several plans at once
    pub async fn list_by_plans(pool: &PgPool, plan_ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PlanModule>(&format!(
            "SELECT {PLAN_MODULE_COLUMNS} FROM plan_modules WHERE plan_id = ANY($1) ORDER BY plan_id, module_type"
        ))
        .bind(plan_ids)
        .fetch_all(pool)
        .await
    }

    /// Inserts or replaces the settings for a plan/module pair
    pub async fn upsert(
        pool: &PgPool,
        plan_id: Uuid,
        module_type: ModuleType,
        data: UpsertPlanModule,
    ) -> Result<Self, sqlx::Error> {
        let item_limit = data.item_limit.map(|limit| limit.min(i32::MAX as u32) as i32);

        sqlx::query_as::<_, PlanModule>(&format!(
            r#"
            INSERT INTO plan_modules (plan_id, module_type, is_included, item_limit,
                                      can_create, can_edit, can_delete)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (plan_id, module_type) DO UPDATE SET
                is_included = EXCLUDED.is_included,
                item_limit = EXCLUDED.item_limit,
                can_create = EXCLUDED.can_create,
                can_edit = EXCLUDED.can_edit,
                can_delete = EXCLUDED.can_delete,
                updated_at = NOW()
            RETURNING {PLAN_MODULE_COLUMNS}
            "#
        ))
        .bind(plan_id)
        .bind(module_type)
        .bind(data.is_included)
        .bind(item_limit)
        .bind(data.can_create)
        .bind(data.can_edit)
        .bind(data.can_delete)
        .fetch_one(pool)
        .await
    }

    /// Removes a module row; the module then counts as not included
    pub async fn delete(
        pool: &PgPool,
        plan_id: Uuid,
        module_type: ModuleType,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM plan_modules WHERE plan_id = $1 AND module_type = $2")
            .bind(plan_id)
            .bind(module_type)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(item_limit: Option<i32>) -> PlanModule {
        PlanModule {
            plan_id: Uuid::new_v4(),
            module_type: ModuleType::Contacts,
            is_included: true,
            item_limit,
            can_create: true,
            can_edit: false,
            can_delete: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_config_copies_flags() {
        let config = row(Some(100)).config();
        assert!(config.is_included);
        assert_eq!(config.item_limit, Some(100));
        assert!(config.can_create);
        assert!(!config.can_edit);
        assert!(config.can_delete);
    }

    #[test]
    fn test_config_keeps_unbounded_limit() {
        assert_eq!(row(None).config().item_limit, None);
    }
}
