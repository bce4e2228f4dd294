/// Activity model and database operations
///
/// Activities are logged interactions (calls, emails, meetings, notes, tasks)
/// attached to a company and/or an opportunity. They belong to the `CRM`
/// module but are not its counted resource.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE activity_kind AS ENUM ('CALL', 'EMAIL', 'MEETING', 'NOTE', 'TASK');
///
/// CREATE TABLE activities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     business_account_id UUID NOT NULL REFERENCES business_accounts(id),
///     company_id UUID REFERENCES companies(id) ON DELETE SET NULL,
///     opportunity_id UUID REFERENCES opportunities(id) ON DELETE SET NULL,
///     kind activity_kind NOT NULL,
///     subject VARCHAR(255) NOT NULL,
///     notes TEXT,
///     occurred_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

const ACTIVITY_COLUMNS: &str = "id, business_account_id, company_id, opportunity_id, kind, subject, \
                                notes, occurred_at, created_by, created_at, updated_at, deleted_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "activity_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    Call,
    Email,
    Meeting,
    Note,
    Task,
}

/// Activity record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    pub business_account_id: Uuid,
    pub company_id: Option<Uuid>,
    pub opportunity_id: Option<Uuid>,
    pub kind: ActivityKind,
    pub subject: String,
    pub notes: Option<String>,

    /// When the interaction happened (defaults to insertion time)
    pub occurred_at: DateTime<Utc>,

    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for logging an activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActivity {
    pub company_id: Option<Uuid>,
    pub opportunity_id: Option<Uuid>,
    pub kind: ActivityKind,
    pub subject: String,
    pub notes: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Input for updating an activity; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateActivity {
    pub kind: Option<ActivityKind>,
    pub subject: Option<String>,
    pub notes: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Filter for listing activities
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivityFilter {
    pub company_id: Option<Uuid>,
    pub opportunity_id: Option<Uuid>,
}

impl Activity {
    pub async fn create<'e, E>(
        executor: E,
        account_id: Uuid,
        created_by: Uuid,
        data: CreateActivity,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Activity>(&format!(
            r#"
            INSERT INTO activities (business_account_id, company_id, opportunity_id, kind,
                                    subject, notes, occurred_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()), $8)
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(account_id)
        .bind(data.company_id)
        .bind(data.opportunity_id)
        .bind(data.kind)
        .bind(data.subject)
        .bind(data.notes)
        .bind(data.occurred_at)
        .bind(created_by)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id<'e, E>(
        executor: E,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities \
             WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(executor)
        .await
    }

    /// Lists activities of an account, most recent first
    pub async fn list_by_account<'e, E>(
        executor: E,
        account_id: Uuid,
        filter: ActivityFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Activity>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS}
            FROM activities
            WHERE business_account_id = $1
              AND deleted_at IS NULL
              AND ($2::uuid IS NULL OR company_id = $2)
              AND ($3::uuid IS NULL OR opportunity_id = $3)
            ORDER BY occurred_at DESC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(account_id)
        .bind(filter.company_id)
        .bind(filter.opportunity_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        account_id: Uuid,
        id: Uuid,
        data: UpdateActivity,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Activity>(&format!(
            r#"
            UPDATE activities SET
                kind = COALESCE($3, kind),
                subject = COALESCE($4, subject),
                notes = COALESCE($5, notes),
                occurred_at = COALESCE($6, occurred_at),
                updated_at = NOW()
            WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL
            RETURNING {ACTIVITY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(account_id)
        .bind(data.kind)
        .bind(data.subject)
        .bind(data.notes)
        .bind(data.occurred_at)
        .fetch_optional(executor)
        .await
    }

    pub async fn soft_delete<'e, E>(executor: E, account_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE activities SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(account_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
