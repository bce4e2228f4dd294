/// Opportunity model and database operations
///
/// Opportunities are sales deals tracked by the `CRM` module and its counted
/// resource. Values are stored in cents.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE opportunity_stage AS ENUM (
///     'LEAD', 'QUALIFIED', 'PROPOSAL', 'NEGOTIATION', 'WON', 'LOST'
/// );
///
/// CREATE TABLE opportunities (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     business_account_id UUID NOT NULL REFERENCES business_accounts(id),
///     company_id UUID REFERENCES companies(id) ON DELETE SET NULL,
///     owner_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     title VARCHAR(255) NOT NULL,
///     value_cents BIGINT NOT NULL DEFAULT 0,
///     stage opportunity_stage NOT NULL DEFAULT 'LEAD',
///     expected_close_date DATE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

const OPPORTUNITY_COLUMNS: &str = "id, business_account_id, company_id, owner_id, title, value_cents, \
                                   stage, expected_close_date, created_at, updated_at, deleted_at";

/// Pipeline stage of an opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "opportunity_stage", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityStage {
    Lead,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl OpportunityStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStage::Lead => "LEAD",
            OpportunityStage::Qualified => "QUALIFIED",
            OpportunityStage::Proposal => "PROPOSAL",
            OpportunityStage::Negotiation => "NEGOTIATION",
            OpportunityStage::Won => "WON",
            OpportunityStage::Lost => "LOST",
        }
    }

    /// Won or lost
    pub fn is_closed(&self) -> bool {
        matches!(self, OpportunityStage::Won | OpportunityStage::Lost)
    }
}

/// Opportunity record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    pub business_account_id: Uuid,
    pub company_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub title: String,
    pub value_cents: i64,
    pub stage: OpportunityStage,
    pub expected_close_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating an opportunity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOpportunity {
    pub company_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub title: String,
    pub value_cents: i64,
    pub stage: OpportunityStage,
    pub expected_close_date: Option<NaiveDate>,
}

/// Input for updating an opportunity; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOpportunity {
    pub company_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub title: Option<String>,
    pub value_cents: Option<i64>,
    pub stage: Option<OpportunityStage>,
    pub expected_close_date: Option<NaiveDate>,
}

impl Opportunity {
    pub async fn create<'e, E>(
        executor: E,
        account_id: Uuid,
        data: CreateOpportunity,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Opportunity>(&format!(
            r#"
            INSERT INTO opportunities (business_account_id, company_id, owner_id, title,
                                       value_cents, stage, expected_close_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {OPPORTUNITY_COLUMNS}
            "#
        ))
        .bind(account_id)
        .bind(data.company_id)
        .bind(data.owner_id)
        .bind(data.title)
        .bind(data.value_cents)
        .bind(data.stage)
        .bind(data.expected_close_date)
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
        sqlx::query_as::<_, Opportunity>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities \
             WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(executor)
        .await
    }

    /// Lists opportunities of an account, newest first, optionally by stage
    pub async fn list_by_account<'e, E>(
        executor: E,
        account_id: Uuid,
        stage: Option<OpportunityStage>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Opportunity>(&format!(
            r#"
            SELECT {OPPORTUNITY_COLUMNS}
            FROM opportunities
            WHERE business_account_id = $1
              AND deleted_at IS NULL
              AND ($2::opportunity_stage IS NULL OR stage = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(account_id)
        .bind(stage)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        account_id: Uuid,
        id: Uuid,
        data: UpdateOpportunity,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Opportunity>(&format!(
            r#"
            UPDATE opportunities SET
                company_id = COALESCE($3, company_id),
                owner_id = COALESCE($4, owner_id),
                title = COALESCE($5, title),
                value_cents = COALESCE($6, value_cents),
                stage = COALESCE($7, stage),
                expected_close_date = COALESCE($8, expected_close_date),
                updated_at = NOW()
            WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL
            RETURNING {OPPORTUNITY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(account_id)
        .bind(data.company_id)
        .bind(data.owner_id)
        .bind(data.title)
        .bind(data.value_cents)
        .bind(data.stage)
        .bind(data.expected_close_date)
        .fetch_optional(executor)
        .await
    }

    pub async fn soft_delete<'e, E>(executor: E, account_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE opportunities SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(account_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Live opportunity count of an account (`CRM` module resource count)
    pub async fn count_by_account<'e, E>(executor: E, account_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM opportunities WHERE business_account_id = $1 AND deleted_at IS NULL",
        )
        .bind(account_id)
        .fetch_one(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_stages() {
        assert!(OpportunityStage::Won.is_closed());
        assert!(OpportunityStage::Lost.is_closed());
        assert!(!OpportunityStage::Negotiation.is_closed());
    }

    #[test]
    fn test_stage_serde_matches_database_labels() {
        for stage in [
            OpportunityStage::Lead,
            OpportunityStage::Qualified,
            OpportunityStage::Proposal,
            OpportunityStage::Negotiation,
            OpportunityStage::Won,
            OpportunityStage::Lost,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
        }
    }
}
