/// Company model and database operations
///
/// Companies are the counted resource of the `CONTACTS` module. Every query is
/// scoped by `business_account_id`, so one account can never read or modify
/// another account's companies.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE companies (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     business_account_id UUID NOT NULL REFERENCES business_accounts(id),
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255),
///     phone VARCHAR(50),
///     website VARCHAR(512),
///     industry VARCHAR(100),
///     address TEXT,
///     notes TEXT,
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

const COMPANY_COLUMNS: &str = "id, business_account_id, name, email, phone, website, industry, \
                               address, notes, created_by, created_at, updated_at, deleted_at";

/// Company record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub business_account_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,

    /// User who created the record
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a company
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

/// Input for updating a company; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

impl Company {
    pub async fn create<'e, E>(
        executor: E,
        account_id: Uuid,
        created_by: Uuid,
        data: CreateCompany,
    ) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies (business_account_id, name, email, phone, website,
                                   industry, address, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(account_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.website)
        .bind(data.industry)
        .bind(data.address)
        .bind(data.notes)
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
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies \
             WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(executor)
        .await
    }

    /// Lists companies of an account by name, with pagination
    pub async fn list_by_account<'e, E>(
        executor: E,
        account_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Company>(&format!(
            r#"
            SELECT {COMPANY_COLUMNS}
            FROM companies
            WHERE business_account_id = $1 AND deleted_at IS NULL
            ORDER BY name ASC, created_at ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
    }

    pub async fn update<'e, E>(
        executor: E,
        account_id: Uuid,
        id: Uuid,
        data: UpdateCompany,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Company>(&format!(
            r#"
            UPDATE companies SET
                name = COALESCE($3, name),
                email = COALESCE($4, email),
                phone = COALESCE($5, phone),
                website = COALESCE($6, website),
                industry = COALESCE($7, industry),
                address = COALESCE($8, address),
                notes = COALESCE($9, notes),
                updated_at = NOW()
            WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL
            RETURNING {COMPANY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(account_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.website)
        .bind(data.industry)
        .bind(data.address)
        .bind(data.notes)
        .fetch_optional(executor)
        .await
    }

    /// Soft-deletes a company; freed slots count toward the plan limit again
    pub async fn soft_delete<'e, E>(executor: E, account_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE companies SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(account_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Live company count of an account (`CONTACTS` module resource count)
    pub async fn count_by_account<'e, E>(executor: E, account_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM companies WHERE business_account_id = $1 AND deleted_at IS NULL",
        )
        .bind(account_id)
        .fetch_one(executor)
        .await
    }
}
