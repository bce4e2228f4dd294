/// User model and database operations
///
/// Users belong to one business account, except platform operators
/// (`SUPER_ADMIN`) who may exist without one. Users are the counted resource of
/// the `USERS` module; deleting a user is a soft delete, so the live count only
/// considers rows where `deleted_at IS NULL`.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('SUPER_ADMIN', 'BUSINESS_ADMIN', 'USER');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     business_account_id UUID REFERENCES business_accounts(id) ON DELETE RESTRICT,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     role user_role NOT NULL DEFAULT 'USER',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     last_login_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ,
///     CONSTRAINT users_account_required CHECK (
///         role = 'SUPER_ADMIN' OR business_account_id IS NOT NULL
///     )
/// );
/// CREATE UNIQUE INDEX users_email_live_idx ON users (lower(email)) WHERE deleted_at IS NULL;
/// ```
///
/// # Example
///
/// ```no_run
/// use controly_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, account_id: Uuid) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     business_account_id: Some(account_id),
///     email: "jane@acme.test".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Jane".to_string()),
///     role: UserRole::User,
/// }).await?;
///
/// let seats = User::count_by_account(&pool, account_id).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, business_account_id, email, password_hash, name, role, is_active, \
                            last_login_at, created_at, updated_at, deleted_at";

/// Role of a user
///
/// Hierarchy: SuperAdmin > BusinessAdmin > User. `SuperAdmin` is a platform
/// operator and is not bound by any account's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Platform operator
    SuperAdmin,

    /// Administers one business account: users, billing, plan
    BusinessAdmin,

    /// Regular member of a business account
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "SUPER_ADMIN",
            UserRole::BusinessAdmin => "BUSINESS_ADMIN",
            UserRole::User => "USER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "SUPER_ADMIN" => Some(UserRole::SuperAdmin),
            "BUSINESS_ADMIN" => Some(UserRole::BusinessAdmin),
            "USER" => Some(UserRole::User),
            _ => None,
        }
    }

    /// Whether this role is at least as privileged as `required`
    pub fn has_permission(&self, required: &UserRole) -> bool {
        self.level() >= required.level()
    }

    fn level(&self) -> u8 {
        match self {
            UserRole::SuperAdmin => 3,
            UserRole::BusinessAdmin => 2,
            UserRole::User => 1,
        }
    }
}

/// User record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    /// Owning account (`None` only for platform operators)
    pub business_account_id: Option<Uuid>,

    /// Lower-cased email, unique among non-deleted users
    pub email: String,

    /// Argon2id hash, never exposed over the API
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub name: Option<String>,

    pub role: UserRole,

    pub is_active: bool,

    pub last_login_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub business_account_id: Option<Uuid>,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: UserRole,
}

/// Input for updating a user; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

impl User {
    /// Creates a user; the email is stored lower-cased
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (business_account_id, email, password_hash, name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.business_account_id)
        .bind(data.email.trim().to_lowercase())
        .bind(data.password_hash)
        .bind(data.name)
        .bind(data.role)
        .fetch_one(executor)
        .await
    }

    /// Finds a non-deleted user by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a non-deleted user of a given account
    pub async fn find_in_account<'e, E>(
        executor: E,
        account_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(executor)
        .await
    }

    /// Finds a non-deleted user by email (case-insensitive)
    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1) AND deleted_at IS NULL"
        ))
        .bind(email.trim())
        .fetch_optional(executor)
        .await
    }

    /// Lists the live users of an account, oldest first
    pub async fn list_by_account<'e, E>(executor: E, account_id: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE business_account_id = $1 AND deleted_at IS NULL ORDER BY created_at ASC"
        ))
        .bind(account_id)
        .fetch_all(executor)
        .await
    }

    /// Updates a user of an account
    pub async fn update<'e, E>(
        executor: E,
        account_id: Uuid,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($3, name),
                role = COALESCE($4, role),
                is_active = COALESCE($5, is_active),
                password_hash = COALESCE($6, password_hash),
                updated_at = NOW()
            WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(account_id)
        .bind(data.name)
        .bind(data.role)
        .bind(data.is_active)
        .bind(data.password_hash)
        .fetch_optional(executor)
        .await
    }

    /// Soft-deletes a user of an account
    pub async fn soft_delete<'e, E>(executor: E, account_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW(), is_active = FALSE, updated_at = NOW() \
             WHERE id = $1 AND business_account_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(account_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a successful login
    pub async fn update_last_login<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Live user count of an account (`USERS` module resource count)
    pub async fn count_by_account<'e, E>(executor: E, account_id: Uuid) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE business_account_id = $1 AND deleted_at IS NULL",
        )
        .bind(account_id)
        .fetch_one(executor)
        .await
    }
}
