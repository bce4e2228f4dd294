/// Database models for Controly
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `module`: Static module catalog (USERS, CONTACTS, CRM)
/// - `plan`: Subscription plans
/// - `plan_module`: Per-plan module inclusion, limits and capability flags
/// - `business_account`: Tenants, the ownership and billing unit
/// - `user`: Role-bearing users of an account
/// - `company`: Companies (counted by CONTACTS)
/// - `opportunity`: Sales opportunities (counted by CRM)
/// - `activity`: Logged interactions (gated by CRM)
///
/// Tenant-owned models take the account ID on every query; there is no way to
/// read another account's rows through this layer.
///
/// # Example
///
/// ```no_run
/// use controly_shared::models::company::{Company, CreateCompany};
/// use controly_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(account_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let company = Company::create(&pool, account_id, user_id, CreateCompany {
///     name: "Globex".to_string(),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod activity;
pub mod business_account;
pub mod company;
pub mod module;
pub mod opportunity;
pub mod plan;
pub mod plan_module;
pub mod user;
