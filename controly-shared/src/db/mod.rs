/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool, health check, stats
/// - `migrations`: embedded migrations and their status
///
/// Models are in the crate-level `models` module.
///
/// # Example
///
/// ```no_run
/// use controly_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
