/// Embedded schema migrations
///
/// Migrations live in the workspace `migrations/` directory as reversible
/// pairs (`{version}_{name}.up.sql` / `.down.sql`) and are compiled into the
/// binary, so a deployed server never needs the files on disk.
///
/// | Version          | Content                                   |
/// |------------------|-------------------------------------------|
/// | `20250101000001` | enums, plans, accounts, tenant resources  |
/// | `20250101000002` | Free / Pro / Enterprise seed plans        |
///
/// # Example
///
/// ```no_run
/// use controly_shared::db::migrations::{migration_status, run_migrations};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// run_migrations(&pool).await?;
///
/// let status = migration_status(&pool).await?;
/// assert!(status.is_up_to_date);
/// # Ok(())
/// # }
/// ```

use sqlx::{
    migrate::{MigrateDatabase, Migrator},
    postgres::PgPool,
    Postgres,
};
use tracing::{debug, info, warn};

/// Migrations embedded at compile time
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applied vs. embedded migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub applied_migrations: usize,

    /// Latest successfully applied version
    pub latest_version: Option<i64>,

    /// Embedded migrations not yet applied
    pub pending_migrations: usize,

    pub is_up_to_date: bool,
}

/// Applies all pending migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(embedded = embedded_versions().count(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Compares the migrations table with the embedded set
pub async fn migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public' AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    let applied: Vec<i64> = if table_exists {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success ORDER BY version")
            .fetch_all(pool)
            .await?
    } else {
        Vec::new()
    };

    let status = status_from_versions(&applied, embedded_versions());
    debug!(?status, "Migration status");

    Ok(status)
}

/// Versions of the embedded up-migrations
fn embedded_versions() -> impl Iterator<Item = i64> {
    MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .map(|m| m.version)
}

fn status_from_versions(applied: &[i64], embedded: impl Iterator<Item = i64>) -> MigrationStatus {
    let pending = embedded.filter(|version| !applied.contains(version)).count();

    MigrationStatus {
        applied_migrations: applied.len(),
        latest_version: applied.iter().max().copied(),
        pending_migrations: pending,
        is_up_to_date: pending == 0,
    }
}

/// Creates the database if missing (development and tests)
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    }

    Ok(())
}
