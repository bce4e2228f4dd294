/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "activeConnections": 1, "idleConnections": 1, "totalConnections": 2 },
///   "migrations": { "latestVersion": 20250101000002, "pending": 0 }
/// }
/// ```
///
/// `status` is `degraded` when the database is unreachable or migrations are
/// pending; the endpoint itself still answers 200 so load balancers can tell
/// "process up" from "process healthy" by body.

use crate::app::AppState;
use axum::{extract::State, Json};
use controly_shared::db::{
    migrations::migration_status,
    pool::{health_check as db_health_check, pool_stats, PoolStats},
};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: &'static str,

    pub version: &'static str,

    /// `connected` or `disconnected`
    pub database: &'static str,

    pub pool: PoolStats,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations: Option<MigrationSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSummary {
    pub latest_version: Option<i64>,
    pub pending: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = match db_health_check(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let migrations = if connected {
        match migration_status(&state.db).await {
            Ok(status) => Some(MigrationSummary {
                latest_version: status.latest_version,
                pending: status.pending_migrations,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read migration status");
                None
            }
        }
    } else {
        None
    };

    let up_to_date = migrations.as_ref().is_some_and(|m| m.pending == 0);

    Json(HealthResponse {
        status: if connected && up_to_date { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database: if connected { "connected" } else { "disconnected" },
        pool: pool_stats(&state.db),
        migrations,
    })
}
