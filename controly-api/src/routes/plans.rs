/// Public plan listing
///
/// ```text
/// GET /v1/plans
/// ```
///
/// Returns the `ACTIVE` plans with their module rows, the data a plan
/// selection screen needs. Prices are in cents.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use controly_shared::models::{
    plan::{Plan, PlanStatus},
    plan_module::PlanModule,
};
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// Plan with its per-module settings
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWithModules {
    #[serde(flatten)]
    pub plan: Plan,
    pub modules: Vec<PlanModule>,
}

pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<Vec<PlanWithModules>>> {
    let plans = Plan::list(&state.db, Some(PlanStatus::Active)).await?;
    Ok(Json(with_modules(&state.db, plans).await?))
}

/// Attaches module rows to each plan with a single query
pub(crate) async fn with_modules(
    pool: &PgPool,
    plans: Vec<Plan>,
) -> Result<Vec<PlanWithModules>, sqlx::Error> {
    let ids: Vec<Uuid> = plans.iter().map(|plan| plan.id).collect();

    let mut by_plan: HashMap<Uuid, Vec<PlanModule>> = HashMap::new();
    for row in PlanModule::list_by_plans(pool, &ids).await? {
        by_plan.entry(row.plan_id).or_default().push(row);
    }

    Ok(plans
        .into_iter()
        .map(|plan| PlanWithModules {
            modules: by_plan.remove(&plan.id).unwrap_or_default(),
            plan,
        })
        .collect())
}
