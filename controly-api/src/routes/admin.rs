/// Platform operator endpoints (SUPER_ADMIN only)
///
/// - `GET /v1/admin/plans` - every plan, any status, with module rows
/// - `POST /v1/admin/plans` - create a plan
/// - `PATCH /v1/admin/plans/:id` - update a plan
/// - `PUT /v1/admin/plans/:id/modules/:module` - include or configure a module
/// - `DELETE /v1/admin/plans/:id/modules/:module` - drop a module row
/// - `PATCH /v1/admin/accounts/:id` - activate or deactivate an account
/// - `DELETE /v1/admin/accounts/:id` - soft-delete an account
///
/// Plan changes take effect on the next request of every account on the plan;
/// verdicts are never cached.

use super::{permissions::parse_module, plans::{with_modules, PlanWithModules}};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use controly_shared::{
    auth::{authorization::require_super_admin, middleware::AuthContext},
    models::{
        business_account::BusinessAccount,
        module::ModuleType,
        plan::{CreatePlan, Plan, PlanStatus, UpdatePlan},
        plan_module::{PlanModule, UpsertPlanModule},
    },
};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    pub description: Option<String>,

    /// Defaults to `ACTIVE`
    pub status: Option<PlanStatus>,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    #[serde(default)]
    pub monthly_price_cents: i64,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    #[serde(default)]
    pub annual_price_cents: i64,

    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,

    pub status: Option<PlanStatus>,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub monthly_price_cents: Option<i64>,

    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub annual_price_cents: Option<i64>,

    pub is_default: Option<bool>,
}

/// Module settings within a plan
///
/// `itemLimit` distinguishes absent from `null`: an absent field takes the
/// catalog default limit of the module, an explicit `null` means unbounded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanModuleRequest {
    #[serde(default = "default_true")]
    pub is_included: bool,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub item_limit: Option<Option<u32>>,

    #[serde(default = "default_true")]
    pub can_create: bool,

    #[serde(default = "default_true")]
    pub can_edit: bool,

    #[serde(default = "default_true")]
    pub can_delete: bool,
}

fn default_true() -> bool {
    true
}

/// Maps a present field (even `null`) to `Some`
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl PlanModuleRequest {
    fn into_upsert(self, module_type: ModuleType) -> UpsertPlanModule {
        let definition = module_type.definition();

        let item_limit = if definition.has_limits {
            self.item_limit.unwrap_or(definition.default_limit)
        } else {
            None
        };

        UpsertPlanModule {
            is_included: self.is_included,
            item_limit,
            can_create: self.can_create,
            can_edit: self.can_edit,
            can_delete: self.can_delete,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    pub is_active: bool,
}

async fn load_plan(state: &AppState, id: Uuid) -> ApiResult<Plan> {
    Plan::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))
}

pub async fn list_plans(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PlanWithModules>>> {
    require_super_admin(&auth)?;

    let plans = Plan::list(&state.db, None).await?;
    Ok(Json(with_modules(&state.db, plans).await?))
}

pub async fn create_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreatePlanRequest>,
) -> ApiResult<(StatusCode, Json<Plan>)> {
    require_super_admin(&auth)?;
    req.validate()?;

    let status = req.status.unwrap_or(PlanStatus::Active);
    if req.is_default && !status.is_assignable() {
        return Err(ApiError::invalid_field("isDefault", "The default plan must be ACTIVE"));
    }

    let plan = Plan::create(
        &state.db,
        CreatePlan {
            name: req.name.trim().to_string(),
            description: req.description,
            status,
            monthly_price_cents: req.monthly_price_cents,
            annual_price_cents: req.annual_price_cents,
            is_default: req.is_default,
        },
    )
    .await?;

    tracing::info!(plan_id = %plan.id, plan = %plan.name, "Plan created");

    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePlanRequest>,
) -> ApiResult<Json<Plan>> {
    require_super_admin(&auth)?;
    req.validate()?;

    if req.is_default == Some(true) {
        let status = match req.status {
            Some(status) => status,
            None => load_plan(&state, id).await?.status,
        };
        if !status.is_assignable() {
            return Err(ApiError::invalid_field("isDefault", "The default plan must be ACTIVE"));
        }
    }

    let plan = Plan::update(
        &state.db,
        id,
        UpdatePlan {
            name: req.name.map(|name| name.trim().to_string()),
            description: req.description,
            status: req.status,
            monthly_price_cents: req.monthly_price_cents,
            annual_price_cents: req.annual_price_cents,
            is_default: req.is_default,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))?;

    tracing::info!(plan_id = %plan.id, status = plan.status.as_str(), "Plan updated");

    Ok(Json(plan))
}

pub async fn upsert_plan_module(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, module)): Path<(Uuid, String)>,
    Json(req): Json<PlanModuleRequest>,
) -> ApiResult<Json<PlanModule>> {
    require_super_admin(&auth)?;
    let module_type = parse_module(&module)?;
    load_plan(&state, id).await?;

    let row = PlanModule::upsert(&state.db, id, module_type, req.into_upsert(module_type)).await?;

    tracing::info!(
        plan_id = %id,
        module = %module_type,
        included = row.is_included,
        item_limit = ?row.item_limit,
        "Plan module configured"
    );

    Ok(Json(row))
}

pub async fn delete_plan_module(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, module)): Path<(Uuid, String)>,
) -> ApiResult<StatusCode> {
    require_super_admin(&auth)?;
    let module_type = parse_module(&module)?;

    if !PlanModule::delete(&state.db, id, module_type).await? {
        return Err(ApiError::NotFound("Plan module not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAccountRequest>,
) -> ApiResult<Json<BusinessAccount>> {
    require_super_admin(&auth)?;

    if !BusinessAccount::set_active(&state.db, id, req.is_active).await? {
        return Err(ApiError::NotFound("Business account not found".to_string()));
    }

    let account = BusinessAccount::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Business account not found".to_string()))?;

    tracing::info!(account_id = %id, is_active = req.is_active, "Account status changed");

    Ok(Json(account))
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_super_admin(&auth)?;

    if !BusinessAccount::soft_delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Business account not found".to_string()));
    }

    tracing::info!(account_id = %id, "Account deleted");

    Ok(StatusCode::NO_CONTENT)
}
