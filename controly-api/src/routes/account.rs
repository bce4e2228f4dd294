/// Current business account
///
/// - `GET /v1/account` - Account, plan and module verdicts
/// - `PATCH /v1/account` - Rename (BUSINESS_ADMIN)
/// - `PUT /v1/account/plan` - Switch plan (BUSINESS_ADMIN)
///
/// Switching to a smaller plan never deletes data. The response lists the
/// modules where the account now holds more items than the new limit; those
/// stay create-blocked until enough items are removed.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use controly_shared::{
    auth::{
        authorization::{require_account, require_account_admin},
        middleware::AuthContext,
    },
    entitlement::{resolve, EntitlementStore, EntitlementVerdict, ModulePermission},
    models::{
        business_account::BusinessAccount,
        module::ModuleType,
        plan::Plan,
        user::UserRole,
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub account: BusinessAccount,
    pub plan: Option<Plan>,
    pub permissions: Vec<ModulePermission>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenameAccountRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanRequest {
    pub plan_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePlanResponse {
    pub account: BusinessAccount,
    pub plan: Plan,

    /// Modules whose live count exceeds the new plan's limit
    pub over_limit: Vec<ModulePermission>,
}

async fn load_account(state: &AppState, account_id: Uuid) -> ApiResult<BusinessAccount> {
    BusinessAccount::find_by_id(&state.db, account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Business account not found".to_string()))
}

pub async fn get_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<AccountResponse>> {
    let account_id = require_account(&auth)?;
    let account = load_account(&state, account_id).await?;

    let plan = match account.plan_id {
        Some(plan_id) => Plan::find_by_id(&state.db, plan_id).await?,
        None => None,
    };

    let permissions = state.entitlements.permissions(&auth).await?;

    Ok(Json(AccountResponse {
        account,
        plan,
        permissions,
    }))
}

pub async fn rename_account(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<RenameAccountRequest>,
) -> ApiResult<Json<BusinessAccount>> {
    let account_id = require_account_admin(&auth)?;
    req.validate()?;

    let account = BusinessAccount::rename(&state.db, account_id, req.name.trim())
        .await?
        .ok_or_else(|| ApiError::NotFound("Business account not found".to_string()))?;

    Ok(Json(account))
}

/// Switches the account to another `ACTIVE` plan
///
/// # Errors
///
/// - `404 Not Found`: Unknown plan
/// - `400 Bad Request`: Plan is `INACTIVE` or `DEPRECATED`
pub async fn change_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePlanRequest>,
) -> ApiResult<Json<ChangePlanResponse>> {
    let account_id = require_account_admin(&auth)?;

    let plan = Plan::find_by_id(&state.db, req.plan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Plan not found".to_string()))?;

    if !plan.status.is_assignable() {
        return Err(ApiError::BadRequest(format!(
            "Plan '{}' is {} and cannot be selected",
            plan.name,
            plan.status.as_str()
        )));
    }

    let account = BusinessAccount::change_plan(&state.db, account_id, plan.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Business account not found".to_string()))?;

    // Evaluated as the account's members see it, not as the caller
    let store = state.entitlements.store();
    let mut over_limit = Vec::new();
    for module_type in ModuleType::ALL {
        let config = store.plan_module_config(plan.id, module_type).await?;
        let count = store.count_resources(account_id, module_type).await?;
        let verdict = resolve(Some(UserRole::BusinessAdmin), config.as_ref(), count);

        if exceeds_limit(&verdict) {
            over_limit.push(ModulePermission { module_type, verdict });
        }
    }

    tracing::info!(
        account_id = %account_id,
        plan_id = %plan.id,
        plan = %plan.name,
        over_limit = over_limit.len(),
        "Account plan changed"
    );

    Ok(Json(ChangePlanResponse {
        account,
        plan,
        over_limit,
    }))
}

fn exceeds_limit(verdict: &EntitlementVerdict) -> bool {
    verdict
        .item_limit
        .is_some_and(|limit| verdict.current_count > limit)
}
