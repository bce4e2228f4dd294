/// Sales opportunities of the current business account (`CRM` module)
///
/// - `GET /v1/opportunities?stage=&limit=&offset=`, `GET /v1/opportunities/:id` - view
/// - `POST /v1/opportunities` - create, counted against the CRM limit
/// - `PATCH /v1/opportunities/:id` - edit
/// - `DELETE /v1/opportunities/:id` - soft delete
///
/// Amounts are integer cents.

use super::{companies::ensure_company, page};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use controly_shared::{
    auth::{authorization::require_account, middleware::AuthContext},
    entitlement::Action,
    models::{
        module::ModuleType,
        opportunity::{CreateOpportunity, Opportunity, OpportunityStage, UpdateOpportunity},
        user::User,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

const MODULE: ModuleType = ModuleType::Crm;

#[derive(Debug, Deserialize)]
pub struct ListOpportunitiesQuery {
    pub stage: Option<OpportunityStage>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpportunityRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub company_id: Option<Uuid>,

    /// Defaults to the caller
    pub owner_id: Option<Uuid>,

    #[validate(range(min = 0, message = "Value must not be negative"))]
    #[serde(default)]
    pub value_cents: i64,

    /// Defaults to `LEAD`
    pub stage: Option<OpportunityStage>,

    pub expected_close_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOpportunityRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub company_id: Option<Uuid>,

    pub owner_id: Option<Uuid>,

    #[validate(range(min = 0, message = "Value must not be negative"))]
    pub value_cents: Option<i64>,

    pub stage: Option<OpportunityStage>,

    pub expected_close_date: Option<NaiveDate>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Opportunity not found".to_string())
}

/// Rejects owners outside the account
async fn ensure_owner(state: &AppState, account_id: Uuid, owner_id: Option<Uuid>) -> ApiResult<()> {
    if let Some(owner_id) = owner_id {
        if User::find_in_account(&state.db, account_id, owner_id).await?.is_none() {
            return Err(ApiError::invalid_field("ownerId", "User not found"));
        }
    }
    Ok(())
}

/// Rejects references to opportunities of other accounts
pub(crate) async fn ensure_opportunity(
    state: &AppState,
    account_id: Uuid,
    opportunity_id: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(opportunity_id) = opportunity_id {
        if Opportunity::find_by_id(&state.db, account_id, opportunity_id)
            .await?
            .is_none()
        {
            return Err(ApiError::invalid_field("opportunityId", "Opportunity not found"));
        }
    }
    Ok(())
}

pub async fn list_opportunities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListOpportunitiesQuery>,
) -> ApiResult<Json<Vec<Opportunity>>> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::View).await?;

    let (limit, offset) = page(query.limit, query.offset);
    Ok(Json(
        Opportunity::list_by_account(&state.db, account_id, query.stage, limit, offset).await?,
    ))
}

pub async fn get_opportunity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Opportunity>> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::View).await?;

    let opportunity = Opportunity::find_by_id(&state.db, account_id, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(opportunity))
}

pub async fn create_opportunity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateOpportunityRequest>,
) -> ApiResult<(StatusCode, Json<Opportunity>)> {
    let account_id = require_account(&auth)?;
    req.validate()?;

    ensure_company(&state, account_id, req.company_id).await?;
    ensure_owner(&state, account_id, req.owner_id).await?;

    let owner_id = match req.owner_id {
        Some(owner_id) => Some(owner_id),
        // platform operators aren't account users
        None if auth.is_super_admin() => None,
        None => Some(auth.user_id),
    };

    let mut guard = state.entitlements.begin_create(&auth, MODULE).await?;

    let opportunity = Opportunity::create(
        guard.conn(),
        account_id,
        CreateOpportunity {
            company_id: req.company_id,
            owner_id,
            title: req.title.trim().to_string(),
            value_cents: req.value_cents,
            stage: req.stage.unwrap_or(OpportunityStage::Lead),
            expected_close_date: req.expected_close_date,
        },
    )
    .await?;

    guard.commit().await?;

    Ok((StatusCode::CREATED, Json(opportunity)))
}

pub async fn update_opportunity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateOpportunityRequest>,
) -> ApiResult<Json<Opportunity>> {
    let account_id = require_account(&auth)?;
    req.validate()?;
    state.entitlements.enforce(&auth, MODULE, Action::Edit).await?;

    ensure_company(&state, account_id, req.company_id).await?;
    ensure_owner(&state, account_id, req.owner_id).await?;

    let opportunity = Opportunity::update(
        &state.db,
        account_id,
        id,
        UpdateOpportunity {
            company_id: req.company_id,
            owner_id: req.owner_id,
            title: req.title.map(|title| title.trim().to_string()),
            value_cents: req.value_cents,
            stage: req.stage,
            expected_close_date: req.expected_close_date,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    if req.stage.is_some_and(|stage| stage.is_closed()) {
        tracing::info!(
            account_id = %account_id,
            opportunity_id = %opportunity.id,
            stage = opportunity.stage.as_str(),
            value_cents = opportunity.value_cents,
            "Opportunity closed"
        );
    }

    Ok(Json(opportunity))
}

pub async fn delete_opportunity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::Delete).await?;

    if !Opportunity::soft_delete(&state.db, account_id, id).await? {
        return Err(not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_value_rejected() {
        let req: CreateOpportunityRequest = serde_json::from_value(serde_json::json!({
            "title": "Annual contract",
            "valueCents": -100
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("value_cents"));
    }

    #[test]
    fn test_create_defaults() {
        let req: CreateOpportunityRequest = serde_json::from_value(serde_json::json!({
            "title": "Pilot",
            "expectedCloseDate": "2025-06-30"
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        assert_eq!(req.value_cents, 0);
        assert!(req.stage.is_none());
        assert_eq!(
            req.expected_close_date,
            NaiveDate::from_ymd_opt(2025, 6, 30)
        );
    }
}
