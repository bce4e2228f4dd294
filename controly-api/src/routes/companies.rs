/// Companies of the current business account (`CONTACTS` module)
///
/// - `GET /v1/companies?limit=&offset=`, `GET /v1/companies/:id` - view
/// - `POST /v1/companies` - create, counted against the plan limit
/// - `PATCH /v1/companies/:id` - edit
/// - `DELETE /v1/companies/:id` - soft delete, frees a slot

use super::page;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use controly_shared::{
    auth::{authorization::require_account, middleware::AuthContext},
    entitlement::Action,
    models::{
        company::{Company, CreateCompany, UpdateCompany},
        module::ModuleType,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

const MODULE: ModuleType = ModuleType::Contacts;

#[derive(Debug, Deserialize)]
pub struct ListCompaniesQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 50, message = "Phone must be at most 50 characters"))]
    pub phone: Option<String>,

    #[validate(url(message = "Invalid website URL"))]
    pub website: Option<String>,

    #[validate(length(max = 100, message = "Industry must be at most 100 characters"))]
    pub industry: Option<String>,

    pub address: Option<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 50, message = "Phone must be at most 50 characters"))]
    pub phone: Option<String>,

    #[validate(url(message = "Invalid website URL"))]
    pub website: Option<String>,

    #[validate(length(max = 100, message = "Industry must be at most 100 characters"))]
    pub industry: Option<String>,

    pub address: Option<String>,

    pub notes: Option<String>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Company not found".to_string())
}

/// Rejects references to companies of other accounts
pub(crate) async fn ensure_company(
    state: &AppState,
    account_id: Uuid,
    company_id: Option<Uuid>,
) -> ApiResult<()> {
    if let Some(company_id) = company_id {
        if Company::find_by_id(&state.db, account_id, company_id).await?.is_none() {
            return Err(ApiError::invalid_field("companyId", "Company not found"));
        }
    }
    Ok(())
}

pub async fn list_companies(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListCompaniesQuery>,
) -> ApiResult<Json<Vec<Company>>> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::View).await?;

    let (limit, offset) = page(query.limit, query.offset);
    Ok(Json(
        Company::list_by_account(&state.db, account_id, limit, offset).await?,
    ))
}

pub async fn get_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Company>> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::View).await?;

    let company = Company::find_by_id(&state.db, account_id, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(company))
}

/// Creates a company
///
/// # Errors
///
/// - `403 PLAN_LIMIT_EXCEEDED`: The account is at its contacts limit
/// - `403 MODULE_NOT_AVAILABLE`: The plan doesn't include contacts
pub async fn create_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateCompanyRequest>,
) -> ApiResult<(StatusCode, Json<Company>)> {
    let account_id = require_account(&auth)?;
    req.validate()?;

    let mut guard = state.entitlements.begin_create(&auth, MODULE).await?;

    let company = Company::create(
        guard.conn(),
        account_id,
        auth.user_id,
        CreateCompany {
            name: req.name.trim().to_string(),
            email: req.email,
            phone: req.phone,
            website: req.website,
            industry: req.industry,
            address: req.address,
            notes: req.notes,
        },
    )
    .await?;

    let verdict = *guard.verdict();
    guard.commit().await?;

    tracing::debug!(
        account_id = %account_id,
        company_id = %company.id,
        count = verdict.current_count.saturating_add(1),
        limit = ?verdict.item_limit,
        "Company created"
    );

    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn update_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCompanyRequest>,
) -> ApiResult<Json<Company>> {
    let account_id = require_account(&auth)?;
    req.validate()?;
    state.entitlements.enforce(&auth, MODULE, Action::Edit).await?;

    let company = Company::update(
        &state.db,
        account_id,
        id,
        UpdateCompany {
            name: req.name.map(|name| name.trim().to_string()),
            email: req.email,
            phone: req.phone,
            website: req.website,
            industry: req.industry,
            address: req.address,
            notes: req.notes,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(company))
}

pub async fn delete_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::Delete).await?;

    if !Company::soft_delete(&state.db, account_id, id).await? {
        return Err(not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}
