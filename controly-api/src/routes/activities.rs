/// Logged activities (`CRM` module)
///
/// - `GET /v1/activities?companyId=&opportunityId=&limit=&offset=` - view
/// - `GET /v1/activities/:id` - view
/// - `POST /v1/activities` - create
/// - `PATCH /v1/activities/:id` - edit
/// - `DELETE /v1/activities/:id` - soft delete
///
/// Activities share the CRM verdict with opportunities, limit state
/// included: an account at its CRM limit can't log new activities either.

use super::{companies::ensure_company, opportunities::ensure_opportunity, page};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use controly_shared::{
    auth::{authorization::require_account, middleware::AuthContext},
    entitlement::Action,
    models::{
        activity::{Activity, ActivityFilter, ActivityKind, CreateActivity, UpdateActivity},
        module::ModuleType,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

const MODULE: ModuleType = ModuleType::Crm;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListActivitiesQuery {
    pub company_id: Option<Uuid>,
    pub opportunity_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    pub kind: ActivityKind,

    #[validate(length(min = 1, max = 255, message = "Subject must be 1-255 characters"))]
    pub subject: String,

    pub notes: Option<String>,

    pub company_id: Option<Uuid>,

    pub opportunity_id: Option<Uuid>,

    /// Defaults to now
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateActivityRequest {
    pub kind: Option<ActivityKind>,

    #[validate(length(min = 1, max = 255, message = "Subject must be 1-255 characters"))]
    pub subject: Option<String>,

    pub notes: Option<String>,

    pub occurred_at: Option<DateTime<Utc>>,
}

fn not_found() -> ApiError {
    ApiError::NotFound("Activity not found".to_string())
}

pub async fn list_activities(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListActivitiesQuery>,
) -> ApiResult<Json<Vec<Activity>>> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::View).await?;

    let filter = ActivityFilter {
        company_id: query.company_id,
        opportunity_id: query.opportunity_id,
    };
    let (limit, offset) = page(query.limit, query.offset);

    Ok(Json(
        Activity::list_by_account(&state.db, account_id, filter, limit, offset).await?,
    ))
}

pub async fn get_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Activity>> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::View).await?;

    let activity = Activity::find_by_id(&state.db, account_id, id)
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(activity))
}

pub async fn create_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateActivityRequest>,
) -> ApiResult<(StatusCode, Json<Activity>)> {
    let account_id = require_account(&auth)?;
    req.validate()?;

    ensure_company(&state, account_id, req.company_id).await?;
    ensure_opportunity(&state, account_id, req.opportunity_id).await?;

    let mut guard = state.entitlements.begin_create(&auth, MODULE).await?;

    let activity = Activity::create(
        guard.conn(),
        account_id,
        auth.user_id,
        CreateActivity {
            company_id: req.company_id,
            opportunity_id: req.opportunity_id,
            kind: req.kind,
            subject: req.subject.trim().to_string(),
            notes: req.notes,
            occurred_at: req.occurred_at,
        },
    )
    .await?;

    guard.commit().await?;

    Ok((StatusCode::CREATED, Json(activity)))
}

pub async fn update_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateActivityRequest>,
) -> ApiResult<Json<Activity>> {
    let account_id = require_account(&auth)?;
    req.validate()?;
    state.entitlements.enforce(&auth, MODULE, Action::Edit).await?;

    let activity = Activity::update(
        &state.db,
        account_id,
        id,
        UpdateActivity {
            kind: req.kind,
            subject: req.subject.map(|subject| subject.trim().to_string()),
            notes: req.notes,
            occurred_at: req.occurred_at,
        },
    )
    .await?
    .ok_or_else(not_found)?;

    Ok(Json(activity))
}

pub async fn delete_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::Delete).await?;

    if !Activity::soft_delete(&state.db, account_id, id).await? {
        return Err(not_found());
    }

    Ok(StatusCode::NO_CONTENT)
}
