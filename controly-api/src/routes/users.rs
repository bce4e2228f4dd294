/// Users of the current business account (`USERS` module)
///
/// - `GET /v1/users`, `GET /v1/users/:id` - view
/// - `POST /v1/users` - create, BUSINESS_ADMIN, counted against the plan limit
/// - `PATCH /v1/users/:id` - edit, BUSINESS_ADMIN
/// - `DELETE /v1/users/:id` - soft delete, BUSINESS_ADMIN, not yourself
///
/// Role gates and plan gates are independent: a create needs both the admin
/// role and a plan that allows another user.

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
    auth::{
        authorization::{require_account, require_account_admin},
        middleware::AuthContext,
        password,
    },
    entitlement::Action,
    models::{
        module::ModuleType,
        user::{CreateUser, UpdateUser, User, UserRole},
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

const MODULE: ModuleType = ModuleType::Users;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    /// Defaults to `USER`
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    pub role: Option<UserRole>,

    pub is_active: Option<bool>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Tenant users may only hold tenant roles
fn check_assignable_role(role: Option<UserRole>) -> ApiResult<()> {
    if role == Some(UserRole::SuperAdmin) {
        return Err(ApiError::invalid_field(
            "role",
            "SUPER_ADMIN cannot be assigned to account users",
        ));
    }
    Ok(())
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<User>>> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::View).await?;

    Ok(Json(User::list_by_account(&state.db, account_id).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    let account_id = require_account(&auth)?;
    state.entitlements.enforce(&auth, MODULE, Action::View).await?;

    let user = User::find_in_account(&state.db, account_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Invites a user into the account
///
/// # Errors
///
/// - `403 PLAN_LIMIT_EXCEEDED`: The account is at its user limit
/// - `409 Conflict`: Email already exists
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let account_id = require_account_admin(&auth)?;
    req.validate()?;
    check_assignable_role(req.role)?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;
    let password_hash = password::hash_password(&req.password)?;

    let mut guard = state.entitlements.begin_create(&auth, MODULE).await?;

    let user = User::create(
        guard.conn(),
        CreateUser {
            business_account_id: Some(account_id),
            email: req.email,
            password_hash,
            name: req.name,
            role: req.role.unwrap_or(UserRole::User),
        },
    )
    .await?;

    guard.commit().await?;

    tracing::info!(account_id = %account_id, user_id = %user.id, role = user.role.as_str(), "User created");

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    let account_id = require_account_admin(&auth)?;
    req.validate()?;
    check_assignable_role(req.role)?;

    if id == auth.user_id && (req.role.is_some() || req.is_active == Some(false)) {
        return Err(ApiError::BadRequest(
            "You cannot change your own role or deactivate yourself".to_string(),
        ));
    }

    state.entitlements.enforce(&auth, MODULE, Action::Edit).await?;

    let password_hash = match req.password.as_deref() {
        Some(new_password) => {
            password::validate_password_strength(new_password)
                .map_err(|e| ApiError::invalid_field("password", e))?;
            Some(password::hash_password(new_password)?)
        }
        None => None,
    };

    let user = User::update(
        &state.db,
        account_id,
        id,
        UpdateUser {
            name: req.name,
            role: req.role,
            is_active: req.is_active,
            password_hash,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let account_id = require_account_admin(&auth)?;

    if id == auth.user_id {
        return Err(ApiError::BadRequest("You cannot delete yourself".to_string()));
    }

    state.entitlements.enforce(&auth, MODULE, Action::Delete).await?;

    if !User::soft_delete(&state.db, account_id, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(account_id = %account_id, user_id = %id, "User deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_admin_not_assignable() {
        assert!(check_assignable_role(Some(UserRole::SuperAdmin)).is_err());
        assert!(check_assignable_role(Some(UserRole::BusinessAdmin)).is_ok());
        assert!(check_assignable_role(None).is_ok());
    }

    #[test]
    fn test_create_request_defaults() {
        let req: CreateUserRequest = serde_json::from_value(serde_json::json!({
            "email": "member@acme.test",
            "password": "SecurePass123"
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        assert_eq!(req.role, None);
    }
}
