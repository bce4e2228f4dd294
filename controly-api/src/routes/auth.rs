/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Create a business account and its first admin
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for a new access token
/// - `GET /v1/auth/me` - Current user, account and plan

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use controly_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        middleware::AuthContext,
        password,
    },
    models::{
        business_account::{BusinessAccount, CreateBusinessAccount},
        plan::Plan,
        user::{CreateUser, User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also checked for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Account name must be 1-255 characters"))]
    pub account_name: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Issued token pair
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Register/login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,

    pub account: Option<BusinessAccount>,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Refresh response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

/// Current user response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: User,
    pub account: Option<BusinessAccount>,
    pub plan: Option<Plan>,
}

fn issue_tokens(user: &User, secret: &str) -> ApiResult<TokenPair> {
    let access_claims = Claims::for_user(user, TokenType::Access);
    let refresh_claims = Claims::for_user(user, TokenType::Refresh);

    Ok(TokenPair {
        access_token: jwt::create_token(&access_claims, secret)?,
        refresh_token: jwt::create_token(&refresh_claims, secret)?,
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    })
}

/// Registers a business account
///
/// Creates the account on the default plan and its first user as
/// `BUSINESS_ADMIN`, in one transaction. Without a default plan the account
/// is created without one and every module is unavailable until a plan is
/// chosen.
///
/// ```text
/// POST /v1/auth/register
///
/// { "email": "owner@acme.test", "password": "SecurePass123",
///   "name": "Jane", "accountName": "Acme Inc" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let password_hash = password::hash_password(&req.password)?;

    let mut tx = state.db.begin().await?;

    let plan = Plan::find_default(&mut *tx).await?;
    if plan.is_none() {
        tracing::warn!("No default plan configured; registering account without a plan");
    }

    let account = BusinessAccount::create(
        &mut *tx,
        CreateBusinessAccount {
            name: req.account_name.trim().to_string(),
            plan_id: plan.as_ref().map(|p| p.id),
        },
    )
    .await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            business_account_id: Some(account.id),
            email: req.email,
            password_hash,
            name: req.name,
            role: UserRole::BusinessAdmin,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        account_id = %account.id,
        user_id = %user.id,
        plan = plan.as_ref().map(|p| p.name.as_str()),
        "Business account registered"
    );

    let tokens = issue_tokens(&user, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            account: Some(account),
            tokens,
        }),
    ))
}

/// Authenticates a user and returns JWT tokens
///
/// ```text
/// POST /v1/auth/login
///
/// { "email": "owner@acme.test", "password": "SecurePass123" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials or deactivated user
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("User is deactivated".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    let account = match user.business_account_id {
        Some(account_id) => BusinessAccount::find_by_id(&state.db, account_id).await?,
        None => None,
    };

    let tokens = issue_tokens(&user, state.jwt_secret())?;

    Ok(Json(AuthResponse {
        user,
        account,
        tokens,
    }))
}

/// Exchanges a refresh token for a new access token
///
/// The user is reloaded so the new token carries their current role and
/// account; deleted or deactivated users are refused.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token, unknown user
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized("User no longer active".to_string()))?;

    let access_claims = Claims::for_user(&user, TokenType::Access);

    Ok(Json(RefreshResponse {
        access_token: jwt::create_token(&access_claims, state.jwt_secret())?,
        expires_in: TokenType::Access.default_expiration().num_seconds(),
    }))
}

/// Returns the current user with their account and plan
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MeResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let account = match user.business_account_id {
        Some(account_id) => BusinessAccount::find_by_id(&state.db, account_id).await?,
        None => None,
    };

    let plan = match account.as_ref().and_then(|a| a.plan_id) {
        Some(plan_id) => Plan::find_by_id(&state.db, plan_id).await?,
        None => None,
    };

    Ok(Json(MeResponse { user, account, plan }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            name: None,
            account_name: String::new(),
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("account_name"));
    }

    #[test]
    fn test_register_request_camel_case() {
        let req: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "owner@acme.test",
            "password": "SecurePass123",
            "accountName": "Acme"
        }))
        .unwrap();

        assert_eq!(req.account_name, "Acme");
        assert!(req.validate().is_ok());
    }
}
