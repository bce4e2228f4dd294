/// Request authentication for Axum
///
/// [`authenticate`] validates `Authorization: Bearer <access token>` and
/// yields the [`AuthContext`] the API's auth layer stores in the request
/// extensions. Handlers read it with `Extension<AuthContext>`.
///
/// # Example
///
/// ```no_run
/// use axum::http::HeaderMap;
/// use controly_shared::auth::middleware::authenticate;
///
/// # fn example(headers: &HeaderMap) -> Result<(), Box<dyn std::error::Error>> {
/// let auth = authenticate(headers, "a-secret-of-at-least-thirty-two-bytes!")?;
/// println!("user {} in account {:?}", auth.user_id, auth.business_account_id);
/// # Ok(())
/// # }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, Claims, JwtError};
use crate::models::user::UserRole;

/// Identity of the caller, as stated by a validated access token
///
/// `role` and `business_account_id` are the inputs every entitlement and role
/// check consumes. A context without a role is granted nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: Option<UserRole>,
    pub business_account_id: Option<Uuid>,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            business_account_id: claims.business_account_id,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Some(UserRole::SuperAdmin)
    }
}

/// Authentication failure
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("Expected Bearer token")]
    InvalidFormat,

    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            JwtError::WrongTokenType { .. } => {
                AuthError::InvalidToken("Expected access token".to_string())
            }
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": "UNAUTHORIZED",
            "message": self.to_string(),
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Resolves the caller from request headers
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)?;

    let claims = validate_access_token(token.trim(), secret)?;

    Ok(AuthContext::from_claims(&claims))
}
