/// JWT token generation and validation
///
/// Tokens are HS256-signed and carry the user's identity plus the two facts
/// every entitlement check needs: the role and the business account.
///
/// # Token Types
///
/// - **Access Token**: 24 hours, sent as `Authorization: Bearer <token>`
/// - **Refresh Token**: 30 days, exchanged for a new token pair
///
/// Role and account are snapshots taken at issue time. Refreshing reloads the
/// user, so a role change takes effect at the next refresh at the latest.
///
/// # Example
///
/// ```
/// use controly_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use controly_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-of-at-least-thirty-two-bytes!";
/// let claims = Claims::new(
///     Uuid::new_v4(),
///     Some(UserRole::BusinessAdmin),
///     Some(Uuid::new_v4()),
///     TokenType::Access,
/// );
///
/// let token = create_token(&claims, secret)?;
/// let validated = validate_access_token(&token, secret)?;
/// assert_eq!(validated.role, Some(UserRole::BusinessAdmin));
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{User, UserRole};

/// Issuer of every token
pub const ISSUER: &str = "controly";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,

    /// Access token used where a refresh token is expected, or vice versa
    #[error("Expected {expected} token")]
    WrongTokenType { expected: &'static str },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`) plus:
///
/// - `role`: role of the user when the token was issued
/// - `businessAccountId`: the user's account (absent for platform operators)
/// - `tokenType`: access or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User ID
    pub sub: Uuid,

    pub iss: String,

    pub iat: i64,

    pub exp: i64,

    pub nbf: i64,

    /// A token without a role grants nothing
    #[serde(default)]
    pub role: Option<UserRole>,

    #[serde(default)]
    pub business_account_id: Option<Uuid>,

    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims with the default expiration of `token_type`
    pub fn new(
        user_id: Uuid,
        role: Option<UserRole>,
        business_account_id: Option<Uuid>,
        token_type: TokenType,
    ) -> Self {
        Self::with_expiration(
            user_id,
            role,
            business_account_id,
            token_type,
            token_type.default_expiration(),
        )
    }

    /// Creates claims for a stored user
    pub fn for_user(user: &User, token_type: TokenType) -> Self {
        Self::new(user.id, Some(user.role), user.business_account_id, token_type)
    }

    /// Creates claims with a custom lifetime
    pub fn with_expiration(
        user_id: Uuid,
        role: Option<UserRole>,
        business_account_id: Option<Uuid>,
        token_type: TokenType,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            role,
            business_account_id,
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Seconds until expiration, `None` once expired
    pub fn expires_in(&self) -> Option<i64> {
        let remaining = self.exp - Utc::now().timestamp();
        (remaining > 0).then_some(remaining)
    }
}

/// Signs claims with HS256
///
/// The secret should be at least 32 bytes; the API refuses to start with a
/// shorter one.
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates signature, expiration, not-before and issuer
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Validates a token and requires it to be an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

/// Validates a token and requires it to be a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::WrongTokenType {
            expected: expected.as_str(),
        });
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn claims(token_type: TokenType) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            Some(UserRole::User),
            Some(Uuid::new_v4()),
            token_type,
        )
    }

    #[test]
    fn test_token_type_expiration() {
        assert_eq!(TokenType::Access.default_expiration(), Duration::hours(24));
        assert_eq!(TokenType::Refresh.default_expiration(), Duration::days(30));
    }

    #[test]
    fn test_create_and_validate_token() {
        let original = claims(TokenType::Access);
        let token = create_token(&original, SECRET).expect("Should create token");

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, original.sub);
        assert_eq!(validated.role, Some(UserRole::User));
        assert_eq!(validated.business_account_id, original.business_account_id);
        assert_eq!(validated.iss, ISSUER);
    }

    #[test]
    fn test_super_admin_token_without_account() {
        let original = Claims::new(Uuid::new_v4(), Some(UserRole::SuperAdmin), None, TokenType::Access);
        let token = create_token(&original, SECRET).unwrap();

        let validated = validate_access_token(&token, SECRET).unwrap();
        assert_eq!(validated.role, Some(UserRole::SuperAdmin));
        assert!(validated.business_account_id.is_none());
    }

    #[test]
    fn test_claims_use_camel_case() {
        let json = serde_json::to_value(claims(TokenType::Refresh)).unwrap();
        assert!(json.get("businessAccountId").is_some());
        assert_eq!(json["tokenType"], "refresh");
        assert_eq!(json["role"], "USER");
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&claims(TokenType::Access), "secret1").unwrap();
        assert!(validate_token(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        let expired = Claims::with_expiration(
            Uuid::new_v4(),
            Some(UserRole::User),
            None,
            TokenType::Access,
            Duration::seconds(-3600),
        );
        assert!(expired.is_expired());
        assert!(expired.expires_in().is_none());

        let token = create_token(&expired, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let access = create_token(&claims(TokenType::Access), SECRET).unwrap();
        let refresh = create_token(&claims(TokenType::Refresh), SECRET).unwrap();

        assert!(validate_access_token(&access, SECRET).is_ok());
        assert!(validate_refresh_token(&refresh, SECRET).is_ok());
        assert!(matches!(
            validate_access_token(&refresh, SECRET),
            Err(JwtError::WrongTokenType { expected: "access" })
        ));
        assert!(validate_refresh_token(&access, SECRET).is_err());
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut foreign = claims(TokenType::Access);
        foreign.iss = "someone-else".to_string();
        let token = create_token(&foreign, SECRET).unwrap();

        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::InvalidIssuer)));
    }
}
