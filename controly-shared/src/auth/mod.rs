/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the password policy
/// - [`jwt`]: access/refresh tokens carrying role and business account
/// - [`middleware`]: Axum middleware producing an `AuthContext`
/// - [`authorization`]: role gates (`SUPER_ADMIN` > `BUSINESS_ADMIN` > `USER`)
///
/// Plan-based checks live in [`crate::entitlement`].
///
/// # Example
///
/// ```no_run
/// use controly_shared::auth::password::{hash_password, verify_password};
/// use controly_shared::auth::jwt::{create_token, Claims, TokenType};
/// use controly_shared::models::user::UserRole;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Pipeline42")?;
/// assert!(verify_password("Pipeline42", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), Some(UserRole::User), Some(Uuid::new_v4()), TokenType::Access);
/// let token = create_token(&claims, "a-secret-of-at-least-thirty-two-bytes!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
