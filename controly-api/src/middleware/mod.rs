/// Middleware modules for the API server
///
/// - Security headers
/// - JWT authentication lives in `controly_shared::auth::middleware`

pub mod security;
