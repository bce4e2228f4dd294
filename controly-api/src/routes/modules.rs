/// Module catalog endpoint
///
/// ```text
/// GET /v1/modules
/// ```
///
/// ```json
/// [
///   { "type": "USERS", "name": "Users", "description": "...", "hasLimits": true, "defaultLimit": 5 },
///   ...
/// ]
/// ```

use axum::Json;
use controly_shared::models::module::{catalog, Module};

pub async fn list_modules() -> Json<&'static [Module]> {
    Json(catalog())
}
