/// Permission verdicts of the current user
///
/// ```text
/// GET /v1/permissions
/// GET /v1/permissions/:module
/// ```
///
/// ```json
/// {
///   "moduleType": "CONTACTS",
///   "canView": true, "canCreate": true, "canEdit": true, "canDelete": true,
///   "itemLimit": 100, "currentCount": 80,
///   "isNearLimit": true, "isAtLimit": false
/// }
/// ```
///
/// Computed by the same resolver that guards the write endpoints, so a
/// client can disable buttons from these verdicts. They are advisory: every
/// write is re-checked.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use controly_shared::{
    auth::middleware::AuthContext,
    entitlement::ModulePermission,
    models::module::ModuleType,
};

pub async fn list_permissions(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ModulePermission>>> {
    Ok(Json(state.entitlements.permissions(&auth).await?))
}

pub async fn get_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(module): Path<String>,
) -> ApiResult<Json<ModulePermission>> {
    let module_type = parse_module(&module)?;
    let verdict = state.entitlements.verdict(&auth, module_type).await?;

    Ok(Json(ModulePermission { module_type, verdict }))
}

/// Parses a module path segment, case-insensitively
pub(crate) fn parse_module(raw: &str) -> ApiResult<ModuleType> {
    ModuleType::from_str(raw).ok_or_else(|| ApiError::NotFound(format!("Unknown module: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module() {
        assert_eq!(parse_module("contacts").unwrap(), ModuleType::Contacts);
        assert_eq!(parse_module("CRM").unwrap(), ModuleType::Crm);
        assert!(matches!(parse_module("billing"), Err(ApiError::NotFound(_))));
    }
}
