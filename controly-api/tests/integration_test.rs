/// Integration tests for the Controly API
///
/// Tests without a database cover routing, authentication and the static
/// catalog. Tests marked `#[ignore]` need PostgreSQL at `DATABASE_URL`:
///
/// ```bash
/// DATABASE_URL=postgres://localhost/controly_test cargo test -p controly-api -- --ignored
/// ```

mod common;

use axum::http::{Request, StatusCode};
use common::{
    json_body, offline_app, send, unique_email, TestContext, CONTACTS_LIMIT, JWT_SECRET, PASSWORD,
};
use controly_shared::auth::jwt::{create_token, Claims, TokenType};
use controly_shared::models::company::Company;
use controly_shared::models::user::UserRole;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_module_catalog_is_public() {
    let response = send(offline_app(), Request::builder().uri("/v1/modules"), None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    let body = json_body(response).await;
    let types: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|module| module["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, ["USERS", "CONTACTS", "CRM"]);
    assert_eq!(body[1]["defaultLimit"], 500);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let response = send(offline_app(), Request::builder().uri("/v1/permissions"), None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_protected_route_rejects_bad_token() {
    let builder = Request::builder()
        .uri("/v1/companies")
        .header("authorization", "Bearer not-a-jwt");
    let response = send(offline_app(), builder, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_not_accepted_as_access_token() {
    let claims = Claims::new(
        Uuid::new_v4(),
        Some(UserRole::BusinessAdmin),
        Some(Uuid::new_v4()),
        TokenType::Refresh,
    );
    let token = create_token(&claims, JWT_SECRET).unwrap();

    let builder = Request::builder()
        .uri("/v1/companies")
        .header("authorization", format!("Bearer {}", token));
    let response = send(offline_app(), builder, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_business_admin() {
    let claims = Claims::new(
        Uuid::new_v4(),
        Some(UserRole::BusinessAdmin),
        Some(Uuid::new_v4()),
        TokenType::Access,
    );
    let token = create_token(&claims, JWT_SECRET).unwrap();

    let builder = Request::builder()
        .uri("/v1/admin/plans")
        .header("authorization", format!("Bearer {}", token));
    let response = send(offline_app(), builder, None).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let response = send(offline_app(), Request::builder().uri("/v1/invoices"), None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_register_then_login() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email();

    let register = send(
        ctx.app.clone(),
        Request::builder().method("POST").uri("/v1/auth/register"),
        Some(json!({
            "email": email,
            "password": PASSWORD,
            "name": "Ada",
            "accountName": "Analytical Engines"
        })),
    )
    .await;

    assert_eq!(register.status(), StatusCode::CREATED);
    let body = json_body(register).await;
    assert_eq!(body["user"]["role"], "BUSINESS_ADMIN");
    assert!(body["accessToken"].is_string());

    let login = send(
        ctx.app.clone(),
        Request::builder().method("POST").uri("/v1/auth/login"),
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(login.status(), StatusCode::OK);

    let wrong = send(
        ctx.app.clone(),
        Request::builder().method("POST").uri("/v1/auth/login"),
        Some(json!({ "email": email, "password": "Wrong-password-1" })),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_me_returns_user_account_and_plan() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.send("GET", "/v1/auth/me", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["user"]["id"], ctx.admin.id.to_string());
    assert_eq!(body["account"]["id"], ctx.account.id.to_string());
    assert_eq!(body["plan"]["id"], ctx.plan.id.to_string());
    assert!(body["user"].get("passwordHash").is_none());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_permissions_reflect_plan() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx.send("GET", "/v1/permissions", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let contacts = body
        .as_array()
        .unwrap()
        .iter()
        .find(|permission| permission["moduleType"] == "CONTACTS")
        .unwrap();
    assert_eq!(contacts["canCreate"], true);
    assert_eq!(contacts["itemLimit"], CONTACTS_LIMIT);
    assert_eq!(contacts["currentCount"], 0);

    // Not on the plan
    let crm = ctx.send("GET", "/v1/permissions/crm", None).await;
    let crm = json_body(crm).await;
    assert_eq!(crm["canView"], false);

    let unknown = ctx.send("GET", "/v1/permissions/billing", None).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_company_creation_stops_at_plan_limit() {
    let ctx = TestContext::new().await.unwrap();

    for i in 0..CONTACTS_LIMIT {
        let response = ctx
            .send("POST", "/v1/companies", Some(json!({ "name": format!("Company {}", i) })))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = ctx
        .send("POST", "/v1/companies", Some(json!({ "name": "One too many" })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = json_body(response).await;
    assert_eq!(body["error"], "PLAN_LIMIT_EXCEEDED");
    assert_eq!(body["details"]["currentCount"], CONTACTS_LIMIT);
    assert_eq!(body["details"]["limit"], CONTACTS_LIMIT);

    let stored = Company::count_by_account(&ctx.db, ctx.account.id).await.unwrap();
    assert_eq!(stored, i64::from(CONTACTS_LIMIT));

    // At the limit, reads still work
    let list = ctx.send("GET", "/v1/companies", None).await;
    assert_eq!(list.status(), StatusCode::OK);
    assert_eq!(json_body(list).await.as_array().unwrap().len(), CONTACTS_LIMIT as usize);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_module_outside_plan_is_blocked() {
    let ctx = TestContext::new().await.unwrap();

    let response = ctx
        .send("POST", "/v1/opportunities", Some(json!({ "title": "Pilot" })))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body = json_body(response).await;
    assert_eq!(body["error"], "MODULE_NOT_AVAILABLE");

    let list = ctx.send("GET", "/v1/opportunities", None).await;
    assert_eq!(list.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn test_health_reports_database() {
    let ctx = TestContext::new().await.unwrap();

    let response = send(ctx.app.clone(), Request::builder().uri("/health"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["database"], "connected");
}
