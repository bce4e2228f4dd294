/// Common test utilities for integration tests
///
/// - Router construction with or without a live database
/// - Fixture plan, business account and admin user
/// - JWT token generation
/// - Request/response helpers

use axum::body::Body;
use axum::http::{Request, Response};
use controly_api::app::{build_router, AppState};
use controly_api::config::{
    ApiConfig, Config, DatabaseConfig, EntitlementConfig, JwtConfig, LogFormat,
};
use controly_shared::auth::jwt::{create_token, Claims, TokenType};
use controly_shared::auth::password::hash_password;
use controly_shared::models::business_account::{BusinessAccount, CreateBusinessAccount};
use controly_shared::models::module::ModuleType;
use controly_shared::models::plan::{CreatePlan, Plan, PlanStatus};
use controly_shared::models::plan_module::{PlanModule, UpsertPlanModule};
use controly_shared::models::user::{CreateUser, User, UserRole};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret-of-32-plus-bytes";

/// Password of the fixture admin
pub const PASSWORD: &str = "Pipeline42";

/// Contacts limit of the fixture plan
pub const CONTACTS_LIMIT: u32 = 2;

pub fn database_url() -> String {
    std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/controly_test".to_string())
}

pub fn test_config(database_url: String) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 5,
            run_migrations: false,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        entitlements: EntitlementConfig { strict_limits: true },
        log_format: LogFormat::Pretty,
    }
}

/// Router over a pool that never connects
///
/// Good for anything answered before a query runs: static routes, auth
/// rejections, unknown paths.
pub fn offline_app() -> axum::Router {
    let url = database_url();
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&url)
        .expect("lazy pool");

    build_router(AppState::new(pool, test_config(url)))
}

/// Test context backed by a migrated database
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub plan: Plan,
    pub account: BusinessAccount,
    pub admin: User,
    pub jwt_token: String,
}

impl TestContext {
    /// Creates a plan with CONTACTS capped at [`CONTACTS_LIMIT`], an account
    /// on it and a BUSINESS_ADMIN
    pub async fn new() -> anyhow::Result<Self> {
        let url = database_url();
        let db = PgPool::connect(&url).await?;

        // Path relative to Cargo.toml, not this file
        sqlx::migrate!("../migrations").run(&db).await?;

        let plan = Plan::create(
            &db,
            CreatePlan {
                name: format!("test-{}", Uuid::new_v4()),
                description: None,
                status: PlanStatus::Active,
                monthly_price_cents: 0,
                annual_price_cents: 0,
                is_default: false,
            },
        )
        .await?;

        PlanModule::upsert(
            &db,
            plan.id,
            ModuleType::Contacts,
            UpsertPlanModule {
                is_included: true,
                item_limit: Some(CONTACTS_LIMIT),
                can_create: true,
                can_edit: true,
                can_delete: true,
            },
        )
        .await?;

        let account = BusinessAccount::create(
            &db,
            CreateBusinessAccount {
                name: format!("Test Account {}", Uuid::new_v4()),
                plan_id: Some(plan.id),
            },
        )
        .await?;

        let admin = User::create(
            &db,
            CreateUser {
                business_account_id: Some(account.id),
                email: unique_email(),
                password_hash: hash_password(PASSWORD)?,
                name: Some("Test Admin".to_string()),
                role: UserRole::BusinessAdmin,
            },
        )
        .await?;

        let jwt_token = create_token(&Claims::for_user(&admin, TokenType::Access), JWT_SECRET)?;

        let app = build_router(AppState::new(db.clone(), test_config(url)));

        Ok(Self {
            db,
            app,
            plan,
            account,
            admin,
            jwt_token,
        })
    }

    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Sends an authenticated JSON request
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", self.auth_header());

        send(self.app.clone(), builder, body).await
    }
}

pub fn unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4())
}

/// Sends a request with an optional JSON body
pub async fn send(
    app: axum::Router,
    builder: axum::http::request::Builder,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
