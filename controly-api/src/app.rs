/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use controly_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = controly_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, patch, post, put},
    Router,
};
use controly_shared::{auth::middleware::authenticate, entitlement::EntitlementService};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,

    /// Plan entitlement checks over the same pool
    pub entitlements: Arc<EntitlementService>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        let entitlements = EntitlementService::postgres(db.clone(), config.entitlements.strict_limits);

        Self {
            db,
            config: Arc::new(config),
            entitlements: Arc::new(entitlements),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET /health                               public
/// └── /v1
///     ├── /auth/{register,login,refresh}        public
///     ├── GET /auth/me
///     ├── GET /modules                          public, module catalog
///     ├── GET /plans                            public, active plans
///     ├── GET /permissions[/:module]
///     ├── GET|PATCH /account, PUT /account/plan
///     ├── /users[/:id]                          USERS module
///     ├── /companies[/:id]                      CONTACTS module
///     ├── /opportunities[/:id]                  CRM module
///     ├── /activities[/:id]                     CRM module
///     └── /admin/{plans,accounts}               SUPER_ADMIN
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. JWT authentication on protected routes
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/v1/auth/register", post(routes::auth::register))
        .route("/v1/auth/login", post(routes::auth::login))
        .route("/v1/auth/refresh", post(routes::auth::refresh))
        .route("/v1/modules", get(routes::modules::list_modules))
        .route("/v1/plans", get(routes::plans::list_plans));

    let account_routes = Router::new()
        .route("/v1/auth/me", get(routes::auth::me))
        .route("/v1/permissions", get(routes::permissions::list_permissions))
        .route("/v1/permissions/:module", get(routes::permissions::get_permission))
        .route(
            "/v1/account",
            get(routes::account::get_account).patch(routes::account::rename_account),
        )
        .route("/v1/account/plan", put(routes::account::change_plan));

    let tenant_routes = Router::new()
        .route(
            "/v1/users",
            get(routes::users::list_users).post(routes::users::create_user),
        )
        .route(
            "/v1/users/:id",
            get(routes::users::get_user)
                .patch(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route(
            "/v1/companies",
            get(routes::companies::list_companies).post(routes::companies::create_company),
        )
        .route(
            "/v1/companies/:id",
            get(routes::companies::get_company)
                .patch(routes::companies::update_company)
                .delete(routes::companies::delete_company),
        )
        .route(
            "/v1/opportunities",
            get(routes::opportunities::list_opportunities)
                .post(routes::opportunities::create_opportunity),
        )
        .route(
            "/v1/opportunities/:id",
            get(routes::opportunities::get_opportunity)
                .patch(routes::opportunities::update_opportunity)
                .delete(routes::opportunities::delete_opportunity),
        )
        .route(
            "/v1/activities",
            get(routes::activities::list_activities).post(routes::activities::create_activity),
        )
        .route(
            "/v1/activities/:id",
            get(routes::activities::get_activity)
                .patch(routes::activities::update_activity)
                .delete(routes::activities::delete_activity),
        );

    let admin_routes = Router::new()
        .route(
            "/v1/admin/plans",
            get(routes::admin::list_plans).post(routes::admin::create_plan),
        )
        .route("/v1/admin/plans/:id", patch(routes::admin::update_plan))
        .route(
            "/v1/admin/plans/:id/modules/:module",
            put(routes::admin::upsert_plan_module).delete(routes::admin::delete_plan_module),
        )
        .route(
            "/v1/admin/accounts/:id",
            patch(routes::admin::update_account).delete(routes::admin::delete_account),
        );

    let protected_routes = account_routes
        .merge(tenant_routes)
        .merge(admin_routes)
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// JWT authentication middleware layer
///
/// Validates the bearer access token and injects
/// [`AuthContext`](controly_shared::auth::middleware::AuthContext) into the
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
