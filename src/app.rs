use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::authz::{self, PolicyRegistry};
use crate::bootstrap;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::{JwtConfig, TokenIssuer};
use crate::routes;
use crate::services::AuthService;
use crate::session::SessionAuthenticator;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub tokens: TokenIssuer,
    pub policies: Arc<PolicyRegistry>,
    pub sessions: SessionAuthenticator,
    pub event_bus: EventBus,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, event_bus: EventBus) -> Self {
        let jwt = Arc::new(jwt);
        let tokens = TokenIssuer::new(Arc::clone(&jwt));
        let auth = AuthService::new(pool.clone(), tokens.clone(), event_bus.clone());

        Self {
            pool,
            jwt,
            tokens,
            policies: Arc::new(PolicyRegistry::from_catalog()),
            sessions: SessionAuthenticator::new(),
            event_bus,
            auth,
        }
    }
}

/// Build the application from environment configuration.
pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let config = AppConfig::from_env()?;
    create_app_with_config(pool, config).await
}

/// Bootstrap storage, start the activity listener and assemble the router.
pub async fn create_app_with_config(pool: SqlitePool, config: AppConfig) -> Result<Router, AppError> {
    let report = bootstrap::run(&pool, &config.admin).await?;
    tracing::info!(
        permissions_added = report.catalog.added.len(),
        permissions_removed = report.catalog.removed.len(),
        permissions_restored = report.catalog.restored.len(),
        admin_created = report.admin_created,
        "bootstrap complete"
    );

    let (event_bus, event_rx) = init_event_bus();
    tokio::spawn(start_activity_listener(event_rx, pool.clone()));

    let request_timeout = config.request_timeout;
    let state = AppState::new(pool, config.jwt, event_bus);
    tracing::info!(policies = state.policies.len(), "authorization policies registered");

    Ok(router(state, request_timeout))
}

fn router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    // Everything in here requires a valid session token; per-method permission
    // layers are attached inside the route modules.
    let protected = Router::new()
        .merge(routes::users::routes())
        .merge(routes::products::routes(&state.policies))
        .merge(routes::rbac::routes(&state.policies))
        .route_layer(from_fn_with_state(state.clone(), authz::authenticate));

    Router::new()
        .nest("/auth", routes::auth::routes())
        .merge(routes::health::routes())
        .nest("/api", protected)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
