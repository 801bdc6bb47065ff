//! Rollcall API - authentication service for the attendance system
//!
//! Issues signed bearer tokens on login, revokes them on logout and guards
//! protected routes with per-request verification against a shared
//! revocation store.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use anyhow::Context;
use auth::{AuthSessionManager, MemoryRevocationStore, RedisRevocationStore, RevocationStore};
use axum::{routing::get, Json, Router};
use rollcall_core::{
    AppConfig, CacheBackend, CredentialStore, InMemoryCredentialStore, LoggingConfig,
    PgCredentialStore,
};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login_handler,
        handlers::auth::logout_handler,
        handlers::auth::me_handler,
        handlers::health::health_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        auth::LoginRequest,
        auth::LoginResponse,
        auth::LogoutResponse,
        auth::AuthenticatedIdentity,
        error::ApiError,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Login, logout and current identity"),
        (name = "health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the router with all routes and layers
pub fn create_router(state: Arc<AppState>) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::prometheus_metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build application state from configuration
///
/// PostgreSQL backs credential lookups when a database URL is configured;
/// otherwise the bootstrap accounts from configuration are served from
/// memory. The revocation store follows `cache.backend`.
pub async fn build_state(config: AppConfig) -> anyhow::Result<Arc<AppState>> {
    if config.auth.uses_development_secret() {
        tracing::warn!("JWT_SECRET not set; using the development signing secret");
    }

    let credentials: Arc<dyn CredentialStore> = match &config.database.postgres_url {
        Some(url) => {
            let store = PgCredentialStore::new(url, config.database.postgres_pool_size)
                .await
                .context("failed to connect credential store")?;
            tracing::info!("Credential store: postgres");
            Arc::new(store)
        }
        None => {
            let store = InMemoryCredentialStore::from_bootstrap(&config.auth.bootstrap_users);
            if store.is_empty() {
                tracing::warn!("No bootstrap users configured; every login will fail");
            }
            tracing::info!(accounts = store.len(), "Credential store: memory");
            Arc::new(store)
        }
    };

    let revocations: Arc<dyn RevocationStore> = match config.cache.backend {
        CacheBackend::Memory => Arc::new(MemoryRevocationStore::new()),
        CacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the redis revocation backend")?;
            let store = RedisRevocationStore::connect(url, config.cache.key_prefix.clone())
                .await
                .context("failed to connect revocation store")?;
            Arc::new(store)
        }
    };
    tracing::info!(store = revocations.name(), "Revocation store ready");

    let auth = AuthSessionManager::new(&config.auth, credentials, revocations)?;

    Ok(Arc::new(AppState::new(config, Arc::new(auth))))
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level));

    if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
