//! # strata_api
//!
//! HTTP auth surface for Strata: the router, the request gate, and the
//! login/refresh/logout endpoints over `strata_core`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, me, users};
use crate::middleware::auth::{require_admin, require_auth, require_scopes};
use strata_core::auth::api_keys::ApiKeyAuthenticator;
use strata_core::auth::rate_limit::RateLimiter;
use strata_core::auth::status_cache::UserStatusCache;
use strata_core::auth::store::AuthStore;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage handle (Postgres in production, in-memory in tests).
    pub store: Arc<dyn AuthStore>,
    /// API configuration, including validated auth secrets.
    pub config: ApiConfig,
    /// Process-wide rate limiter (login and API-key attempts).
    pub limiter: Arc<RateLimiter>,
    /// Read-through cache of live account status.
    pub status_cache: Arc<UserStatusCache>,
    /// API key verifier; shares `limiter`.
    pub api_keys: Arc<ApiKeyAuthenticator>,
}

impl AppState {
    /// Wire up state with default-configured limiter and status cache.
    pub fn new(store: Arc<dyn AuthStore>, config: ApiConfig) -> Self {
        let limiter = Arc::new(RateLimiter::default());
        let api_keys = Arc::new(ApiKeyAuthenticator::new(&config.auth, limiter.clone()));
        Self {
            store,
            config,
            limiter,
            status_cache: Arc::new(UserStatusCache::new()),
            api_keys,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `strata_core::migrate`, which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    strata_core::migrate::run(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required). Logout stays public: it only needs
    // the refresh token and must not reveal whether a session existed.
    let public = Router::new()
        .route("/api/auth/login", post(auth::login_handler))
        .route("/api/auth/register", post(auth::register_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .route("/api/auth/logout", post(auth::logout_handler));

    // Protected routes (JWT or API key).
    let protected = Router::new()
        .route("/api/me", get(me::me_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Admin routes: authenticated, admin role, and — for API-key callers —
    // the blanket `admin` permission.
    let admin = Router::new()
        .route("/api/admin/users/{id}/role", put(users::set_role_handler))
        .route(
            "/api/admin/users/{id}/status",
            put(users::set_status_handler),
        )
        .layer(axum::middleware::from_fn(
            |req: axum::extract::Request, next: axum::middleware::Next| {
                require_scopes(&["admin"], req, next)
            },
        ))
        .layer(axum::middleware::from_fn(require_admin))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .layer(cors)
        .with_state(state)
}
