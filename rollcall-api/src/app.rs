/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use rollcall_api::{app::{build_router, AppState}, config::Config};
/// use rollcall_shared::{cache::MemoryCacheStore, storage::memory::MemoryStorage};
/// use std::sync::Arc;
///
/// let config = Config::for_memory_backends("an-example-secret-of-at-least-32-chars");
/// let state = AppState::new(
///     Arc::new(MemoryStorage::new()),
///     Arc::new(MemoryCacheStore::new()),
///     config,
/// );
/// let app = build_router(state);
/// ```

use crate::{
    config::Config,
    middleware::{rate_limit, request_log, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use rollcall_shared::{
    auth::{middleware::session_auth_middleware, session::SessionRegistry},
    cache::{CacheHelper, CacheStore},
    storage::DynStorage,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Every field is a cheap handle; the state is cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// Accounts, profiles and request logs
    pub storage: DynStorage,

    /// Cache-aside helper over the configured cache store
    pub cache: CacheHelper,

    /// Session tokens and their cache-held records
    pub sessions: SessionRegistry,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(storage: DynStorage, store: Arc<dyn CacheStore>, config: Config) -> Self {
        let cache = CacheHelper::new(store, config.cache.default_ttl);
        let sessions = SessionRegistry::new(
            cache.clone(),
            config.auth.jwt_secret.as_str(),
            config.auth.session_ttl,
        );

        Self {
            storage,
            cache,
            sessions,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete router
///
/// ```text
/// /health, /status                 public
/// /auth/signin|signup|forgot-password     throttled
/// /auth/signout|change-password           throttled, session
/// /user/profile|students|parents|instructors|summary   session
/// /cache/, /cache/stats, /cache/clear     public
/// ```
///
/// Layers, outermost first: security headers, CORS, tracing, request log.
pub fn build_router(state: AppState) -> Router {
    let require_session = from_fn_with_state(state.sessions.clone(), session_auth_middleware);

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/status", get(routes::health::status))
        .route(
            "/cache",
            get(routes::cache::cache_demo).post(routes::cache::set_cache_value),
        )
        .route(
            "/cache/",
            get(routes::cache::cache_demo).post(routes::cache::set_cache_value),
        )
        .route("/cache/stats", get(routes::cache::cache_stats))
        .route("/cache/clear", delete(routes::cache::clear_cache));

    let session_auth_routes = Router::new()
        .route("/auth/signout", post(routes::auth::signout))
        .route("/auth/change-password", post(routes::auth::change_password))
        .layer(require_session.clone());

    let auth_routes = Router::new()
        .route("/auth/signin", post(routes::auth::signin))
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/forgot-password", post(routes::auth::forgot_password))
        .merge(session_auth_routes)
        .layer(from_fn_with_state(state.clone(), rate_limit::auth_rate_limit));

    let user_routes = Router::new()
        .route(
            "/user/profile",
            get(routes::users::get_profile).put(routes::users::update_profile),
        )
        .route("/user/students", get(routes::users::list_students))
        .route("/user/parents", get(routes::users::list_parents))
        .route("/user/instructors", get(routes::users::list_instructors))
        .route("/user/summary", get(routes::users::summary))
        .layer(require_session);

    Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .merge(user_routes)
        .layer(from_fn_with_state(state.clone(), request_log::record_request))
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
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
