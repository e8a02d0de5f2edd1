//! # Rollcall API Server
//!
//! Serves account sign-in and sign-up, role profiles and the cache-aside
//! demo over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=... cargo run -p rollcall-api
//! ```
//!
//! `STORAGE_BACKEND=memory CACHE_BACKEND=memory` runs without PostgreSQL or
//! Redis.

use rollcall_api::{
    app::{build_router, AppState},
    config::{CacheBackend, Config, StorageBackend},
};
use rollcall_shared::{
    cache::{CacheStore, MemoryCacheStore, RedisCacheStore},
    db::{migrations::run_migrations, pool::create_pool},
    redis::RedisClient,
    storage::{memory::MemoryStorage, postgres::PgStorage, DynStorage},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Rollcall API v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let storage: DynStorage = match config.storage {
        StorageBackend::Postgres => {
            let pool = create_pool(config.database.clone()).await?;
            run_migrations(&pool).await?;
            Arc::new(PgStorage::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStorage::new())
        }
    };

    let store: Arc<dyn CacheStore> = match config.cache.backend {
        CacheBackend::Redis => {
            let client = RedisClient::new(config.redis.clone()).await?;
            Arc::new(RedisCacheStore::new(client))
        }
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new()),
    };

    tracing::info!(
        storage = storage.backend_name(),
        cache = store.backend_name(),
        "Backends ready"
    );

    let addr = config.bind_address();
    let app = build_router(AppState::new(storage, store, config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}
