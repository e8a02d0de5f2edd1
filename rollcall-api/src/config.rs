/// Configuration management for the API server
///
/// All settings come from environment variables; a `.env` file is loaded
/// first when present.
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:8080)
/// - `API_PRODUCTION`: enables HSTS (default: false)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: `*`)
/// - `STORAGE_BACKEND`: `postgres` or `memory` (default: postgres)
/// - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`: PostgreSQL pool
/// - `CACHE_BACKEND`: `redis` or `memory` (default: redis)
/// - `REDIS_URL`: Redis connection string
/// - `CACHE_DEFAULT_TTL_SECS`: default cache TTL, at most 30 days (default: 300)
/// - `JWT_SECRET`: token signing key, at least 32 characters (required)
/// - `SESSION_TTL_SECS`: session lifetime, at most 30 days (default: 86400)
/// - `AUTH_RATE_LIMIT_PER_MINUTE`: auth requests per client per minute (default: 30)
/// - `REQUEST_LOG_ENABLED`: write request audit records (default: true)
///
/// # Example
///
/// ```no_run
/// use rollcall_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use rollcall_shared::cache::MAX_TTL;
use rollcall_shared::db::pool::DatabaseConfig;
use rollcall_shared::redis::RedisConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageBackend,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub request_log_enabled: bool,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    /// Enables HSTS
    pub production: bool,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Where accounts and profiles are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("Unknown STORAGE_BACKEND: {}", other),
        }
    }
}

/// Which store backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => anyhow::bail!("Unknown CACHE_BACKEND: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub default_ttl: Duration,
}

/// Session and throttling configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token signing key; kept out of `Debug` output
    pub jwt_secret: String,
    pub session_ttl: Duration,
    /// Auth requests allowed per client address per minute
    pub rate_limit_per_minute: u32,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .field("session_ttl", &self.session_ttl)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .finish()
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or too short, a TTL is
    /// out of range, or any variable holds an unparseable value.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let api = ApiConfig {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("API_PORT", 8080)?,
            production: parse_var("API_PRODUCTION", false)?,
            cors_origins,
        };

        let storage: StorageBackend = parse_var("STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database = DatabaseConfig::from_env().map_err(anyhow::Error::msg)?;
        if storage == StorageBackend::Postgres && env::var("DATABASE_URL").is_err() {
            anyhow::bail!("DATABASE_URL environment variable is required for the postgres backend");
        }

        let cache = CacheConfig {
            backend: parse_var("CACHE_BACKEND", CacheBackend::Redis)?,
            default_ttl: Duration::from_secs(parse_var("CACHE_DEFAULT_TTL_SECS", 300u64)?),
        };
        let redis = RedisConfig::from_env()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        let auth = AuthConfig {
            jwt_secret,
            session_ttl: Duration::from_secs(parse_var("SESSION_TTL_SECS", 86_400u64)?),
            rate_limit_per_minute: parse_var("AUTH_RATE_LIMIT_PER_MINUTE", 30u32)?,
        };

        let config = Self {
            api,
            storage,
            database,
            cache,
            redis,
            auth,
            request_log_enabled: parse_var("REQUEST_LOG_ENABLED", true)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks values that parse but cannot be served
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_JWT_SECRET_LEN);
        }
        if self.auth.session_ttl.is_zero() || self.auth.session_ttl > MAX_TTL {
            anyhow::bail!("SESSION_TTL_SECS must be between 1 and {}", MAX_TTL.as_secs());
        }
        if self.cache.default_ttl.is_zero() || self.cache.default_ttl > MAX_TTL {
            anyhow::bail!(
                "CACHE_DEFAULT_TTL_SECS must be between 1 and {}",
                MAX_TTL.as_secs()
            );
        }
        Ok(())
    }

    /// Configuration for in-process backends, used by tests and demos
    pub fn for_memory_backends(jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                production: false,
                cors_origins: vec!["*".to_string()],
            },
            storage: StorageBackend::Memory,
            database: DatabaseConfig::default(),
            cache: CacheConfig {
                backend: CacheBackend::Memory,
                default_ttl: Duration::from_secs(300),
            },
            redis: RedisConfig::default(),
            auth: AuthConfig {
                jwt_secret: jwt_secret.into(),
                session_ttl: Duration::from_secs(86_400),
                rate_limit_per_minute: 30,
            },
            request_log_enabled: true,
        }
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let mut config = Config::for_memory_backends("test-secret-key-at-least-32-bytes-long");
        config.api.port = 8080;
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("Memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("postgresql".parse::<StorageBackend>().unwrap(), StorageBackend::Postgres);
        assert_eq!("redis".parse::<CacheBackend>().unwrap(), CacheBackend::Redis);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let config = Config::for_memory_backends("super-secret-value-that-is-long-enough");
        let debug = format!("{:?}", config.auth);
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let secret = "test-secret-key-at-least-32-bytes-long";
        assert!(Config::for_memory_backends(secret).validate().is_ok());

        let mut zero_session = Config::for_memory_backends(secret);
        zero_session.auth.session_ttl = Duration::ZERO;
        let err = zero_session.validate().unwrap_err();
        assert!(err.to_string().contains("SESSION_TTL_SECS"));

        let mut long_cache = Config::for_memory_backends(secret);
        long_cache.cache.default_ttl = MAX_TTL + Duration::from_secs(1);
        assert!(long_cache.validate().is_err());

        assert!(Config::for_memory_backends("short").validate().is_err());
    }
}
