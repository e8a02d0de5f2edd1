/// Cache-aside demonstration endpoints
///
/// # Endpoints
///
/// - `GET /cache/` - serve `demo_data` from the cache, computing it on a miss
/// - `POST /cache/` - store `{key, value, timeout}`
/// - `GET /cache/stats` - backend statistics and sample keys
/// - `DELETE /cache/clear` - remove the demo keys
///
/// None of these require a session.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use rollcall_shared::cache::{CacheStats, MAX_TTL};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const DEMO_KEY: &str = "demo_data";
const CUSTOM_KEY: &str = "custom_data";
const DEFAULT_VALUE: &str = "default_value";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Keys removed by `DELETE /cache/clear`
pub const DEMO_KEYS: [&str; 3] = [DEMO_KEY, CUSTOM_KEY, "teacher_demo"];

/// The "expensive" payload cached by the demo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoData {
    pub timestamp: String,
    pub message: String,
    pub computation_result: u64,
    pub user_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CacheDemoResponse {
    pub message: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<DemoData>,
    pub cache_hit: bool,
}

#[derive(Debug, Serialize)]
pub struct SetValueResponse {
    pub message: String,
    pub key: String,
    pub value: Value,
    pub timeout: u64,
}

#[derive(Debug, Serialize)]
pub struct SampleCachedData {
    pub demo_data: Option<Value>,
    pub custom_data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub message: String,
    pub cache_stats: CacheStats,
    pub sample_cached_data: SampleCachedData,
}

#[derive(Debug, Serialize)]
pub struct ClearCacheResponse {
    pub message: String,
    pub cleared_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Cache-aside read of `demo_data`
///
/// A hit is returned as stored, whatever JSON `POST /cache/` wrote there.
pub async fn cache_demo(State(state): State<AppState>) -> ApiResult<Json<CacheDemoResponse>> {
    if let Some(cached) = state.cache.get::<Value>(DEMO_KEY).await? {
        return Ok(Json(CacheDemoResponse {
            message: "Data retrieved from cache".to_string(),
            source: "Redis Cache".to_string(),
            cached_data: Some(cached),
            data: None,
            cache_hit: true,
        }));
    }

    let data = DemoData {
        timestamp: Utc::now().to_rfc3339(),
        message: "This is expensive data that should be cached".to_string(),
        computation_result: (0..1000u64).sum(),
        user_count: state.storage.count_accounts().await?,
    };
    state
        .cache
        .set(
            DEMO_KEY,
            &data,
            Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        )
        .await?;

    Ok(Json(CacheDemoResponse {
        message: "Data computed and stored in cache".to_string(),
        source: "Fresh Computation".to_string(),
        cached_data: None,
        data: Some(data),
        cache_hit: false,
    }))
}

/// Stores an arbitrary JSON value
///
/// ```text
/// POST /cache/
/// { "key": "mykey", "value": {"any": "json"}, "timeout": 60 }
/// ```
///
/// `key` defaults to `custom_data`, `value` to `"default_value"` and
/// `timeout` (seconds) to 300. `timeout` is capped at 30 days.
pub async fn set_cache_value(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<Value>,
) -> ApiResult<(StatusCode, Json<SetValueResponse>)> {
    let body = body
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Request body must be a JSON object".to_string()))?;

    let key = match body.get("key") {
        None => CUSTOM_KEY.to_string(),
        Some(Value::String(k)) if !k.trim().is_empty() => k.trim().to_string(),
        Some(_) => {
            return Err(ApiError::invalid_field(
                "key",
                "Key must be a non-empty string",
            ))
        }
    };

    let value = body
        .get("value")
        .cloned()
        .unwrap_or_else(|| Value::String(DEFAULT_VALUE.to_string()));

    let timeout = match body.get("timeout") {
        None => DEFAULT_TIMEOUT_SECS,
        Some(t) => t.as_u64().filter(|t| *t > 0).ok_or_else(|| {
            ApiError::invalid_field("timeout", "Timeout must be a positive integer")
        })?,
    };
    if timeout > MAX_TTL.as_secs() {
        return Err(ApiError::invalid_field(
            "timeout",
            format!("Timeout must be at most {} seconds", MAX_TTL.as_secs()),
        ));
    }

    state
        .cache
        .set(&key, &value, Some(Duration::from_secs(timeout)))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SetValueResponse {
            message: format!("Data stored in cache with key: {}", key),
            key,
            value,
            timeout,
        }),
    ))
}

pub async fn cache_stats(State(state): State<AppState>) -> ApiResult<Json<CacheStatsResponse>> {
    let stats = state.cache.stats().await;
    if !stats.is_connected() {
        return Err(ApiError::InternalError(format!(
            "Cache backend {} is unreachable",
            stats.cache_backend
        )));
    }

    let sample_cached_data = SampleCachedData {
        demo_data: state.cache.get(DEMO_KEY).await?,
        custom_data: state.cache.get(CUSTOM_KEY).await?,
    };

    Ok(Json(CacheStatsResponse {
        message: "Cache statistics".to_string(),
        cache_stats: stats,
        sample_cached_data,
    }))
}

/// Removes the demo keys
///
/// Keys that were absent are skipped. Keys that fail to delete are reported
/// in `failed_keys` and do not fail the request.
pub async fn clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let mut cleared_keys = Vec::new();
    let mut failed_keys = Vec::new();

    for key in DEMO_KEYS {
        match state.cache.delete(key).await {
            Ok(true) => cleared_keys.push(key.to_string()),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, key, "Failed to clear cache key");
                failed_keys.push(format!("{} (Error: {})", key, e));
            }
        }
    }

    let warning = (!failed_keys.is_empty())
        .then(|| format!("Failed to clear {} keys", failed_keys.len()));

    Json(ClearCacheResponse {
        message: format!("Cleared {} cache keys", cleared_keys.len()),
        cleared_keys,
        failed_keys,
        warning,
    })
}
