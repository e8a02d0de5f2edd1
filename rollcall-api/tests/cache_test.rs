/// Integration tests for the cache-aside demonstration endpoints

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_demo_miss_then_hit() {
    let ctx = TestContext::new();
    ctx.signup("Ada Lovelace", "ada@x.com").await;

    let miss = ctx.get("/cache/", None).await;
    assert_eq!(miss.status, StatusCode::OK);
    assert_eq!(miss.body["cache_hit"], false);
    assert_eq!(miss.body["source"], "Fresh Computation");
    assert_eq!(miss.body["data"]["computation_result"], 499500);
    assert_eq!(miss.body["data"]["user_count"], 1);

    let hit = ctx.get("/cache", None).await;
    assert_eq!(hit.status, StatusCode::OK);
    assert_eq!(hit.body["cache_hit"], true);
    assert_eq!(hit.body["source"], "Redis Cache");
    assert_eq!(hit.body["cached_data"], miss.body["data"]);
}

#[tokio::test]
async fn test_demo_serves_any_value_stored_under_its_key() {
    let ctx = TestContext::new();

    let stored = ctx
        .post("/cache/", json!({ "key": "demo_data", "value": "hello" }), None)
        .await;
    assert_eq!(stored.status, StatusCode::CREATED);

    let hit = ctx.get("/cache/", None).await;
    assert_eq!(hit.status, StatusCode::OK);
    assert_eq!(hit.body["cache_hit"], true);
    assert_eq!(hit.body["cached_data"], "hello");
}

#[tokio::test]
async fn test_set_value_with_defaults() {
    let ctx = TestContext::new();

    let response = ctx.post("/cache/", json!({}), None).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["key"], "custom_data");
    assert_eq!(response.body["value"], "default_value");
    assert_eq!(response.body["timeout"], 300);

    let stored: Option<String> = ctx.cache.get("custom_data").await.unwrap();
    assert_eq!(stored.as_deref(), Some("default_value"));
}

#[tokio::test]
async fn test_set_value_trims_key_and_keeps_json() {
    let ctx = TestContext::new();

    let response = ctx
        .post(
            "/cache/",
            json!({ "key": "  mykey ", "value": { "n": [1, 2] }, "timeout": 60 }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["key"], "mykey");

    let stored: Option<serde_json::Value> = ctx.cache.get("mykey").await.unwrap();
    assert_eq!(stored, Some(json!({ "n": [1, 2] })));
    let ttl = ctx.cache.ttl("mykey").await.unwrap().unwrap();
    assert!(ttl <= Duration::from_secs(60));
}

#[tokio::test]
async fn test_set_value_rejects_bad_input() {
    let ctx = TestContext::new();

    let cases = [
        (json!({ "key": "" }), "Key must be a non-empty string"),
        (json!({ "key": 42 }), "Key must be a non-empty string"),
        (json!({ "timeout": 0 }), "Timeout must be a positive integer"),
        (json!({ "timeout": -5 }), "Timeout must be a positive integer"),
        (json!({ "timeout": "60" }), "Timeout must be a positive integer"),
        (json!({ "timeout": 1.5 }), "Timeout must be a positive integer"),
        (
            json!({ "timeout": 18446744073709551615u64 }),
            "Timeout must be at most 2592000 seconds",
        ),
        (
            json!({ "timeout": 2592001 }),
            "Timeout must be at most 2592000 seconds",
        ),
    ];

    for (body, message) in cases {
        let response = ctx.post("/cache/", body.clone(), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(response.body["error"], message, "{}", body);
    }

    let not_object = ctx.post("/cache/", json!([1, 2, 3]), None).await;
    assert_eq!(not_object.status, StatusCode::BAD_REQUEST);

    let longest = ctx.post("/cache/", json!({ "timeout": 2592000 }), None).await;
    assert_eq!(longest.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_stats_include_samples() {
    let ctx = TestContext::new();
    ctx.post("/cache/", json!({ "value": "hello" }), None).await;

    let response = ctx.get("/cache/stats", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["cache_stats"]["status"], "Connected");
    assert_eq!(response.body["cache_stats"]["cache_backend"], "memory");
    assert_eq!(response.body["sample_cached_data"]["custom_data"], "hello");
    assert!(response.body["sample_cached_data"]["demo_data"].is_null());
}

#[tokio::test]
async fn test_clear_removes_only_present_demo_keys() {
    let ctx = TestContext::new();
    ctx.get("/cache/", None).await;
    ctx.post("/cache/", json!({ "key": "unrelated", "value": 1 }), None)
        .await;

    let response = ctx.delete("/cache/clear").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["cleared_keys"], json!(["demo_data"]));
    assert_eq!(response.body["message"], "Cleared 1 cache keys");
    assert!(response.body.get("failed_keys").is_none());

    assert!(!ctx.cache.exists("demo_data").await.unwrap());
    assert!(ctx.cache.exists("unrelated").await.unwrap());

    let again = ctx.delete("/cache/clear").await;
    assert_eq!(again.body["cleared_keys"], json!([]));
}

#[tokio::test]
async fn test_health_and_status() {
    let ctx = TestContext::new();

    let health = ctx.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "healthy");
    assert_eq!(health.body["database"], "connected");
    assert_eq!(health.body["cache"], "connected");
    assert_eq!(health.headers.get("x-content-type-options").unwrap(), "nosniff");

    let status = ctx.get("/status", None).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(status.body["storage_backend"], "memory");
}
