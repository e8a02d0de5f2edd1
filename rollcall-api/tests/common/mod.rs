//! Common test utilities for integration tests
//!
//! Builds the full router over in-memory storage and cache so the tests run
//! without PostgreSQL or Redis, and drives it with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use rollcall_api::app::{build_router, AppState};
use rollcall_api::config::Config;
use rollcall_shared::cache::{CacheHelper, MemoryCacheStore};
use rollcall_shared::storage::{DynStorage, MemoryStorage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Response status, headers and parsed JSON body (`Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

pub struct TestContext {
    pub app: Router,
    pub storage: DynStorage,
    pub cache: CacheHelper,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(Config::for_memory_backends(TEST_JWT_SECRET))
    }

    pub fn with_config(config: Config) -> Self {
        let storage: DynStorage = Arc::new(MemoryStorage::new());
        let state = AppState::new(storage.clone(), Arc::new(MemoryCacheStore::new()), config);
        let cache = state.cache.clone();

        Self {
            app: build_router(state),
            storage,
            cache,
        }
    }

    /// Sends one request; `token` becomes a bearer credential
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, token).await
    }

    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), token).await
    }

    pub async fn put(&self, uri: &str, body: Value, token: &str) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), Some(token)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None, None).await
    }

    /// Signs up `name <email>` with [`TEST_PASSWORD`] and asserts 201
    pub async fn signup(&self, name: &str, email: &str) -> Value {
        let response = self
            .post(
                "/auth/signup",
                json!({ "name": name, "email": email, "password": TEST_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }

    /// Signs in with [`TEST_PASSWORD`] and returns the bearer token
    pub async fn signin(&self, username: &str) -> String {
        let response = self
            .post(
                "/auth/signin",
                json!({ "username": username, "password": TEST_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["token"].as_str().unwrap().to_string()
    }

    /// Signs up and signs in, returning the token
    pub async fn signed_in(&self, name: &str, email: &str) -> String {
        let user = self.signup(name, email).await;
        self.signin(user["user"]["username"].as_str().unwrap()).await
    }
}
