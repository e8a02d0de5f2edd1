/// Integration tests for the authentication endpoints

mod common;

use axum::http::StatusCode;
use common::{TestContext, TEST_PASSWORD};
use rollcall_api::config::Config;
use serde_json::json;

#[tokio::test]
async fn test_signup_derives_username_from_email() {
    let ctx = TestContext::new();

    let body = ctx.signup("Ada Lovelace", "ada@x.com").await;

    assert_eq!(body["user"]["username"], "ada");
    assert_eq!(body["user"]["email"], "ada@x.com");
    assert_eq!(body["user"]["first_name"], "Ada");
    assert_eq!(body["user"]["last_name"], "Lovelace");
    assert!(body["message"].is_string());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_signup_duplicate_email_rejected() {
    let ctx = TestContext::new();
    ctx.signup("Ada Lovelace", "ada@x.com").await;

    let response = ctx
        .post(
            "/auth/signup",
            json!({ "name": "Ada Lovelace", "email": "ADA@x.com", "password": "p" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.body["error"].is_string());
    assert_eq!(ctx.storage.count_accounts().await.unwrap(), 1);
}

#[tokio::test]
async fn test_signup_username_collisions_take_smallest_suffix() {
    let ctx = TestContext::new();

    let first = ctx.signup("Ada One", "ada@x.com").await;
    let second = ctx.signup("Ada Two", "ada@y.com").await;
    let third = ctx.signup("Ada Three", "ada@z.com").await;

    assert_eq!(first["user"]["username"], "ada");
    assert_eq!(second["user"]["username"], "ada1");
    assert_eq!(third["user"]["username"], "ada2");
}

#[tokio::test]
async fn test_signup_requires_fields() {
    let ctx = TestContext::new();

    for body in [
        json!({ "email": "a@x.com", "password": "p" }),
        json!({ "name": "  ", "email": "a@x.com", "password": "p" }),
        json!({ "name": "A", "password": "p" }),
        json!({ "name": "A", "email": "a@x.com" }),
        json!({ "name": "A", "email": "a@x.com", "password": "   " }),
    ] {
        let response = ctx.post("/auth/signup", body.clone(), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(response.body["code"], "validation_error");
    }
}

#[tokio::test]
async fn test_signup_rejects_malformed_email() {
    let ctx = TestContext::new();

    let response = ctx
        .post(
            "/auth/signup",
            json!({ "name": "A", "email": "not-an-email", "password": "p" }),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();

    let response = ctx
        .request(
            axum::http::Method::POST,
            "/auth/signin",
            Some(json!("just a string")),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["code"], "bad_request");
}

#[tokio::test]
async fn test_signin_with_username_or_email() {
    let ctx = TestContext::new();
    ctx.signup("Ada Lovelace", "ada@x.com").await;

    let by_username = ctx
        .post(
            "/auth/signin",
            json!({ "username": "ada", "password": TEST_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(by_username.status, StatusCode::OK);
    assert!(by_username.body["token"].is_string());
    assert_eq!(by_username.body["user"]["username"], "ada");

    // An email in the username field resolves too
    let email_as_username = ctx
        .post(
            "/auth/signin",
            json!({ "username": "ada@x.com", "password": TEST_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(email_as_username.status, StatusCode::OK);

    let by_email = ctx
        .post(
            "/auth/signin",
            json!({ "email": "ada@x.com", "password": TEST_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(by_email.status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_whitespace_is_significant() {
    let ctx = TestContext::new();
    let created = ctx
        .post(
            "/auth/signup",
            json!({ "name": "Ada Lovelace", "email": "ada@x.com", "password": "  secret  " }),
            None,
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    let padded = ctx
        .post(
            "/auth/signin",
            json!({ "username": "ada", "password": "  secret  " }),
            None,
        )
        .await;
    assert_eq!(padded.status, StatusCode::OK);
    assert!(padded.body["token"].is_string());

    let trimmed = ctx
        .post(
            "/auth/signin",
            json!({ "username": "ada", "password": "secret" }),
            None,
        )
        .await;
    assert_eq!(trimmed.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signin_failures_are_indistinguishable() {
    let ctx = TestContext::new();
    ctx.signup("Ada Lovelace", "ada@x.com").await;

    let wrong_password = ctx
        .post(
            "/auth/signin",
            json!({ "username": "ada", "password": "nope" }),
            None,
        )
        .await;
    let unknown_user = ctx
        .post(
            "/auth/signin",
            json!({ "username": "grace", "password": "nope" }),
            None,
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(wrong_password.body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_signin_records_last_login() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("Ada Lovelace", "ada@x.com").await;

    let profile = ctx.get("/user/profile", Some(&token)).await;

    assert_eq!(profile.status, StatusCode::OK);
    assert!(profile.body["last_login_at"].is_string());
    assert!(profile.body["last_signin"]["session_id"].is_string());
}

#[tokio::test]
async fn test_signout_revokes_token() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("Ada Lovelace", "ada@x.com").await;

    assert_eq!(
        ctx.get("/user/profile", Some(&token)).await.status,
        StatusCode::OK
    );

    let signout = ctx.post("/auth/signout", json!({}), Some(&token)).await;
    assert_eq!(signout.status, StatusCode::OK);
    assert!(signout.body["message"].is_string());

    let after = ctx.get("/user/profile", Some(&token)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(after.body["code"], "session_ended");
}

#[tokio::test]
async fn test_signout_requires_session() {
    let ctx = TestContext::new();

    let response = ctx.post("/auth/signout", json!({}), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.headers.get("www-authenticate").is_some());

    let garbage = ctx.post("/auth/signout", json!({}), Some("not-a-jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let ctx = TestContext::new();
    ctx.signup("Ada Lovelace", "ada@x.com").await;
    let laptop = ctx.signin("ada").await;
    let phone = ctx.signin("ada").await;

    ctx.post("/auth/signout", json!({}), Some(&laptop)).await;

    assert_eq!(
        ctx.get("/user/profile", Some(&laptop)).await.status,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        ctx.get("/user/profile", Some(&phone)).await.status,
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_change_password_with_wrong_current_keeps_hash() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("Ada Lovelace", "ada@x.com").await;
    let before = ctx
        .storage
        .find_account_by_username("ada")
        .await
        .unwrap()
        .unwrap()
        .password_hash;

    let response = ctx
        .post(
            "/auth/change-password",
            json!({ "current_password": "wrong", "new_password": "new secret" }),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let after = ctx
        .storage
        .find_account_by_username("ada")
        .await
        .unwrap()
        .unwrap()
        .password_hash;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_change_password_then_signin_with_new_password() {
    let ctx = TestContext::new();
    let token = ctx.signed_in("Ada Lovelace", "ada@x.com").await;

    let empty = ctx
        .post(
            "/auth/change-password",
            json!({ "current_password": TEST_PASSWORD, "new_password": "" }),
            Some(&token),
        )
        .await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let changed = ctx
        .post(
            "/auth/change-password",
            json!({ "current_password": TEST_PASSWORD, "new_password": "analytical engine" }),
            Some(&token),
        )
        .await;
    assert_eq!(changed.status, StatusCode::OK);

    let old = ctx
        .post(
            "/auth/signin",
            json!({ "username": "ada", "password": TEST_PASSWORD }),
            None,
        )
        .await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);

    let new = ctx
        .post(
            "/auth/signin",
            json!({ "username": "ada", "password": "analytical engine" }),
            None,
        )
        .await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_does_not_reveal_accounts() {
    let ctx = TestContext::new();
    ctx.signup("Ada Lovelace", "ada@x.com").await;

    let known = ctx
        .post("/auth/forgot-password", json!({ "email": "ada@x.com" }), None)
        .await;
    let unknown = ctx
        .post("/auth/forgot-password", json!({ "email": "who@x.com" }), None)
        .await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(known.body, unknown.body);

    let missing = ctx.post("/auth/forgot-password", json!({}), None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let mut config = Config::for_memory_backends(common::TEST_JWT_SECRET);
    config.auth.rate_limit_per_minute = 2;
    let ctx = TestContext::with_config(config);

    let body = json!({ "email": "who@x.com" });
    let first = ctx.post("/auth/forgot-password", body.clone(), None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.headers.get("x-ratelimit-limit").unwrap(), "2");
    assert_eq!(first.headers.get("x-ratelimit-remaining").unwrap(), "1");

    ctx.post("/auth/forgot-password", body.clone(), None).await;
    let throttled = ctx.post("/auth/forgot-password", body, None).await;

    // A window boundary between requests resets the counter
    if throttled.status != StatusCode::OK {
        assert_eq!(throttled.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(throttled.body["code"], "rate_limit_exceeded");
        assert!(throttled.headers.get("retry-after").is_some());
    }

    // Routes outside /auth are not throttled
    assert_eq!(ctx.get("/status", None).await.status, StatusCode::OK);
}
