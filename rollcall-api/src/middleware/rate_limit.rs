/// Fixed-window throttling for the auth endpoints
///
/// Each client address gets `AUTH_RATE_LIMIT_PER_MINUTE` requests per wall
/// clock minute. The window counter lives in the cache under
/// `rate_limit:auth:{client}:{minute}` and is bumped with the cache's atomic
/// increment, so concurrent requests from one client never undercount.
///
/// # Headers
///
/// - `X-RateLimit-Limit`: requests allowed per window
/// - `X-RateLimit-Remaining`: requests left in the current window
/// - `Retry-After`: seconds until the window resets (429 responses only)
///
/// If the cache is unreachable the request is let through and a warning is
/// logged.

use crate::app::AppState;
use crate::error::ApiError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::time::Duration;

/// Length of one throttling window
pub const WINDOW: Duration = Duration::from_secs(60);

/// Outcome of counting one request against its window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    pub limit: u32,
    pub count: i64,
    /// Seconds until the current window closes
    pub reset_after: u64,
}

impl WindowCount {
    pub fn allowed(&self) -> bool {
        self.count <= i64::from(self.limit)
    }

    pub fn remaining(&self) -> u32 {
        let left = i64::from(self.limit) - self.count;
        u32::try_from(left.max(0)).unwrap_or(0)
    }
}

/// Cache key for a client's window starting at `window_start` (Unix seconds)
pub fn window_key(client: &str, window_start: i64) -> String {
    format!("rate_limit:auth:{}:{}", client, window_start)
}

/// Client address used as the throttling identity
pub fn client_key(connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Throttles auth endpoints per client address
pub async fn auth_rate_limit(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let limit = state.config.auth.rate_limit_per_minute;
    let client = client_key(connect_info.as_ref());

    let window_secs = WINDOW.as_secs() as i64;
    let now = Utc::now().timestamp();
    let window_start = now - now.rem_euclid(window_secs);
    let reset_after = (window_start + window_secs - now).max(1) as u64;

    let count = match state
        .cache
        .increment_with_ttl(&window_key(&client, window_start), 1, WINDOW)
        .await
    {
        Ok(count) => WindowCount {
            limit,
            count,
            reset_after,
        },
        Err(e) => {
            tracing::warn!(error = %e, client = %client, "Rate limit check skipped");
            return Ok(next.run(request).await);
        }
    };

    if !count.allowed() {
        tracing::warn!(client = %client, count = count.count, limit, "Auth rate limit exceeded");
        return Err(ApiError::RateLimitExceeded {
            retry_after: count.reset_after,
            message: format!(
                "Too many requests. Try again in {} seconds",
                count.reset_after
            ),
        });
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("X-RateLimit-Limit", HeaderValue::from(count.limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(count.remaining()));

    Ok(response)
}
