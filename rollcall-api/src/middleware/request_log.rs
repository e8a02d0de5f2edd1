/// Request audit logging
///
/// Appends one `RequestLog` record per request after the response is built.
/// The authenticated account is read from the response extensions, where the
/// session middleware leaves its `AuthContext`. A failed write is logged and
/// never affects the response.

use crate::app::AppState;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use rollcall_shared::{auth::middleware::AuthContext, models::request_log::NewRequestLog};
use std::net::SocketAddr;
use std::time::Instant;

const MAX_ENDPOINT_LEN: usize = 200;

pub async fn record_request(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.request_log_enabled {
        return next.run(request).await;
    }

    let started = Instant::now();
    let method = request.method().to_string();
    let endpoint: String = request.uri().path().chars().take(MAX_ENDPOINT_LEN).collect();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let response = next.run(request).await;

    let record = NewRequestLog {
        endpoint,
        method,
        status_code: i32::from(response.status().as_u16()),
        latency_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
        account_id: response
            .extensions()
            .get::<AuthContext>()
            .map(|auth| auth.account_id),
        client_addr: connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()),
        user_agent,
    };

    if let Err(e) = state.storage.append_request_log(record).await {
        tracing::warn!(error = %e, "Failed to write request log");
    }

    response
}
