/// Middleware for the API server
///
/// - `security`: security response headers
/// - `rate_limit`: fixed-window throttling of the auth endpoints
/// - `request_log`: per-request audit records

pub mod rate_limit;
pub mod request_log;
pub mod security;
