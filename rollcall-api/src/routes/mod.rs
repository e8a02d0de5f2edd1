/// API route handlers
///
/// - `health`: liveness and version
/// - `auth`: sign-in, sign-up, sign-out and password management
/// - `users`: profiles, role listings and the cached summary
/// - `cache`: cache-aside demonstration

pub mod auth;
pub mod cache;
pub mod health;
pub mod users;
