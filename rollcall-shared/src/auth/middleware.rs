/// Session authentication for Axum
///
/// [`session_auth_middleware`] reads `Authorization: Bearer <token>`, resolves
/// it through the [`SessionRegistry`] and stores an [`AuthContext`] in the
/// request extensions. Handlers take `AuthContext` as an extractor.
///
/// The context is copied onto the response extensions too, so outer layers
/// (request logging) can see who made the request.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use rollcall_shared::auth::middleware::{session_auth_middleware, AuthContext};
/// use rollcall_shared::auth::session::SessionRegistry;
///
/// async fn whoami(auth: AuthContext) -> String {
///     auth.account_id.to_string()
/// }
///
/// fn router(sessions: SessionRegistry) -> Router {
///     Router::new()
///         .route("/whoami", get(whoami))
///         .layer(middleware::from_fn_with_state(sessions, session_auth_middleware))
/// }
/// ```

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::session::SessionRegistry;

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub account_id: Uuid,
    pub session_id: Uuid,
}

/// Authentication failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error("{0}")]
    InvalidToken(String),

    /// Token verified but its session was closed or expired
    #[error("Session has ended")]
    SessionEnded,

    /// Session store could not be queried
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AuthError::MissingCredentials => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthError::InvalidFormat(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AuthError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "invalid_token"),
            AuthError::SessionEnded => (StatusCode::UNAUTHORIZED, "session_ended"),
            AuthError::Unavailable(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AuthError::Unavailable(detail) => {
                tracing::error!(detail = %detail, "Session lookup failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut response = (status, Json(json!({ "error": message, "code": code }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Requires a live session for every request passing through
pub async fn session_auth_middleware(
    State(sessions): State<SessionRegistry>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(req.headers())?;
    let auth = sessions.authenticate(token).await?;

    req.extensions_mut().insert(auth);
    let mut response = next.run(req).await;
    response.extensions_mut().insert(auth);

    Ok(response)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}
