/// Request extractors
///
/// `ApiJson` behaves like `axum::Json` but rejects with [`ApiError`], so a
/// malformed body produces the usual `{error, code}` envelope.

use crate::error::ApiError;
use axum::extract::FromRequest;

#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Returns the trimmed value of a required string field
///
/// Missing, null and blank values are all rejected.
pub fn required(field: &'static str, value: Option<String>) -> Result<String, ApiError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::invalid_field(field, format!("{} is required", field))),
    }
}
