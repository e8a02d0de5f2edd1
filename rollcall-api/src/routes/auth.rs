/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /auth/signin` - exchange username or email plus password for a session token
/// - `POST /auth/signup` - create an account and its default profile
/// - `POST /auth/signout` - end the current session
/// - `POST /auth/change-password` - replace the password of the signed-in account
/// - `POST /auth/forgot-password` - request a reset (always acknowledged)
///
/// All of them sit behind the per-client auth rate limit.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{required, ApiJson},
};
use axum::{extract::State, http::StatusCode, Json};
use rollcall_shared::{
    auth::{middleware::AuthContext, password::blocking},
    models::account::{
        split_full_name, username_base, username_candidate, Account, AccountSummary, NewAccount,
    },
    storage::StorageError,
};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

/// Upper bound on username suffixes tried before giving up
const MAX_USERNAME_ATTEMPTS: u32 = 1000;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Sign-in request; either `username` or `email` identifies the account
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SigninRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SigninResponse {
    pub message: String,
    pub user: AccountSummary,
    pub token: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub message: String,
    pub user: AccountSummary,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

/// Plain `{message}` body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Resolves the identity as a username first, then as an email
async fn find_by_identity(state: &AppState, identity: &str) -> ApiResult<Option<Account>> {
    if let Some(account) = state.storage.find_account_by_username(identity).await? {
        return Ok(Some(account));
    }
    Ok(state.storage.find_account_by_email(identity).await?)
}

/// Sign in
///
/// ```text
/// POST /auth/signin
/// { "username": "ada", "password": "..." }
/// ```
///
/// The identity may also be sent as `email`. Unknown identities and wrong
/// passwords both answer 401 `Invalid credentials`.
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SigninRequest>,
) -> ApiResult<Json<SigninResponse>> {
    let identity = req.username.filter(|u| !u.trim().is_empty()).or(req.email);
    let identity = required("username", identity)?;
    let password = match req.password {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ApiError::invalid_field("password", "password is required")),
    };

    let account = match find_by_identity(&state, &identity).await? {
        Some(account) => account,
        None => {
            tracing::info!(identity = %identity, "Sign-in for unknown identity");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    if !blocking::verify_password(password, account.password_hash.clone()).await? {
        tracing::info!(account_id = %account.id, "Sign-in with wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let session = state.sessions.open(account.id).await?;
    state.storage.update_last_login(account.id).await?;

    tracing::info!(account_id = %account.id, session_id = %session.session_id, "Signed in");

    Ok(Json(SigninResponse {
        message: "Signed in successfully".to_string(),
        user: account.summary(),
        token: session.token,
        expires_at: session.expires_at,
    }))
}

/// Sign up
///
/// ```text
/// POST /auth/signup
/// { "name": "Ada Lovelace", "email": "ada@x.com", "password": "..." }
/// ```
///
/// Responds 201 with the new account. The username is the email local part,
/// suffixed with the smallest free positive integer when taken.
///
/// # Errors
///
/// - `400`: missing field, malformed email or email already registered
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    let name = required("name", req.name)?;
    let email = required("email", req.email)?;
    // Passwords are never trimmed
    let password = match req.password {
        Some(p) if !p.trim().is_empty() => p,
        _ => return Err(ApiError::invalid_field("password", "password is required")),
    };

    if !email.validate_email() {
        return Err(ApiError::invalid_field("email", "Invalid email format"));
    }

    if state.storage.find_account_by_email(&email).await?.is_some() {
        return Err(ApiError::invalid_field(
            "email",
            "An account with this email already exists",
        ));
    }

    let (first_name, last_name) = split_full_name(&name);
    let password_hash = blocking::hash_password(password).await?;
    let base = username_base(&email).to_string();

    let mut account = None;
    for n in 0..MAX_USERNAME_ATTEMPTS {
        let username = username_candidate(&base, n);
        if state.storage.username_exists(&username).await? {
            continue;
        }

        let result = state
            .storage
            .create_account(NewAccount {
                username,
                email: email.clone(),
                password_hash: password_hash.clone(),
                first_name: first_name.clone(),
                last_name: last_name.clone(),
            })
            .await;

        match result {
            Ok(created) => {
                account = Some(created);
                break;
            }
            // Lost a race for this username; try the next suffix
            Err(StorageError::Duplicate("username")) => continue,
            Err(StorageError::Duplicate("email")) => {
                return Err(ApiError::invalid_field(
                    "email",
                    "An account with this email already exists",
                ));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let account = account.ok_or_else(|| {
        ApiError::InternalError(format!("No free username for stem {}", base))
    })?;
    state.storage.get_or_create_profile(account.id).await?;
    super::users::invalidate_summary(&state).await;

    tracing::info!(account_id = %account.id, username = %account.username, "Account created");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "Account created successfully".to_string(),
            user: account.summary(),
        }),
    ))
}

/// Sign out; the session token stops working immediately
pub async fn signout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<MessageResponse>> {
    state.sessions.close(auth.session_id).await?;
    tracing::info!(account_id = %auth.account_id, session_id = %auth.session_id, "Signed out");

    Ok(MessageResponse::new("Signed out successfully"))
}

/// Change the signed-in account's password
///
/// # Errors
///
/// - `400`: current password wrong, or new password empty
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthContext,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let current = req.current_password.unwrap_or_default();
    let new_password = match req.new_password {
        Some(p) if !p.trim().is_empty() => p,
        _ => {
            return Err(ApiError::invalid_field(
                "new_password",
                "new_password is required",
            ))
        }
    };

    let account = state
        .storage
        .find_account_by_id(auth.account_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    if !blocking::verify_password(current, account.password_hash).await? {
        return Err(ApiError::invalid_field(
            "current_password",
            "Current password is incorrect",
        ));
    }

    let hash = blocking::hash_password(new_password).await?;
    state.storage.update_password(account.id, &hash).await?;

    tracing::info!(account_id = %account.id, "Password changed");

    Ok(MessageResponse::new("Password changed successfully"))
}

/// Request a password reset
///
/// The answer is the same whether or not the address is registered.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let email = required("email", req.email)?;

    match state.storage.find_account_by_email(&email).await? {
        Some(account) => {
            tracing::info!(account_id = %account.id, "Password reset requested")
        }
        None => tracing::debug!("Password reset requested for unknown email"),
    }

    Ok(MessageResponse::new(
        "If an account exists for this email, password reset instructions have been sent",
    ))
}
