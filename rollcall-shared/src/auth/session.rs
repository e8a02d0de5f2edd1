//! Server-side session registry
//!
//! A signed-in client holds a JWT whose `sid` claim names an entry
//! `session:{sid}` in the cache store. Signing out deletes the entry, which
//! revokes the token even though its signature and expiry are still valid.
//! One account may hold several sessions at once (one per device).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::jwt::{create_token, validate_token, Claims, JwtError};
use super::middleware::{AuthContext, AuthError};
use crate::cache::{CacheError, CacheHelper};

/// Value stored under `session:{sid}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub account_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Latest sign-in, written with `set_user_session_data`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSessionData {
    pub session_id: Uuid,
    pub signed_in_at: DateTime<Utc>,
}

/// A freshly opened session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session_id: Uuid,
    /// Bearer token for the client
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Opens, resolves and closes sessions
#[derive(Clone)]
pub struct SessionRegistry {
    cache: CacheHelper,
    secret: Arc<str>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(cache: CacheHelper, secret: impl Into<Arc<str>>, ttl: Duration) -> Self {
        Self {
            cache,
            secret: secret.into(),
            ttl,
        }
    }

    pub fn session_key(session_id: Uuid) -> String {
        format!("session:{}", session_id)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Records a new session for `account_id` and signs its token
    pub async fn open(&self, account_id: Uuid) -> Result<IssuedSession, SessionError> {
        let session_id = Uuid::new_v4();
        let lifetime = chrono::Duration::from_std(self.ttl)
            .unwrap_or_else(|_| chrono::Duration::seconds(86_400));

        let claims = Claims::new(account_id, session_id, lifetime);
        let token = create_token(&claims, &self.secret)?;

        let created_at = Utc::now();
        let record = SessionRecord {
            account_id,
            created_at,
            expires_at: created_at + lifetime,
        };
        self.cache
            .set(&Self::session_key(session_id), &record, Some(self.ttl))
            .await?;

        let latest = UserSessionData {
            session_id,
            signed_in_at: created_at,
        };
        self.cache
            .set_user_session_data(account_id, &latest, None)
            .await?;

        info!(%account_id, %session_id, "Session opened");

        Ok(IssuedSession {
            session_id,
            token,
            expires_at: record.expires_at,
        })
    }

    /// Looks up a live session
    pub async fn lookup(&self, session_id: Uuid) -> Result<Option<SessionRecord>, CacheError> {
        self.cache.get(&Self::session_key(session_id)).await
    }

    /// Deletes a session; `Ok(false)` if it was already gone
    pub async fn close(&self, session_id: Uuid) -> Result<bool, CacheError> {
        let removed = self.cache.delete(&Self::session_key(session_id)).await?;
        debug!(%session_id, removed, "Session closed");
        Ok(removed)
    }

    /// Resolves a bearer token to its session
    ///
    /// The token must verify, its session must still exist, and the session
    /// must belong to the token's subject.
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = validate_token(token, &self.secret).map_err(|e| match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            _ => AuthError::InvalidToken("Invalid token".to_string()),
        })?;

        let record = self
            .lookup(claims.sid)
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .ok_or(AuthError::SessionEnded)?;

        if record.account_id != claims.sub {
            return Err(AuthError::SessionEnded);
        }

        Ok(AuthContext {
            account_id: claims.sub,
            session_id: claims.sid,
        })
    }
}
