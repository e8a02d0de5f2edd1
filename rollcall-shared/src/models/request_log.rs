/// Request audit log
///
/// One row per handled HTTP request, written by the API's request logging
/// middleware. Rows are append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Stored request record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RequestLog {
    pub id: Uuid,
    /// Request path, without the query string
    pub endpoint: String,
    pub method: String,
    pub status_code: i32,
    /// Wall-clock time spent in the handler stack
    pub latency_ms: i64,
    /// Authenticated account, if the request carried a valid session
    pub account_id: Option<Uuid>,
    pub client_addr: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a request record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRequestLog {
    pub endpoint: String,
    pub method: String,
    pub status_code: i32,
    pub latency_ms: i64,
    pub account_id: Option<Uuid>,
    pub client_addr: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestLog {
    /// Builds a stored record from input, stamped now
    pub fn from_new(data: NewRequestLog) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint: data.endpoint,
            method: data.method,
            status_code: data.status_code,
            latency_ms: data.latency_ms,
            account_id: data.account_id,
            client_addr: data.client_addr,
            user_agent: data.user_agent,
            created_at: Utc::now(),
        }
    }

    /// Appends a record
    pub async fn append(pool: &PgPool, data: NewRequestLog) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, RequestLog>(
            r#"
            INSERT INTO request_logs
                (id, endpoint, method, status_code, latency_ms, account_id, client_addr, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, endpoint, method, status_code, latency_ms, account_id,
                      client_addr, user_agent, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.endpoint)
        .bind(data.method)
        .bind(data.status_code)
        .bind(data.latency_ms)
        .bind(data.account_id)
        .bind(data.client_addr)
        .bind(data.user_agent)
        .fetch_one(pool)
        .await
    }

    /// Lists the most recent records, newest first
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, RequestLog>(
            r#"
            SELECT id, endpoint, method, status_code, latency_ms, account_id,
                   client_addr, user_agent, created_at
            FROM request_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
