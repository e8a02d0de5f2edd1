/// Account model and database operations
///
/// This module provides the Account model and the SQL used by the PostgreSQL
/// storage backend to manage user accounts.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE accounts (
///     id UUID PRIMARY KEY,
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL,          -- unique on LOWER(email)
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(150) NOT NULL DEFAULT '',
///     last_name VARCHAR(150) NOT NULL DEFAULT '',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Username derivation
///
/// Sign-up derives the username from the local part of the email address.
/// When that name is taken, the smallest unused positive integer is appended
/// (`ada`, `ada1`, `ada2`, ...). See [`username_base`] and
/// [`username_candidate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Fallback username when an email has an empty local part
const FALLBACK_USERNAME: &str = "user";

/// Account model representing a user identity
///
/// Passwords are stored as Argon2id hashes and never serialized.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Account {
    /// Unique account ID (UUID v4)
    pub id: Uuid,

    /// Unique username, derived from the email at sign-up
    pub username: String,

    /// Email address (unique, compared case-insensitively)
    pub email: String,

    /// Argon2id password hash (PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// First token of the display name
    pub first_name: String,

    /// Remainder of the display name
    pub last_name: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the account last signed in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    /// Username (already disambiguated)
    pub username: String,

    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password!)
    pub password_hash: String,

    /// First name
    pub first_name: String,

    /// Last name
    pub last_name: String,
}

/// Public view of an account, as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
        }
    }
}

impl Account {
    /// Builds a new account record from creation input
    ///
    /// Used by storage backends that do not generate rows server-side.
    pub fn from_new(data: NewAccount) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            first_name: data.first_name,
            last_name: data.last_name,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    /// Returns `"first last"`, trimmed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Returns the public summary of this account
    pub fn summary(&self) -> AccountSummary {
        AccountSummary::from(self)
    }

    /// Inserts a new account
    ///
    /// # Errors
    ///
    /// Returns a database error carrying the violated constraint if the
    /// username or email is already registered.
    pub async fn create(pool: &PgPool, data: NewAccount) -> Result<Self, sqlx::Error> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, email, password_hash, first_name, last_name,
                      created_at, updated_at, last_login_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.first_name)
        .bind(data.last_name)
        .fetch_one(pool)
        .await?;

        Ok(account)
    }

    /// Finds an account by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name,
                   created_at, updated_at, last_login_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds an account by exact username
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name,
                   created_at, updated_at, last_login_at
            FROM accounts
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    /// Finds an account by email address (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name,
                   created_at, updated_at, last_login_at
            FROM accounts
            WHERE LOWER(email) = LOWER($1)
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Checks whether a username is already taken
    pub async fn username_exists(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE username = $1)")
            .bind(username)
            .fetch_one(pool)
            .await
    }

    /// Replaces the stored password hash
    ///
    /// Returns true if the account exists and was updated.
    pub async fn update_password(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE accounts SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts all accounts
    pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

/// Returns the username stem for an email address: its local part
///
/// # Example
///
/// ```
/// use rollcall_shared::models::account::username_base;
///
/// assert_eq!(username_base("ada@example.com"), "ada");
/// assert_eq!(username_base("@example.com"), "user");
/// ```
pub fn username_base(email: &str) -> &str {
    match email.split('@').next() {
        Some(local) if !local.is_empty() => local,
        _ => FALLBACK_USERNAME,
    }
}

/// Returns the n-th username candidate for a stem
///
/// Candidate 0 is the stem itself, candidate n is the stem suffixed with n.
pub fn username_candidate(base: &str, n: u32) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{}{}", base, n)
    }
}

/// Splits a display name into first name and the remainder
///
/// The first whitespace-delimited token becomes the first name; everything
/// after it (trimmed) becomes the last name.
///
/// # Example
///
/// ```
/// use rollcall_shared::models::account::split_full_name;
///
/// assert_eq!(split_full_name("Ada Lovelace"), ("Ada".to_string(), "Lovelace".to_string()));
/// assert_eq!(split_full_name("Plato"), ("Plato".to_string(), String::new()));
/// ```
pub fn split_full_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (name.to_string(), String::new()),
    }
}
