//! Persistence layer
//!
//! Handlers never talk to SQL directly; they go through the [`Storage`]
//! trait so the API can run against PostgreSQL in production and an
//! in-process store in tests.
//!
//! Both backends enforce the same uniqueness rules:
//!
//! - `username` is unique
//! - `email` is unique, compared case-insensitively
//! - a profile's `student_id` and `employee_id` are unique when set
//! - one profile per account

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::account::{Account, NewAccount};
use crate::models::profile::{Profile, ProfileCounts, ProfileListing, ProfileRole};
use crate::models::request_log::{NewRequestLog, RequestLog};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A unique field already holds this value
    #[error("{0} already exists")]
    Duplicate(&'static str),

    /// The record to update does not exist
    #[error("record not found")]
    NotFound,

    /// A stored row could not be decoded
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// Backend failure
    #[error("database error: {0}")]
    Database(String),
}

/// Result alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Decode(e) => StorageError::Corrupt(e.to_string()),
            sqlx::Error::Database(db) => match db.constraint().and_then(duplicate_field) {
                Some(field) => StorageError::Duplicate(field),
                None => StorageError::Database(err.to_string()),
            },
            _ => StorageError::Database(err.to_string()),
        }
    }
}

/// Maps a unique constraint name to the field it protects
fn duplicate_field(constraint: &str) -> Option<&'static str> {
    match constraint {
        "accounts_username_key" => Some("username"),
        "accounts_email_lower_key" => Some("email"),
        "profiles_account_id_key" => Some("account_id"),
        "profiles_student_id_key" => Some("student_id"),
        "profiles_employee_id_key" => Some("employee_id"),
        _ => None,
    }
}

/// Backend-agnostic persistence
#[async_trait]
pub trait Storage: Send + Sync {
    /// Short backend name for health output
    fn backend_name(&self) -> &'static str;

    // Accounts

    async fn create_account(&self, data: NewAccount) -> StorageResult<Account>;
    async fn find_account_by_id(&self, id: Uuid) -> StorageResult<Option<Account>>;
    async fn find_account_by_username(&self, username: &str) -> StorageResult<Option<Account>>;
    /// Case-insensitive lookup
    async fn find_account_by_email(&self, email: &str) -> StorageResult<Option<Account>>;
    async fn username_exists(&self, username: &str) -> StorageResult<bool>;
    /// Returns false if the account does not exist
    async fn update_password(&self, id: Uuid, password_hash: &str) -> StorageResult<bool>;
    async fn update_last_login(&self, id: Uuid) -> StorageResult<bool>;
    async fn count_accounts(&self) -> StorageResult<i64>;

    // Profiles

    async fn find_profile(&self, account_id: Uuid) -> StorageResult<Option<Profile>>;
    async fn find_profile_by_id(&self, id: Uuid) -> StorageResult<Option<Profile>>;
    /// Returns the account's profile, creating an empty parent profile first
    /// if it has none
    async fn get_or_create_profile(&self, account_id: Uuid) -> StorageResult<Profile>;
    /// Overwrites an existing profile, matched by `account_id`
    async fn save_profile(&self, profile: &Profile) -> StorageResult<Profile>;
    async fn list_profiles(&self, role: ProfileRole) -> StorageResult<Vec<ProfileListing>>;
    async fn count_profiles_by_role(&self) -> StorageResult<ProfileCounts>;

    // Request audit log

    async fn append_request_log(&self, data: NewRequestLog) -> StorageResult<RequestLog>;
    async fn list_recent_request_logs(&self, limit: i64) -> StorageResult<Vec<RequestLog>>;

    /// Checks the backend is reachable
    async fn ping(&self) -> StorageResult<()>;
}

/// Shared handle to a storage backend
pub type DynStorage = Arc<dyn Storage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_field_mapping() {
        assert_eq!(duplicate_field("accounts_email_lower_key"), Some("email"));
        assert_eq!(duplicate_field("profiles_student_id_key"), Some("student_id"));
        assert_eq!(duplicate_field("some_other_key"), None);
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            StorageError::from(sqlx::Error::RowNotFound),
            StorageError::NotFound
        ));
    }
}
