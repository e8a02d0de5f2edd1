//! In-process storage backend
//!
//! Keeps every record in `HashMap`s behind a single [`RwLock`]. Used by the
//! test suite and by `STORAGE_BACKEND=memory` for local runs without
//! PostgreSQL. Enforces the same uniqueness rules as the database schema.
//! Request logs are a ring buffer holding the newest
//! [`DEFAULT_REQUEST_LOG_CAPACITY`] records.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
use crate::models::account::{Account, NewAccount};
use crate::models::profile::{
    Profile, ProfileCounts, ProfileListing, ProfileRole, RoleDetails,
};
use crate::models::request_log::{NewRequestLog, RequestLog};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    /// Profiles keyed by owning account
    profiles: HashMap<Uuid, Profile>,
    /// Oldest first
    request_logs: VecDeque<RequestLog>,
}

/// Emails compare like `LOWER(email)` in the database index
fn same_email(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

impl Tables {
    fn email_taken(&self, email: &str) -> bool {
        self.accounts
            .values()
            .any(|a| same_email(&a.email, email))
    }

    /// Checks profile uniqueness against every profile except the one being saved
    fn check_profile_unique(&self, profile: &Profile) -> StorageResult<()> {
        let others = self
            .profiles
            .values()
            .filter(|p| p.account_id != profile.account_id);

        for other in others {
            match (&profile.details, &other.details) {
                (RoleDetails::Student(a), RoleDetails::Student(b)) if a.student_id == b.student_id => {
                    return Err(StorageError::Duplicate("student_id"));
                }
                (RoleDetails::Instructor(a), RoleDetails::Instructor(b))
                    if a.employee_id == b.employee_id =>
                {
                    return Err(StorageError::Duplicate("employee_id"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn children_count(&self, parent_id: Uuid) -> i64 {
        self.profiles
            .values()
            .filter(|p| matches!(&p.details, RoleDetails::Student(s) if s.parent_id == Some(parent_id)))
            .count() as i64
    }
}

/// Request logs kept by [`MemoryStorage::new`]
pub const DEFAULT_REQUEST_LOG_CAPACITY: usize = 10_000;

/// Storage that lives and dies with the process
pub struct MemoryStorage {
    tables: RwLock<Tables>,
    request_log_capacity: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::with_request_log_capacity(DEFAULT_REQUEST_LOG_CAPACITY)
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `capacity` request logs, dropping the oldest first
    pub fn with_request_log_capacity(capacity: usize) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            request_log_capacity: capacity,
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create_account(&self, data: NewAccount) -> StorageResult<Account> {
        let mut tables = self.tables.write().await;

        if tables.accounts.values().any(|a| a.username == data.username) {
            return Err(StorageError::Duplicate("username"));
        }
        if tables.email_taken(&data.email) {
            return Err(StorageError::Duplicate("email"));
        }

        let account = Account::from_new(data);
        tables.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn find_account_by_id(&self, id: Uuid) -> StorageResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> StorageResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> StorageResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| same_email(&a.email, email))
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> StorageResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().any(|a| a.username == username))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.accounts.get_mut(&id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_last_login(&self, id: Uuid) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.accounts.get_mut(&id) {
            Some(account) => {
                account.last_login_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_accounts(&self) -> StorageResult<i64> {
        Ok(self.tables.read().await.accounts.len() as i64)
    }

    async fn find_profile(&self, account_id: Uuid) -> StorageResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&account_id).cloned())
    }

    async fn find_profile_by_id(&self, id: Uuid) -> StorageResult<Option<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.values().find(|p| p.id == id).cloned())
    }

    async fn get_or_create_profile(&self, account_id: Uuid) -> StorageResult<Profile> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&account_id) {
            return Err(StorageError::NotFound);
        }

        let profile = tables
            .profiles
            .entry(account_id)
            .or_insert_with(|| Profile::empty(account_id));
        Ok(profile.clone())
    }

    async fn save_profile(&self, profile: &Profile) -> StorageResult<Profile> {
        let mut tables = self.tables.write().await;
        if !tables.profiles.contains_key(&profile.account_id) {
            return Err(StorageError::NotFound);
        }
        tables.check_profile_unique(profile)?;

        let mut stored = profile.clone();
        stored.updated_at = Utc::now();
        tables.profiles.insert(stored.account_id, stored.clone());
        Ok(stored)
    }

    async fn list_profiles(&self, role: ProfileRole) -> StorageResult<Vec<ProfileListing>> {
        let tables = self.tables.read().await;

        let mut listings = Vec::new();
        for profile in tables.profiles.values().filter(|p| p.role() == role) {
            let account = tables
                .accounts
                .get(&profile.account_id)
                .ok_or_else(|| StorageError::Corrupt(format!("profile {} has no account", profile.id)))?;
            listings.push(ProfileListing {
                profile: profile.clone(),
                account: account.summary(),
                children_count: tables.children_count(profile.id),
            });
        }

        listings.sort_by(|a, b| match (&a.profile.details, &b.profile.details) {
            (RoleDetails::Student(x), RoleDetails::Student(y)) => x.student_id.cmp(&y.student_id),
            (RoleDetails::Instructor(x), RoleDetails::Instructor(y)) => {
                x.employee_id.cmp(&y.employee_id)
            }
            _ => a.profile.created_at.cmp(&b.profile.created_at),
        });

        Ok(listings)
    }

    async fn count_profiles_by_role(&self) -> StorageResult<ProfileCounts> {
        let tables = self.tables.read().await;
        let mut counts = ProfileCounts::default();
        for profile in tables.profiles.values() {
            counts.add(profile.role(), 1);
        }
        Ok(counts)
    }

    async fn append_request_log(&self, data: NewRequestLog) -> StorageResult<RequestLog> {
        let record = RequestLog::from_new(data);
        let mut tables = self.tables.write().await;
        let logs = &mut tables.request_logs;
        logs.push_back(record.clone());
        while logs.len() > self.request_log_capacity {
            logs.pop_front();
        }
        Ok(record)
    }

    async fn list_recent_request_logs(&self, limit: i64) -> StorageResult<Vec<RequestLog>> {
        let tables = self.tables.read().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(tables.request_logs.iter().rev().take(limit).cloned().collect())
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}
