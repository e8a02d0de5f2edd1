//! PostgreSQL storage backend

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Storage, StorageResult};
use crate::db::pool::health_check;
use crate::models::account::{Account, NewAccount};
use crate::models::profile::{Profile, ProfileCounts, ProfileListing, ProfileRole};
use crate::models::request_log::{NewRequestLog, RequestLog};

/// Storage backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for migrations and shutdown
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Storage for PgStorage {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn create_account(&self, data: NewAccount) -> StorageResult<Account> {
        Ok(Account::create(&self.pool, data).await?)
    }

    async fn find_account_by_id(&self, id: Uuid) -> StorageResult<Option<Account>> {
        Ok(Account::find_by_id(&self.pool, id).await?)
    }

    async fn find_account_by_username(&self, username: &str) -> StorageResult<Option<Account>> {
        Ok(Account::find_by_username(&self.pool, username).await?)
    }

    async fn find_account_by_email(&self, email: &str) -> StorageResult<Option<Account>> {
        Ok(Account::find_by_email(&self.pool, email).await?)
    }

    async fn username_exists(&self, username: &str) -> StorageResult<bool> {
        Ok(Account::username_exists(&self.pool, username).await?)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StorageResult<bool> {
        Ok(Account::update_password(&self.pool, id, password_hash).await?)
    }

    async fn update_last_login(&self, id: Uuid) -> StorageResult<bool> {
        Ok(Account::update_last_login(&self.pool, id).await?)
    }

    async fn count_accounts(&self) -> StorageResult<i64> {
        Ok(Account::count(&self.pool).await?)
    }

    async fn find_profile(&self, account_id: Uuid) -> StorageResult<Option<Profile>> {
        Ok(Profile::find_by_account(&self.pool, account_id).await?)
    }

    async fn find_profile_by_id(&self, id: Uuid) -> StorageResult<Option<Profile>> {
        Ok(Profile::find_by_id(&self.pool, id).await?)
    }

    async fn get_or_create_profile(&self, account_id: Uuid) -> StorageResult<Profile> {
        Ok(Profile::get_or_create(&self.pool, account_id).await?)
    }

    async fn save_profile(&self, profile: &Profile) -> StorageResult<Profile> {
        Ok(Profile::save(&self.pool, profile).await?)
    }

    async fn list_profiles(&self, role: ProfileRole) -> StorageResult<Vec<ProfileListing>> {
        Ok(Profile::list_by_role(&self.pool, role).await?)
    }

    async fn count_profiles_by_role(&self) -> StorageResult<ProfileCounts> {
        Ok(Profile::count_by_role(&self.pool).await?)
    }

    async fn append_request_log(&self, data: NewRequestLog) -> StorageResult<RequestLog> {
        Ok(RequestLog::append(&self.pool, data).await?)
    }

    async fn list_recent_request_logs(&self, limit: i64) -> StorageResult<Vec<RequestLog>> {
        Ok(RequestLog::list_recent(&self.pool, limit).await?)
    }

    async fn ping(&self) -> StorageResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
