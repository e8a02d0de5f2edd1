/// Database models for Rollcall
///
/// This module contains the domain records and their PostgreSQL operations.
/// Backend-agnostic access goes through [`crate::storage::Storage`].
///
/// # Models
///
/// - `account`: User identities and credentials
/// - `profile`: Student, parent and instructor role profiles
/// - `request_log`: Per-request audit records
///
/// # Example
///
/// ```no_run
/// use rollcall_shared::models::account::{Account, NewAccount};
/// use rollcall_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let account = Account::create(&pool, NewAccount {
///     username: "ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "Ada".to_string(),
///     last_name: "Lovelace".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod account;
pub mod profile;
pub mod request_log;
