/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: HS256 session tokens
/// - [`session`]: Cache-backed session registry
/// - [`middleware`]: Axum bearer-token middleware and `AuthContext` extractor
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use rollcall_shared::auth::password::{hash_password, verify_password};
/// use rollcall_shared::auth::session::SessionRegistry;
/// use rollcall_shared::cache::{CacheHelper, MemoryCacheStore};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let cache = CacheHelper::new(Arc::new(MemoryCacheStore::new()), Duration::from_secs(300));
/// let sessions = SessionRegistry::new(cache, "0123456789abcdef0123456789abcdef", Duration::from_secs(86_400));
/// let issued = sessions.open(Uuid::new_v4()).await?;
/// sessions.authenticate(&issued.token).await?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod session;
