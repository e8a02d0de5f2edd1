/// Redis connectivity
///
/// The cache layer ([`crate::cache::RedisCacheStore`]) builds on this client;
/// nothing else in Rollcall talks to Redis directly.
///
/// # Example
///
/// ```no_run
/// use rollcall_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RedisClient::new(RedisConfig::from_env()?).await?;
/// println!("{:?}", client.stats().await);
/// # Ok(())
/// # }
/// ```

pub mod client;

pub use client::{RedisClient, RedisClientError, RedisConfig};
