/// PostgreSQL plumbing for Rollcall
///
/// # Modules
///
/// - `pool`: Connection pool creation, health checks and shutdown
/// - `migrations`: Embedded schema migrations from the workspace `migrations/` directory
///
/// Queries live next to the models in [`crate::models`].

pub mod migrations;
pub mod pool;
