//! # Rollcall Shared Library
//!
//! This crate contains the domain types, persistence layer, authentication
//! primitives and cache-aside helpers used by the Rollcall API server.
//!
//! ## Module Organization
//!
//! - `models`: Accounts, role profiles and request audit records
//! - `storage`: `Storage` trait with PostgreSQL and in-memory backends
//! - `db`: PostgreSQL pool management and migrations
//! - `auth`: Password hashing, session tokens and the session registry
//! - `cache`: `CacheStore` trait, Redis/in-memory stores and `CacheHelper`
//! - `redis`: Redis client wrapper with health checks

pub mod auth;
pub mod cache;
pub mod db;
pub mod models;
pub mod redis;
pub mod storage;

/// Current version of the Rollcall shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
