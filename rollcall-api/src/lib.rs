//! # Rollcall API Server Library
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON extractor with API error rejections
//! - `middleware`: Security headers, auth throttling and request logging
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
