//! Infrastructure layer module
//!
//! External integrations and process plumbing:
//! - OS Places address validator (reqwest)
//! - Token-bucket rate limiting
//! - Configuration management
//! - Logging infrastructure
//! - Runtime wiring
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod config;
pub mod logging;
pub mod places;
pub mod rate_limiter;
pub mod setup;
