//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! - YAML file loading
//! - Environment variable overrides and secret fallbacks
//! - Configuration validation

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
