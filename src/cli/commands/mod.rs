//! Subcommand implementations.

pub mod config;
pub mod geocode;
pub mod sample;
