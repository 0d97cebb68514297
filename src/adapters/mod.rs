//! Spatial data source adapters.
//!
//! - `postgis`: urbanized-area intersection and address sampling in Postgres
//! - `memory`: fixture-backed source with a seeded sampler, for offline runs

pub mod memory;
pub mod postgis;
