//! PostGIS spatial data source.

pub mod connection;
pub mod spatial_store;

pub use connection::{create_pool, verify_connection, ConnectionError, PoolConfig};
pub use spatial_store::{is_sql_identifier, PostgisSpatialStore, SpatialTables};
