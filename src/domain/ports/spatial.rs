use async_trait::async_trait;
use thiserror::Error;

use crate::domain::models::{CandidateRef, ClippedRegion, Geometry};

/// Errors from a spatial data source.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("Query failed: {0}")]
    Query(String),

    #[error("Store returned invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Clips a polygon against the urbanized-area boundary dataset.
#[async_trait]
pub trait SpatialIntersector: Send + Sync {
    /// Non-empty intersections of `polygon` with each boundary, in WGS84.
    ///
    /// An empty result means nothing overlaps; it is not an error here.
    async fn intersect(&self, polygon: &Geometry) -> Result<Vec<ClippedRegion>, SpatialError>;
}

/// Draws random address points from inside a clipped region.
#[async_trait]
pub trait CandidateSampler: Send + Sync {
    /// Up to `count` candidates inside `region`, chosen uniformly at random.
    /// Sparse regions may yield fewer.
    async fn sample(
        &self,
        region: &ClippedRegion,
        count: usize,
    ) -> Result<Vec<CandidateRef>, SpatialError>;
}
