//! Domain errors for sampling jobs.

use thiserror::Error;

use super::models::GeometryError;
use super::ports::SpatialError;

/// Terminal failures of a sampling job.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("no intersecting regions: no urbanized areas overlap the supplied polygon")]
    NoIntersectingRegions,

    #[error("could not find {target} deliverable addresses after {attempts} attempts")]
    AttemptsExhausted { target: usize, attempts: u32 },

    #[error("spatial query failed: {0}")]
    Spatial(#[from] SpatialError),

    #[error("job cancelled")]
    Cancelled,
}

impl SamplingError {
    /// Message safe to publish to subscribers. Store errors are reduced to
    /// a generic message; their detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Spatial(_) => "spatial data source unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

/// Reasons a job submission is rejected before any work starts.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Missing polygon")]
    MissingPolygon,

    #[error("Invalid polygon: {0}")]
    InvalidPolygon(#[from] GeometryError),

    #[error("Invalid n: {0}. Must be a positive integer")]
    InvalidCount(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message() {
        let err = SamplingError::AttemptsExhausted {
            target: 3,
            attempts: 20,
        };
        assert_eq!(
            err.public_message(),
            "could not find 3 deliverable addresses after 20 attempts"
        );
    }

    #[test]
    fn test_spatial_detail_is_hidden() {
        let err = SamplingError::from(SpatialError::Query(
            "connection refused (os error 111)".to_string(),
        ));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.public_message(), "spatial data source unavailable");
    }
}
