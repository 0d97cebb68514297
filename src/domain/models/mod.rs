pub mod address;
pub mod config;
pub mod event;
pub mod geometry;
pub mod job;

pub use address::{CandidateRef, Classification, LocationId, PostalAddress, ValidatedAddress};
pub use config::{
    Config, DatabaseConfig, JobsConfig, LoggingConfig, RateLimitConfig, SamplingConfig,
    ValidatorConfig,
};
pub use event::NotificationEvent;
pub use geometry::{BoundingBox, ClippedRegion, Geometry, GeometryError, Position};
pub use job::{JobId, JobOutcome, JobReport, JobRequest, JobSnapshot, JobStatus};
