//! Address Sampler
//!
//! Samples N deliverable postal addresses inside a GeoJSON polygon. The
//! polygon is clipped against urbanized-area boundaries in PostGIS, random
//! address points are drawn from each clipped region, and every new
//! candidate is checked against the OS Places Delivery Point Address
//! dataset until the requested number is found or the round budget runs
//! out. Progress, completion and errors are published per job.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, port traits and error types
//! - **Service Layer** (`services`): Convergence engine, dedup, event bus, job runner
//! - **Adapters** (`adapters`): PostGIS and in-memory spatial sources
//! - **Infrastructure Layer** (`infrastructure`): OS Places client, rate limiting, config, logging
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use address_sampler::infrastructure::setup::{build_runtime, SpatialSource};
//! use address_sampler::{ConfigLoader, JobRequest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let runtime = build_runtime(&config, &SpatialSource::Live)?;
//!     let id = runtime.jobs.submit(JobRequest::new(polygon, 3)).await?;
//!     let snapshot = runtime.jobs.wait(id).await;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CandidateRef, ClippedRegion, Config, Geometry, JobId, JobOutcome, JobReport, JobRequest,
    JobSnapshot, JobStatus, LocationId, NotificationEvent, ValidatedAddress,
};
pub use domain::ports::{
    AddressValidator, CandidateSampler, ProgressPublisher, RateLimiter, RateLimiterFactory,
    SpatialIntersector,
};
pub use domain::{SamplingError, SubmitError};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{ConvergenceEngine, DedupTracker, EventBus, JobService, SamplerContext};
