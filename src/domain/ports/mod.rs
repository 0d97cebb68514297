//! Port trait definitions (Hexagonal Architecture)
//!
//! Async interfaces for the collaborators the convergence engine drives:
//! - SpatialIntersector / CandidateSampler: spatial data source
//! - AddressValidator: address validation service
//! - RateLimiter: per-job throttling of validator calls
//! - ProgressPublisher: job event transport

pub mod address_validator;
pub mod progress_publisher;
pub mod rate_limiter;
pub mod spatial;

pub use address_validator::AddressValidator;
pub use progress_publisher::ProgressPublisher;
pub use rate_limiter::{RateLimiter, RateLimiterFactory};
pub use spatial::{CandidateSampler, SpatialError, SpatialIntersector};
