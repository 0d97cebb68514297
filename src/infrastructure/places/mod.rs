//! OS Places address validator
//!
//! Looks up a UPRN against the Delivery Point Address dataset and keeps
//! only approved, live, primary delivery points.

pub mod client;
pub mod errors;
pub mod types;

pub use client::{PlacesClient, PlacesClientConfig};
pub use errors::PlacesApiError;
pub use types::{DpaRecord, PlacesResponse, Rejection};
