//! Domain layer for the address sampler
//!
//! Models, port traits for the external collaborators, and error types.

pub mod error;
pub mod models;
pub mod ports;

pub use error::{SamplingError, SubmitError};
