pub mod convergence_engine;
pub mod dedup_tracker;
pub mod event_bus;
pub mod job_service;

pub use convergence_engine::{ConvergenceEngine, EngineSettings, SamplerContext};
pub use dedup_tracker::DedupTracker;
pub use event_bus::{EventBus, EventBusConfig};
pub use job_service::JobService;
