//! In-memory spatial source and validator for offline runs.

pub mod fixture;
pub mod seeded_sampler;

pub use fixture::{Fixture, FixtureIntersector, FixtureValidator};
pub use seeded_sampler::SeededCandidateSampler;
