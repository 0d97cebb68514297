//! Wiring: builds the engine, event bus and job service from configuration.
//!
//! Two spatial sources are supported:
//! - PostGIS plus the OS Places API (the default)
//! - An offline fixture file with a seeded sampler and fixture validator

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::adapters::memory::Fixture;
use crate::adapters::postgis::{create_pool, PoolConfig, PostgisSpatialStore, SpatialTables};
use crate::domain::models::Config;
use crate::domain::ports::{AddressValidator, CandidateSampler, SpatialIntersector};
use crate::infrastructure::places::{PlacesClient, PlacesClientConfig};
use crate::infrastructure::rate_limiter::MinIntervalLimiterFactory;
use crate::services::{
    ConvergenceEngine, EngineSettings, EventBus, EventBusConfig, JobService, SamplerContext,
};

/// Where candidates and validation come from.
#[derive(Debug, Clone)]
pub enum SpatialSource {
    /// PostGIS tables and the OS Places API.
    Live,
    /// A fixture file, sampled with the given seed.
    Fixture { path: PathBuf, seed: u64 },
}

/// Everything a caller needs to submit and follow jobs.
pub struct SamplerRuntime {
    pub jobs: Arc<JobService>,
    pub bus: Arc<EventBus>,
    pub engine: Arc<ConvergenceEngine>,
}

/// Build a places client, refusing to start without an API key.
pub fn build_places_client(config: &Config) -> Result<PlacesClient> {
    if config.validator.api_key.trim().is_empty() {
        bail!(
            "No OS Places API key configured. Set OS_PLACES_API_KEY or \
             ADDRESS_SAMPLER_VALIDATOR__API_KEY"
        );
    }

    PlacesClient::new(PlacesClientConfig::from(&config.validator))
        .context("Failed to initialize OS Places client")
}

/// Assemble the runtime for `source`. Must be called inside a tokio runtime.
pub fn build_runtime(config: &Config, source: &SpatialSource) -> Result<SamplerRuntime> {
    let (intersector, sampler, validator): (
        Arc<dyn SpatialIntersector>,
        Arc<dyn CandidateSampler>,
        Arc<dyn AddressValidator>,
    ) = match source {
        SpatialSource::Live => {
            let pool = create_pool(&config.database.url, Some(PoolConfig::from(&config.database)))
                .context("Failed to create database pool")?;
            let store = Arc::new(
                PostgisSpatialStore::new(pool, SpatialTables::from(&config.database))
                    .context("Invalid spatial store configuration")?,
            );
            let validator = Arc::new(build_places_client(config)?);
            info!(
                boundary_table = %config.database.boundary_table,
                address_table = %config.database.address_table,
                "Using PostGIS spatial source"
            );
            let intersector: Arc<dyn SpatialIntersector> = store.clone();
            let sampler: Arc<dyn CandidateSampler> = store;
            let validator: Arc<dyn AddressValidator> = validator;
            (intersector, sampler, validator)
        }
        SpatialSource::Fixture { path, seed } => {
            let (intersector, sampler, validator) = Fixture::load(path)?.into_parts(*seed);
            info!(fixture = %path.display(), seed, "Using fixture spatial source");
            let intersector: Arc<dyn SpatialIntersector> = Arc::new(intersector);
            let sampler: Arc<dyn CandidateSampler> = Arc::new(sampler);
            let validator: Arc<dyn AddressValidator> = Arc::new(validator);
            (intersector, sampler, validator)
        }
    };

    let bus = Arc::new(EventBus::new(EventBusConfig {
        channel_capacity: config.jobs.event_channel_capacity,
    }));

    let engine = Arc::new(ConvergenceEngine::new(SamplerContext {
        intersector,
        sampler,
        validator,
        publisher: bus.clone(),
        rate_limits: Arc::new(MinIntervalLimiterFactory::new(Duration::from_millis(
            config.rate_limit.min_interval_ms,
        ))),
        settings: EngineSettings::from_config(&config.sampling, config.validator.timeout_secs),
    }));

    let jobs = Arc::new(JobService::new(
        engine.clone(),
        bus.clone(),
        config.jobs.max_concurrent,
    ));

    Ok(SamplerRuntime { jobs, bus, engine })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_places_client_requires_key() {
        let config = Config::default();
        let err = build_places_client(&config).err().unwrap();
        assert!(err.to_string().contains("OS_PLACES_API_KEY"));
    }

    #[tokio::test]
    async fn test_live_runtime_requires_key() {
        let config = Config::default();
        assert!(build_runtime(&config, &SpatialSource::Live).is_err());
    }

    #[tokio::test]
    async fn test_fixture_runtime_builds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"regions": [{{"geometry": {{"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}, "candidates": []}}]}}"#
        )
        .unwrap();

        let mut config = Config::default();
        config.sampling.max_attempts = 3;
        let runtime = build_runtime(
            &config,
            &SpatialSource::Fixture {
                path: file.path().to_path_buf(),
                seed: 1,
            },
        )
        .unwrap();

        assert_eq!(runtime.engine.settings().max_attempts, 3);
        assert_eq!(runtime.jobs.job_count().await, 0);
    }
}
