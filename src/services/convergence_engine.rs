//! Convergence engine service.
//!
//! The `ConvergenceEngine` drives one sampling job from submission to a
//! terminal outcome:
//!
//! - **INTERSECTING** -- Clip the job polygon against the boundary dataset.
//!   No regions means immediate failure.
//! - **SAMPLING** -- Ask every region for an even share of the addresses
//!   still needed, dropping identifiers already tried.
//! - **VALIDATING** -- Validate the new candidates one at a time behind the
//!   job's rate limiter, publishing progress after every attempt.
//! - **COMPLETE / FAILED** -- Publish exactly one terminal event.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::error::SamplingError;
use crate::domain::models::{
    CandidateRef, ClippedRegion, Geometry, JobId, JobOutcome, JobReport, NotificationEvent,
    SamplingConfig, ValidatedAddress,
};
use crate::domain::ports::{
    AddressValidator, CandidateSampler, ProgressPublisher, RateLimiter, RateLimiterFactory,
    SpatialIntersector,
};
use crate::services::dedup_tracker::DedupTracker;

// ---------------------------------------------------------------------------
// Settings and context
// ---------------------------------------------------------------------------

/// Loop bounds for the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Rounds allowed before the job fails.
    pub max_attempts: u32,
    /// Upper bound on a single validator call as seen by the engine.
    pub validator_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            validator_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineSettings {
    /// Build settings from config, allowing the engine a margin over the
    /// HTTP client's own request timeout.
    pub fn from_config(sampling: &SamplingConfig, validator_timeout_secs: u64) -> Self {
        Self {
            max_attempts: sampling.max_attempts,
            validator_timeout: Duration::from_secs(validator_timeout_secs.saturating_mul(2).max(1)),
        }
    }
}

/// Collaborators shared by every job the engine runs.
#[derive(Clone)]
pub struct SamplerContext {
    pub intersector: Arc<dyn SpatialIntersector>,
    pub sampler: Arc<dyn CandidateSampler>,
    pub validator: Arc<dyn AddressValidator>,
    pub publisher: Arc<dyn ProgressPublisher>,
    pub rate_limits: Arc<dyn RateLimiterFactory>,
    pub settings: EngineSettings,
}

// ---------------------------------------------------------------------------
// Job state
// ---------------------------------------------------------------------------

/// Mutable state of one running job. Owned by a single engine run.
struct Job {
    id: JobId,
    target: usize,
    accumulated: Vec<ValidatedAddress>,
    tried: DedupTracker,
    round: u32,
}

impl Job {
    fn new(id: JobId, target: usize) -> Self {
        Self {
            id,
            target,
            accumulated: Vec::with_capacity(target),
            tried: DedupTracker::new(),
            round: 0,
        }
    }

    fn found(&self) -> usize {
        self.accumulated.len()
    }

    fn is_satisfied(&self) -> bool {
        self.found() >= self.target
    }

    fn needed(&self) -> usize {
        self.target.saturating_sub(self.found())
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs sampling jobs to completion.
pub struct ConvergenceEngine {
    ctx: SamplerContext,
}

impl ConvergenceEngine {
    pub fn new(ctx: SamplerContext) -> Self {
        Self { ctx }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.ctx.settings
    }

    /// Run a job until it finds `target` addresses, exhausts its rounds,
    /// fails, or is cancelled. Publishes exactly one terminal event.
    #[instrument(skip_all, fields(job_id = %job_id, n = target))]
    pub async fn run(
        &self,
        job_id: JobId,
        polygon: &Geometry,
        target: usize,
        cancel: CancellationToken,
    ) -> JobReport {
        info!("sampler started");

        let limiter = self.ctx.rate_limits.create();
        let mut job = Job::new(job_id, target);
        let result = self.drive(&mut job, polygon, limiter.as_ref(), &cancel).await;

        let outcome = match result {
            Ok(()) => {
                info!(found = job.found(), rounds = job.round, "sampler completed");
                self.ctx
                    .publisher
                    .publish(NotificationEvent::Complete {
                        job_id,
                        result: job.accumulated.clone(),
                    })
                    .await;
                JobOutcome::Completed(job.accumulated)
            }
            Err(err) => {
                match &err {
                    SamplingError::Cancelled => {
                        info!(found = job.found(), rounds = job.round, "sampler cancelled");
                    }
                    SamplingError::Spatial(source) => {
                        error!(error = %source, rounds = job.round, "spatial data source failed");
                    }
                    other => {
                        warn!(error = %other, found = job.found(), rounds = job.round, "sampler failed");
                    }
                }

                let message = err.public_message();
                self.ctx
                    .publisher
                    .publish(NotificationEvent::Error {
                        job_id,
                        error: message.clone(),
                    })
                    .await;

                if matches!(err, SamplingError::Cancelled) {
                    JobOutcome::Cancelled {
                        partial: job.accumulated,
                    }
                } else {
                    JobOutcome::Failed {
                        reason: message,
                        partial: job.accumulated,
                    }
                }
            }
        };

        JobReport {
            job_id,
            rounds: job.round,
            attempted: job.tried.len(),
            outcome,
        }
    }

    async fn drive(
        &self,
        job: &mut Job,
        polygon: &Geometry,
        limiter: &dyn RateLimiter,
        cancel: &CancellationToken,
    ) -> Result<(), SamplingError> {
        debug!("intersecting polygon with urbanized areas");
        let regions = self.ctx.intersector.intersect(polygon).await?;
        if regions.is_empty() {
            return Err(SamplingError::NoIntersectingRegions);
        }
        info!(regions = regions.len(), "found intersecting regions");

        while !job.is_satisfied() && job.round < self.ctx.settings.max_attempts {
            if cancel.is_cancelled() {
                return Err(SamplingError::Cancelled);
            }

            job.round += 1;
            info!(
                round = job.round,
                found = job.found(),
                n = job.target,
                "starting round"
            );

            let batch = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SamplingError::Cancelled),
                batch = self.sample_round(job, &regions) => batch?,
            };
            debug!(round = job.round, candidates = batch.len(), "validating candidates");

            self.validate_batch(job, batch, limiter, cancel).await?;
        }

        if job.is_satisfied() {
            Ok(())
        } else {
            Err(SamplingError::AttemptsExhausted {
                target: job.target,
                attempts: job.round,
            })
        }
    }

    /// Sample an even share from every region, one region at a time, and
    /// keep the untried ones.
    async fn sample_round(
        &self,
        job: &mut Job,
        regions: &[ClippedRegion],
    ) -> Result<Vec<CandidateRef>, SamplingError> {
        let per_region = job.needed().div_ceil(regions.len());
        let mut batch = Vec::new();

        for region in regions {
            let candidates = self.ctx.sampler.sample(region, per_region).await?;
            debug!(
                region = region.index,
                requested = per_region,
                returned = candidates.len(),
                "sampled region"
            );

            batch.extend(
                candidates
                    .into_iter()
                    .filter(|candidate| job.tried.mark_tried(candidate.id.clone())),
            );
        }

        Ok(batch)
    }

    /// Validate candidates strictly one after another, stopping once the
    /// target is met.
    async fn validate_batch(
        &self,
        job: &mut Job,
        batch: Vec<CandidateRef>,
        limiter: &dyn RateLimiter,
        cancel: &CancellationToken,
    ) -> Result<(), SamplingError> {
        for candidate in batch {
            if job.is_satisfied() {
                break;
            }

            let validated = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(SamplingError::Cancelled),
                validated = self.validate_one(&candidate, limiter) => validated,
            };

            match validated {
                Some(address) => {
                    debug!(uprn = %candidate.id, "candidate deliverable");
                    job.accumulated.push(address);
                }
                None => debug!(uprn = %candidate.id, "candidate not deliverable"),
            }

            self.ctx
                .publisher
                .publish(NotificationEvent::progress(job.id, job.found(), job.target))
                .await;
        }

        Ok(())
    }

    async fn validate_one(
        &self,
        candidate: &CandidateRef,
        limiter: &dyn RateLimiter,
    ) -> Option<ValidatedAddress> {
        limiter.acquire().await;

        let call = self.ctx.validator.validate(&candidate.id);
        tokio::time::timeout(self.ctx.settings.validator_timeout, call)
            .await
            .unwrap_or_else(|_| {
                warn!(uprn = %candidate.id, "validator call timed out");
                None
            })
    }
}
