//! In-process job runner: submission, status, cancellation.
//!
//! Every accepted job runs as its own tokio task. A semaphore bounds how
//! many engines run at once; queued jobs wait for a slot. Finished jobs
//! stay in the registry so their status can still be queried.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::error::SubmitError;
use crate::domain::models::{
    Geometry, JobId, JobRequest, JobSnapshot, JobStatus, NotificationEvent,
};
use crate::services::convergence_engine::ConvergenceEngine;
use crate::services::event_bus::EventBus;

struct JobRecord {
    target: usize,
    submitted_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    status: watch::Receiver<JobStatus>,
    cancel: CancellationToken,
}

impl JobRecord {
    fn snapshot(&self, id: JobId) -> JobSnapshot {
        JobSnapshot {
            id,
            target: self.target,
            status: self.status.borrow().clone(),
            submitted_at: self.submitted_at,
            finished_at: self.finished_at,
        }
    }
}

/// Service for submitting sampling jobs and tracking them.
///
/// The engine must publish through the same [`EventBus`] handed to this
/// service, otherwise subscribers obtained here never see its events.
pub struct JobService {
    engine: Arc<ConvergenceEngine>,
    bus: Arc<EventBus>,
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
    slots: Arc<Semaphore>,
}

impl JobService {
    pub fn new(engine: Arc<ConvergenceEngine>, bus: Arc<EventBus>, max_concurrent: usize) -> Self {
        Self {
            engine,
            bus,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            slots: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Validate and enqueue a job.
    pub async fn submit(&self, request: JobRequest) -> Result<JobId, SubmitError> {
        let (polygon, target) = validate_request(request)?;
        let id = JobId::new();
        self.spawn(id, polygon, target).await;
        Ok(id)
    }

    /// Validate and enqueue a job, subscribing to its topic before it starts
    /// so no event can be missed.
    pub async fn submit_and_subscribe(
        &self,
        request: JobRequest,
    ) -> Result<(JobId, broadcast::Receiver<NotificationEvent>), SubmitError> {
        let (polygon, target) = validate_request(request)?;
        let id = JobId::new();
        let events = self.bus.subscribe(id).await;
        self.spawn(id, polygon, target).await;
        Ok((id, events))
    }

    /// Current status of a job, or `None` for an unknown id.
    pub async fn status(&self, id: JobId) -> Option<JobSnapshot> {
        self.jobs.read().await.get(&id).map(|record| record.snapshot(id))
    }

    /// Subscribe to a job that has not finished yet.
    pub async fn subscribe(&self, id: JobId) -> Option<broadcast::Receiver<NotificationEvent>> {
        let jobs = self.jobs.read().await;
        let record = jobs.get(&id)?;
        if record.status.borrow().is_terminal() {
            return None;
        }
        Some(self.bus.subscribe(id).await)
    }

    /// Request cancellation. Returns `false` for unknown or finished jobs.
    pub async fn cancel(&self, id: JobId) -> bool {
        let jobs = self.jobs.read().await;
        match jobs.get(&id) {
            Some(record) if !record.status.borrow().is_terminal() => {
                info!(job_id = %id, "cancellation requested");
                record.cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Wait for a job to reach a terminal status.
    pub async fn wait(&self, id: JobId) -> Option<JobSnapshot> {
        let mut status = self.jobs.read().await.get(&id)?.status.clone();
        if status.wait_for(JobStatus::is_terminal).await.is_err() {
            warn!(job_id = %id, "job task ended without a terminal status");
        }
        self.status(id).await
    }

    /// Number of jobs ever submitted, finished ones included.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    async fn spawn(&self, id: JobId, polygon: Geometry, target: usize) {
        let (status_tx, status_rx) = watch::channel(JobStatus::Queued);
        let cancel = CancellationToken::new();

        self.jobs.write().await.insert(
            id,
            JobRecord {
                target,
                submitted_at: Utc::now(),
                finished_at: None,
                status: status_rx,
                cancel: cancel.clone(),
            },
        );
        info!(job_id = %id, n = target, "job queued");

        let engine = Arc::clone(&self.engine);
        let bus = Arc::clone(&self.bus);
        let jobs = Arc::clone(&self.jobs);
        let slots = Arc::clone(&self.slots);

        tokio::spawn(async move {
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                permit = slots.acquire_owned() => permit.ok(),
            };

            let status = if let Some(_permit) = permit {
                status_tx.send_replace(JobStatus::Running);
                let report = engine.run(id, &polygon, target, cancel).await;
                JobStatus::from(report.outcome)
            } else {
                bus.publish_event(NotificationEvent::Error {
                    job_id: id,
                    error: "job cancelled".to_string(),
                })
                .await;
                JobStatus::Cancelled
            };

            if let Some(record) = jobs.write().await.get_mut(&id) {
                record.finished_at = Some(Utc::now());
            }
            info!(job_id = %id, status = status.label(), "job finished");
            status_tx.send_replace(status);
        });
    }
}

/// Reject malformed submissions before any work is scheduled.
pub fn validate_request(request: JobRequest) -> Result<(Geometry, usize), SubmitError> {
    let polygon = request.polygon.ok_or(SubmitError::MissingPolygon)?;
    polygon.validate()?;

    let target = usize::try_from(request.n)
        .ok()
        .filter(|n| *n > 0)
        .ok_or(SubmitError::InvalidCount(request.n))?;

    Ok((polygon, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Geometry {
        Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]])
    }

    #[test]
    fn test_validate_request_accepts_positive_n() {
        let (_, target) = validate_request(JobRequest::new(triangle(), 3)).unwrap();
        assert_eq!(target, 3);
    }

    #[test]
    fn test_validate_request_rejects_missing_polygon() {
        let request = JobRequest { polygon: None, n: 3 };
        assert!(matches!(
            validate_request(request),
            Err(SubmitError::MissingPolygon)
        ));
    }

    #[test]
    fn test_validate_request_rejects_non_positive_n() {
        for n in [0, -4] {
            assert!(matches!(
                validate_request(JobRequest::new(triangle(), n)),
                Err(SubmitError::InvalidCount(value)) if value == n
            ));
        }
    }

    #[test]
    fn test_validate_request_rejects_bad_geometry() {
        let open = Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]]);
        assert!(matches!(
            validate_request(JobRequest::new(open, 1)),
            Err(SubmitError::InvalidPolygon(_))
        ));
    }
}
