//! Job identity, submission requests and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::address::ValidatedAddress;
use super::geometry::Geometry;

/// Unique identifier for a sampling job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw submission payload. Validated by the job service before any work
/// is scheduled, so both fields are kept in their unchecked form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub polygon: Option<Geometry>,
    #[serde(default)]
    pub n: i64,
}

impl JobRequest {
    pub fn new(polygon: Geometry, n: i64) -> Self {
        Self {
            polygon: Some(polygon),
            n,
        }
    }
}

/// How a job run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Exactly the requested number of addresses, in discovery order.
    Completed(Vec<ValidatedAddress>),
    /// Terminal failure. `partial` holds whatever was accumulated first.
    Failed {
        reason: String,
        partial: Vec<ValidatedAddress>,
    },
    /// Stopped by a cancellation request.
    Cancelled { partial: Vec<ValidatedAddress> },
}

/// Summary returned by the engine once a job reaches a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub job_id: JobId,
    /// Sampling rounds executed.
    pub rounds: u32,
    /// Distinct identifiers passed to the validator.
    pub attempted: usize,
    pub outcome: JobOutcome,
}

impl JobReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Completed(_))
    }
}

/// Externally visible job state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded {
        result: Vec<ValidatedAddress>,
    },
    Failed {
        reason: String,
        partial: Vec<ValidatedAddress>,
    },
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Failed { .. } | Self::Cancelled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl From<JobOutcome> for JobStatus {
    fn from(outcome: JobOutcome) -> Self {
        match outcome {
            JobOutcome::Completed(result) => Self::Succeeded { result },
            JobOutcome::Failed { reason, partial } => Self::Failed { reason, partial },
            JobOutcome::Cancelled { .. } => Self::Cancelled,
        }
    }
}

/// Point-in-time view of a job for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub target: usize,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_missing_fields_deserialize() {
        let request: JobRequest = serde_json::from_str("{}").unwrap();
        assert!(request.polygon.is_none());
        assert_eq!(request.n, 0);
    }

    #[test]
    fn test_outcome_to_status() {
        let status: JobStatus = JobOutcome::Failed {
            reason: "boom".to_string(),
            partial: vec![],
        }
        .into();
        assert_eq!(status.label(), "failed");
        assert!(status.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(JobStatus::Queued).unwrap();
        assert_eq!(json["state"], "queued");
    }
}
