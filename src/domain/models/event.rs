//! Notification events published on a job's topic.
//!
//! The wire form is a flat JSON object tagged by `type`:
//!
//! ```json
//! {"type":"progress","jobId":"…","currentStep":"Geocoded 1/3 valid addresses","progress":33}
//! {"type":"complete","jobId":"…","result":[…]}
//! {"type":"error","jobId":"…","error":"…"}
//! ```

use serde::{Deserialize, Serialize};

use super::address::ValidatedAddress;
use super::job::JobId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum NotificationEvent {
    /// Emitted after every validation attempt.
    Progress {
        job_id: JobId,
        current_step: String,
        /// Percentage of the target found so far, 0 to 100.
        progress: u8,
    },
    /// Final message of a successful job.
    Complete {
        job_id: JobId,
        result: Vec<ValidatedAddress>,
    },
    /// Final message of a failed or cancelled job.
    Error { job_id: JobId, error: String },
}

impl NotificationEvent {
    /// Build a progress event for `found` of `target` addresses.
    pub fn progress(job_id: JobId, found: usize, target: usize) -> Self {
        Self::Progress {
            job_id,
            current_step: format!("Geocoded {found}/{target} valid addresses"),
            progress: percent(found, target),
        }
    }

    pub fn job_id(&self) -> JobId {
        match self {
            Self::Progress { job_id, .. }
            | Self::Complete { job_id, .. }
            | Self::Error { job_id, .. } => *job_id,
        }
    }

    /// Complete and Error close the job's topic.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress { .. } => "progress",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }
}

/// `round(100 * found / target)`, half rounding up, clamped to 100.
pub fn percent(found: usize, target: usize) -> u8 {
    if target == 0 {
        return 100;
    }
    let found = found.min(target);
    let rounded = (200 * found + target) / (2 * target);
    u8::try_from(rounded).unwrap_or(100)
}
