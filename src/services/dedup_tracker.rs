//! Per-job record of every identifier handed to the validator.

use std::collections::HashSet;

use crate::domain::models::LocationId;

/// Grow-only set of attempted location identifiers.
///
/// Filtering sampler output through [`DedupTracker::mark_tried`] guarantees
/// that no identifier reaches the validator twice within one job.
#[derive(Debug, Default, Clone)]
pub struct DedupTracker {
    tried: HashSet<LocationId>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` as tried. Returns `false` if it was already present, in
    /// which case nothing changes.
    pub fn mark_tried(&mut self, id: LocationId) -> bool {
        self.tried.insert(id)
    }

    pub fn contains(&self, id: &LocationId) -> bool {
        self.tried.contains(id)
    }

    pub fn len(&self) -> usize {
        self.tried.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tried.is_empty()
    }
}
