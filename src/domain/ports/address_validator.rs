use async_trait::async_trait;

use crate::domain::models::{LocationId, ValidatedAddress};

/// Resolves a location identifier to a deliverable postal address.
///
/// Every failure mode (not deliverable, no record, transport error) is
/// reported as `None`; a single candidate never fails a job.
#[async_trait]
pub trait AddressValidator: Send + Sync {
    async fn validate(&self, id: &LocationId) -> Option<ValidatedAddress>;
}
