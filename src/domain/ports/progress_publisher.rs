use async_trait::async_trait;

use crate::domain::models::NotificationEvent;

/// Fire-and-forget delivery of job events to the job's subscribers.
///
/// Delivery is at-most-once; subscribers that join late miss earlier events.
#[async_trait]
pub trait ProgressPublisher: Send + Sync {
    async fn publish(&self, event: NotificationEvent);
}
