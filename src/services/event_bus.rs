//! EventBus service for per-job notification topics.
//!
//! Each job gets its own broadcast channel, created when the first
//! subscriber arrives. Delivery is at-most-once: events published while a
//! topic has no subscribers are dropped, and a terminal event closes the
//! topic. The terminal event is kept so that a subscriber arriving after
//! the close still receives it, followed by the end of the stream.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::trace;

use crate::domain::models::{JobId, NotificationEvent};
use crate::domain::ports::ProgressPublisher;

/// Configuration for the EventBus.
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Buffered events per topic before slow subscribers start lagging.
    pub channel_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

#[derive(Default)]
struct Topics {
    open: HashMap<JobId, broadcast::Sender<NotificationEvent>>,
    /// Terminal event of every closed topic.
    closed: HashMap<JobId, NotificationEvent>,
}

/// In-process topic-keyed event bus.
pub struct EventBus {
    topics: RwLock<Topics>,
    published: AtomicU64,
    undelivered: AtomicU64,
    config: EventBusConfig,
}

impl EventBus {
    /// Create a new EventBus with the given configuration.
    pub fn new(config: EventBusConfig) -> Self {
        Self {
            topics: RwLock::new(Topics::default()),
            published: AtomicU64::new(0),
            undelivered: AtomicU64::new(0),
            config,
        }
    }

    /// Subscribe to a job's topic, opening it if needed.
    ///
    /// A topic that already closed is never reopened: the receiver yields
    /// the stored terminal event and then reports the channel closed.
    pub async fn subscribe(&self, job_id: JobId) -> broadcast::Receiver<NotificationEvent> {
        let mut topics = self.topics.write().await;
        if let Some(terminal) = topics.closed.get(&job_id) {
            let (sender, receiver) = broadcast::channel(1);
            let _ = sender.send(terminal.clone());
            return receiver;
        }
        topics
            .open
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(self.config.channel_capacity.max(1)).0)
            .subscribe()
    }

    /// Publish an event to its job's topic.
    pub async fn publish_event(&self, event: NotificationEvent) {
        self.published.fetch_add(1, Ordering::Relaxed);
        let job_id = event.job_id();
        let kind = event.kind();

        let delivered = if event.is_terminal() {
            // Dropping the sender after this send closes the topic.
            let mut topics = self.topics.write().await;
            let sender = topics.open.remove(&job_id);
            topics.closed.insert(job_id, event.clone());
            sender.is_some_and(|sender| sender.send(event).is_ok())
        } else {
            let topics = self.topics.read().await;
            topics
                .open
                .get(&job_id)
                .is_some_and(|sender| sender.send(event).is_ok())
        };

        if !delivered {
            self.undelivered.fetch_add(1, Ordering::Relaxed);
            trace!(job_id = %job_id, kind, "event had no subscribers");
        }
    }

    /// Get the number of active subscribers for a job.
    pub async fn subscriber_count(&self, job_id: JobId) -> usize {
        self.topics
            .read()
            .await
            .open
            .get(&job_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of open topics.
    pub async fn topic_count(&self) -> usize {
        self.topics.read().await.open.len()
    }

    /// Whether the job's terminal event has been published.
    pub async fn is_closed(&self, job_id: JobId) -> bool {
        self.topics.read().await.closed.contains_key(&job_id)
    }

    /// Total events published, delivered or not.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Events that reached no subscriber.
    pub fn undelivered_count(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

#[async_trait]
impl ProgressPublisher for EventBus {
    async fn publish(&self, event: NotificationEvent) {
        self.publish_event(event).await;
    }
}
