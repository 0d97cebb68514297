//! Common test utilities for integration tests
//!
//! Scripted fakes for every engine port, plus small builders for
//! candidates, addresses and polygons.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use address_sampler::domain::models::{Classification, PostalAddress};
use address_sampler::domain::ports::SpatialError;
use address_sampler::services::EngineSettings;
use address_sampler::{
    AddressValidator, CandidateRef, CandidateSampler, ClippedRegion, Geometry, LocationId,
    NotificationEvent, ProgressPublisher, RateLimiter, RateLimiterFactory, SamplerContext,
    SpatialIntersector, ValidatedAddress,
};

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn square(min: f64, max: f64) -> Geometry {
    Geometry::Polygon(vec![vec![
        [min, min],
        [max, min],
        [max, max],
        [min, max],
        [min, min],
    ]])
}

pub fn region(index: usize) -> ClippedRegion {
    ClippedRegion {
        index,
        geometry: square(0.0, 1.0),
    }
}

pub fn candidate(id: &str) -> CandidateRef {
    CandidateRef::new(id, 51.5, -0.12)
}

pub fn candidates(ids: &[&str]) -> Vec<CandidateRef> {
    ids.iter().map(|id| candidate(id)).collect()
}

pub fn address(id: &str) -> ValidatedAddress {
    ValidatedAddress {
        uprn: LocationId::new(id),
        address: PostalAddress {
            udprn: Some(format!("9{id}")),
            full: format!("{id} TEST STREET, TESTTOWN, TT1 1TT"),
            postcode: "TT1 1TT".to_string(),
            town: "TESTTOWN".to_string(),
            ..PostalAddress::default()
        },
        lat: 51.5,
        lon: -0.12,
        classification: Classification {
            code: "RD04".to_string(),
            description: "Terraced".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Spatial fakes
// ---------------------------------------------------------------------------

/// Returns a fixed list of regions and counts calls.
pub struct FixedIntersector {
    regions: Vec<ClippedRegion>,
    calls: AtomicUsize,
}

impl FixedIntersector {
    pub fn new(regions: Vec<ClippedRegion>) -> Self {
        Self {
            regions,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_regions(count: usize) -> Self {
        Self::new((0..count).map(region).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpatialIntersector for FixedIntersector {
    async fn intersect(&self, _polygon: &Geometry) -> Result<Vec<ClippedRegion>, SpatialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.regions.clone())
    }
}

/// Always fails, as an unreachable database would.
pub struct FailingIntersector;

#[async_trait]
impl SpatialIntersector for FailingIntersector {
    async fn intersect(&self, _polygon: &Geometry) -> Result<Vec<ClippedRegion>, SpatialError> {
        Err(SpatialError::Query(
            "connection refused (password=hunter2)".to_string(),
        ))
    }
}

/// Plays back a queue of batches per region, then returns nothing.
#[derive(Default)]
pub struct ScriptedSampler {
    scripts: Mutex<HashMap<usize, VecDeque<Vec<CandidateRef>>>>,
    requests: Mutex<Vec<(usize, usize)>>,
}

impl ScriptedSampler {
    /// One region (index 0), one batch per round.
    pub fn rounds(batches: Vec<Vec<CandidateRef>>) -> Self {
        let sampler = Self::default();
        sampler.script(0, batches);
        sampler
    }

    pub fn script(&self, region: usize, batches: Vec<Vec<CandidateRef>>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(region, batches.into_iter().collect());
    }

    /// `(region index, requested count)` for every call, in order.
    pub fn requests(&self) -> Vec<(usize, usize)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CandidateSampler for ScriptedSampler {
    async fn sample(
        &self,
        region: &ClippedRegion,
        count: usize,
    ) -> Result<Vec<CandidateRef>, SpatialError> {
        self.requests.lock().unwrap().push((region.index, count));
        let batch = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&region.index)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        Ok(batch)
    }
}

/// Draws `count` fresh identifiers every call from an endless counter.
#[derive(Default)]
pub struct EndlessSampler {
    next: AtomicUsize,
    calls: AtomicUsize,
}

impl EndlessSampler {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateSampler for EndlessSampler {
    async fn sample(
        &self,
        region: &ClippedRegion,
        count: usize,
    ) -> Result<Vec<CandidateRef>, SpatialError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let start = self.next.fetch_add(count, Ordering::SeqCst);
        Ok((start..start + count)
            .map(|i| candidate(&format!("r{}-{i}", region.index)))
            .collect())
    }
}

/// Sleeps inside every call and records how many calls overlapped.
pub struct SlowSampler {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    inner: EndlessSampler,
}

impl SlowSampler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            inner: EndlessSampler::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidateSampler for SlowSampler {
    async fn sample(
        &self,
        region: &ClippedRegion,
        count: usize,
    ) -> Result<Vec<CandidateRef>, SpatialError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.sample(region, count).await
    }
}

// ---------------------------------------------------------------------------
// Validator fakes
// ---------------------------------------------------------------------------

/// Approves a fixed set of identifiers and records every call.
pub struct ScriptedValidator {
    deliverable: HashSet<LocationId>,
    approve_all: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<LocationId>>,
}

impl ScriptedValidator {
    pub fn approving(ids: &[&str]) -> Self {
        Self {
            deliverable: ids.iter().map(|id| LocationId::new(*id)).collect(),
            approve_all: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn approve_all() -> Self {
        Self {
            approve_all: true,
            ..Self::approving(&[])
        }
    }

    pub fn reject_all() -> Self {
        Self::approving(&[])
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<LocationId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressValidator for ScriptedValidator {
    async fn validate(&self, id: &LocationId) -> Option<ValidatedAddress> {
        self.calls.lock().unwrap().push(id.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.approve_all || self.deliverable.contains(id)).then(|| address(id.as_str()))
    }
}

/// Approves everything and records when each call started and finished.
pub struct TimedValidator {
    busy: Duration,
    spans: Mutex<Vec<(tokio::time::Instant, tokio::time::Instant)>>,
}

impl TimedValidator {
    pub fn new(busy: Duration) -> Self {
        Self {
            busy,
            spans: Mutex::new(Vec::new()),
        }
    }

    /// `(start, end)` of every call, in call order.
    pub fn spans(&self) -> Vec<(tokio::time::Instant, tokio::time::Instant)> {
        self.spans.lock().unwrap().clone()
    }
}

#[async_trait]
impl AddressValidator for TimedValidator {
    async fn validate(&self, id: &LocationId) -> Option<ValidatedAddress> {
        let start = tokio::time::Instant::now();
        tokio::time::sleep(self.busy).await;
        self.spans
            .lock()
            .unwrap()
            .push((start, tokio::time::Instant::now()));
        Some(address(id.as_str()))
    }
}

/// Approves each identifier with a fixed probability derived from its hash.
pub struct RateValidator {
    /// Approve when `hash % modulus == 0`.
    pub modulus: u64,
}

#[async_trait]
impl AddressValidator for RateValidator {
    async fn validate(&self, id: &LocationId) -> Option<ValidatedAddress> {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        id.hash(&mut hasher);
        (hasher.finish() % self.modulus == 0).then(|| address(id.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Publisher and limiter fakes
// ---------------------------------------------------------------------------

/// Keeps every published event in order.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn progress_values(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                NotificationEvent::Progress { progress, .. } => Some(progress),
                _ => None,
            })
            .collect()
    }

    pub fn terminal_events(&self) -> Vec<NotificationEvent> {
        self.events()
            .into_iter()
            .filter(NotificationEvent::is_terminal)
            .collect()
    }
}

#[async_trait]
impl ProgressPublisher for RecordingPublisher {
    async fn publish(&self, event: NotificationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Limiter that never waits but counts acquisitions.
#[derive(Default)]
pub struct CountingLimiterFactory {
    created: Arc<AtomicUsize>,
    acquired: Arc<AtomicUsize>,
}

impl CountingLimiterFactory {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

struct CountingLimiter {
    acquired: Arc<AtomicUsize>,
}

#[async_trait]
impl RateLimiter for CountingLimiter {
    async fn acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }
}

impl RateLimiterFactory for CountingLimiterFactory {
    fn create(&self) -> Box<dyn RateLimiter> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(CountingLimiter {
            acquired: Arc::clone(&self.acquired),
        })
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Handles to the fakes wired into a [`SamplerContext`].
pub struct Harness<S, V> {
    pub intersector: Arc<FixedIntersector>,
    pub sampler: Arc<S>,
    pub validator: Arc<V>,
    pub publisher: Arc<RecordingPublisher>,
    pub limiter: Arc<CountingLimiterFactory>,
    pub ctx: SamplerContext,
}

pub fn harness<S, V>(regions: usize, sampler: S, validator: V) -> Harness<S, V>
where
    S: CandidateSampler + 'static,
    V: AddressValidator + 'static,
{
    let intersector = Arc::new(FixedIntersector::with_regions(regions));
    let sampler = Arc::new(sampler);
    let validator = Arc::new(validator);
    let publisher = Arc::new(RecordingPublisher::default());
    let limiter = Arc::new(CountingLimiterFactory::default());

    let ctx = SamplerContext {
        intersector: intersector.clone(),
        sampler: sampler.clone(),
        validator: validator.clone(),
        publisher: publisher.clone(),
        rate_limits: limiter.clone(),
        settings: EngineSettings::default(),
    };

    Harness {
        intersector,
        sampler,
        validator,
        publisher,
        limiter,
        ctx,
    }
}
