//! Token bucket rate limiter for validator calls
//!
//! Built on `tokio::time`, so tests can run it under paused time and
//! auto-advance instead of sleeping for real.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::domain::ports::{RateLimiter, RateLimiterFactory};

/// Token bucket rate limiter
///
/// Implements the token bucket algorithm for rate limiting API requests.
/// Tokens are refilled continuously based on elapsed time.
///
/// # Algorithm
/// - Capacity: Maximum number of tokens (burst capacity)
/// - Refill rate: Tokens added per second
/// - On acquire: Wait until at least 1 token is available, then consume it
/// - Refill: Tokens = min(tokens + elapsed_seconds * refill_rate, capacity)
#[derive(Clone)]
pub struct TokenBucketRateLimiter {
    /// Current number of tokens and the instant they were last refilled
    state: Arc<Mutex<BucketState>>,

    /// Maximum number of tokens (burst capacity)
    capacity: f64,

    /// Tokens added per second
    refill_rate: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucketRateLimiter {
    /// Create a new token bucket rate limiter
    ///
    /// # Arguments
    /// * `requests_per_second` - Sustained request rate (refill rate)
    /// * `capacity` - Burst capacity; the bucket starts full
    pub fn new(requests_per_second: f64, capacity: u32) -> Self {
        assert!(requests_per_second > 0.0, "requests_per_second must be positive");
        assert!(capacity > 0, "capacity must be at least 1");

        let capacity = f64::from(capacity);
        Self {
            state: Arc::new(Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            })),
            capacity,
            refill_rate: requests_per_second,
        }
    }

    /// A bucket of one token refilled every `interval`: the first call
    /// passes at once and later calls are spaced at least `interval` apart.
    pub fn with_min_interval(interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self::new(1.0 / interval.as_secs_f64(), 1)
    }

    /// Acquire a token, waiting if necessary
    pub async fn acquire_token(&self) {
        loop {
            let mut state = self.state.lock().await;

            // Refill tokens based on elapsed time
            let now = Instant::now();
            let elapsed = now.duration_since(state.last_refill).as_secs_f64();
            let new_tokens = elapsed.mul_add(self.refill_rate, state.tokens).min(self.capacity);

            if new_tokens >= 1.0 {
                state.tokens = new_tokens - 1.0;
                state.last_refill = now;
                return;
            }

            // Calculate how long to wait until next token is available
            let tokens_needed = 1.0 - new_tokens;
            let wait_duration =
                Duration::from_secs_f64(tokens_needed / self.refill_rate).max(Duration::from_millis(1));

            // Release the lock before sleeping
            drop(state);
            sleep(wait_duration).await;
        }
    }

    /// Get current number of available tokens (for testing/monitoring)
    pub async fn available_tokens(&self) -> f64 {
        let state = self.state.lock().await;
        let elapsed = Instant::now().duration_since(state.last_refill).as_secs_f64();
        elapsed.mul_add(self.refill_rate, state.tokens).min(self.capacity)
    }
}

#[async_trait]
impl RateLimiter for TokenBucketRateLimiter {
    async fn acquire(&self) {
        self.acquire_token().await;
    }
}

/// Hands each job its own minimum-interval limiter.
#[derive(Debug, Clone)]
pub struct MinIntervalLimiterFactory {
    interval: Duration,
}

impl MinIntervalLimiterFactory {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl RateLimiterFactory for MinIntervalLimiterFactory {
    fn create(&self) -> Box<dyn RateLimiter> {
        Box::new(TokenBucketRateLimiter::with_min_interval(self.interval))
    }
}
