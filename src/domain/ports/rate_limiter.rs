use async_trait::async_trait;

/// Gate placed in front of every validator call within a job.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until the next call is permitted.
    async fn acquire(&self);
}

/// Builds a fresh limiter for each job so jobs never share a budget.
pub trait RateLimiterFactory: Send + Sync {
    fn create(&self) -> Box<dyn RateLimiter>;
}
