use thiserror::Error;

/// Errors that can occur when calling the OS Places API.
///
/// These never leave the validator: every variant collapses to a `None`
/// result for the candidate being checked.
#[derive(Error, Debug)]
pub enum PlacesApiError {
    /// Malformed request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing, invalid or unauthorized API key
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The identifier is unknown to the service
    #[error("Not found")]
    NotFound,

    /// Rate limit exceeded at the service
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Service returned a 5xx response
    #[error("API server error: {0}")]
    ServerError(String),

    /// Network error occurred during request
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Response body did not match the expected schema
    #[error("JSON deserialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out waiting for response
    #[error("Timeout waiting for response")]
    Timeout,

    /// Unexpected status code
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl PlacesApiError {
    /// Returns true if a later call for the same identifier could succeed.
    ///
    /// ```
    /// use address_sampler::infrastructure::places::PlacesApiError;
    ///
    /// assert!(PlacesApiError::RateLimitExceeded.is_transient());
    /// assert!(!PlacesApiError::NotFound.is_transient());
    /// ```
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExceeded | Self::ServerError(_) | Self::Timeout
        )
    }

    /// Map an HTTP status code and response body to an error variant.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            400 => Self::InvalidRequest(body),
            401 | 403 => Self::AuthenticationFailed(body),
            404 => Self::NotFound,
            429 => Self::RateLimitExceeded,
            500..=599 => Self::ServerError(body),
            _ => Self::Unknown(format!("HTTP {status}: {body}")),
        }
    }

    /// Classify a transport error, separating timeouts from other failures.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }
}
