use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::errors::PlacesApiError;
use super::types::{DpaRecord, PlacesResponse};
use crate::domain::models::{LocationId, ValidatedAddress, ValidatorConfig};
use crate::domain::ports::AddressValidator;

/// Configuration for the OS Places client
#[derive(Debug, Clone)]
pub struct PlacesClientConfig {
    /// OS Data Hub API key
    pub api_key: String,

    /// Base URL of the places API, without the `/uprn` suffix
    pub base_url: String,

    /// Dataset queried
    pub dataset: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PlacesClientConfig {
    fn default() -> Self {
        Self::from(&ValidatorConfig::default())
    }
}

impl From<&ValidatorConfig> for PlacesClientConfig {
    fn from(config: &ValidatorConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            dataset: config.dataset.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// HTTP client for the OS Places `uprn` lookup.
///
/// Implements [`AddressValidator`]: a lookup either produces a deliverable
/// [`ValidatedAddress`] or nothing. Throttling is left to the caller.
pub struct PlacesClient {
    http_client: ReqwestClient,
    endpoint: String,
    api_key: String,
    dataset: String,
}

impl PlacesClient {
    /// Create a new client.
    ///
    /// # Example
    /// ```no_run
    /// use address_sampler::infrastructure::places::{PlacesClient, PlacesClientConfig};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = PlacesClient::new(PlacesClientConfig::default())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: PlacesClientConfig) -> Result<Self, PlacesApiError> {
        let api_key_scrubbed = if config.api_key.chars().count() > 4 {
            let prefix: String = config.api_key.chars().take(4).collect();
            format!("{prefix}...[REDACTED]")
        } else {
            "[REDACTED]".to_string()
        };

        info!(
            base_url = %config.base_url,
            dataset = %config.dataset,
            timeout_secs = config.timeout_secs,
            api_key = %api_key_scrubbed,
            "Initializing OS Places client"
        );

        let http_client = ReqwestClient::builder()
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(config.timeout_secs))
            .tcp_nodelay(true)
            .build()
            .map_err(PlacesApiError::NetworkError)?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/uprn", config.base_url.trim_end_matches('/')),
            api_key: config.api_key,
            dataset: config.dataset,
        })
    }

    /// Fetch the DPA record for `id`, if the service has one.
    pub async fn lookup(&self, id: &LocationId) -> Result<Option<DpaRecord>, PlacesApiError> {
        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[
                ("uprn", id.as_str()),
                ("key", self.api_key.as_str()),
                ("dataset", self.dataset.as_str()),
                ("format", "JSON"),
                ("output_srs", "WGS84"),
            ])
            .send()
            .await
            .map_err(PlacesApiError::from_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlacesApiError::from_status(status, body));
        }

        let body = response
            .text()
            .await
            .map_err(PlacesApiError::from_transport)?;
        let parsed: PlacesResponse = serde_json::from_str(&body)?;
        Ok(parsed.first_dpa())
    }
}

#[async_trait]
impl AddressValidator for PlacesClient {
    async fn validate(&self, id: &LocationId) -> Option<ValidatedAddress> {
        let record = match self.lookup(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(uprn = %id, "No DPA record");
                return None;
            }
            Err(err) => {
                warn!(uprn = %id, transient = err.is_transient(), error = %err, "Places lookup failed");
                return None;
            }
        };

        match record.into_validated(id) {
            Ok(address) => {
                debug!(uprn = %id, postcode = %address.address.postcode, "Deliverable address");
                Some(address)
            }
            Err(rejection) => {
                debug!(uprn = %id, reason = %rejection, "Rejected");
                None
            }
        }
    }
}
