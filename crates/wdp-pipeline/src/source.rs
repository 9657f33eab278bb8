//! Provider source client
//!
//! One bounded-timeout HTTP request per city against the OpenWeatherMap
//! current-weather endpoint. The client carries no state between requests;
//! a failed fetch is attributable to that single city and is never raised
//! as a pipeline-wide fault by itself.

use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use wdp_common::types::CityTarget;

use crate::config::SourceConfig;
use crate::{PipelineError, Result};

const USER_AGENT: &str = concat!("wdp-pipeline/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the current-weather provider API
pub struct WeatherClient {
    client: Client,
    config: SourceConfig,
}

impl WeatherClient {
    /// Create a new client with configuration
    pub fn new(config: SourceConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(PipelineError::Config(
                "Source base URL cannot be empty".to_string(),
            ));
        }

        if config.api_key.is_empty() {
            return Err(PipelineError::Config(
                "OPENWEATHER_API_KEY is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(WeatherClient { client, config })
    }

    /// Fetch the current observation payload for one city.
    ///
    /// Transport failures and non-2xx responses surface as a source error
    /// for this city only.
    pub async fn fetch_current(&self, target: &CityTarget) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("q", format!("{},{}", target.city, target.country)),
                ("appid", self.config.api_key.clone()),
                ("units", self.config.units.clone()),
            ])
            .send()
            .await?;

        let payload = response
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        debug!(city = %target, "Fetched current observation");

        Ok(payload)
    }

    /// Get client configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> SourceConfig {
        SourceConfig {
            base_url: "http://localhost:9/weather".to_string(),
            api_key: "test-key".to_string(),
            units: "metric".to_string(),
            timeout_secs: 2,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = WeatherClient::new(test_config());
        assert!(client.is_ok());
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let mut config = test_config();
        config.api_key = String::new();

        let client = WeatherClient::new(config);
        assert!(matches!(client, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_empty_base_url_is_rejected() {
        let mut config = test_config();
        config.base_url = String::new();

        assert!(WeatherClient::new(config).is_err());
    }
}
