//! Pipeline configuration
//!
//! An immutable [`PipelineConfig`] is constructed once per run from the
//! environment and passed into every stage; no stage reads process-wide
//! mutable configuration.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use wdp_common::types::CityTarget;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default OpenWeatherMap current-weather endpoint.
pub const DEFAULT_SOURCE_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Default per-request timeout for provider fetches, in seconds.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 10;

/// Default measurement units requested from the provider.
pub const DEFAULT_SOURCE_UNITS: &str = "metric";

/// Default raw store URL for local development.
pub const DEFAULT_RAW_DATABASE_URL: &str = "postgresql://localhost/wdp";

/// Default analytical store URL for local development.
pub const DEFAULT_WAREHOUSE_DATABASE_URL: &str = "postgresql://localhost/wdp";

/// Default maximum connections per store pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default city list, `City,CC` entries separated by `;`.
pub const DEFAULT_CITIES: &str = "Nairobi,KE;London,GB;New York,US;Singapore,SG;Rotterdam,NL";

/// Default overlap buffer subtracted from the watermark, in minutes.
///
/// Sized against a 15-minute run cadence: the buffer absorbs clock skew and
/// upserts landing just outside the nominal window, at the cost of a bounded
/// amount of re-processing (idempotent downstream).
pub const DEFAULT_OVERLAP_BUFFER_MINS: i64 = 20;

/// Default minimum ingestion success rate, in percent.
pub const DEFAULT_MIN_INGESTION_SUCCESS_PCT: f64 = 75.0;

/// Default minimum transformation success rate, in percent.
pub const DEFAULT_MIN_TRANSFORM_SUCCESS_PCT: f64 = 90.0;

/// Pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub raw_store: StoreConfig,
    pub warehouse: StoreConfig,
    pub cities: Vec<CityTarget>,
    pub etl: EtlConfig,
    pub validation: ValidationConfig,
}

/// Provider API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_key: String,
    pub units: String,
    pub timeout_secs: u64,
}

/// Connection settings for one Postgres store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Incremental extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub overlap_buffer_mins: i64,
}

impl EtlConfig {
    /// Overlap buffer as a duration
    pub fn overlap_buffer(&self) -> Duration {
        Duration::minutes(self.overlap_buffer_mins)
    }
}

/// Validation thresholds, in percent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub min_ingestion_success_pct: f64,
    pub min_transform_success_pct: f64,
}

impl PipelineConfig {
    /// Load configuration from environment and defaults
    ///
    /// Environment variables:
    /// - `WDP_SOURCE_URL`, `OPENWEATHER_API_KEY`, `WDP_SOURCE_UNITS`,
    ///   `WDP_SOURCE_TIMEOUT`
    /// - `WDP_RAW_DATABASE_URL`, `WDP_WAREHOUSE_DATABASE_URL`,
    ///   `WDP_DB_MAX_CONNECTIONS`, `WDP_DB_CONNECT_TIMEOUT`
    /// - `WDP_CITIES` (`City,CC;City,CC` format)
    /// - `WDP_OVERLAP_BUFFER_MINS`
    /// - `WDP_MIN_INGESTION_SUCCESS_PCT`, `WDP_MIN_TRANSFORM_SUCCESS_PCT`
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let cities = parse_cities(
            &std::env::var("WDP_CITIES").unwrap_or_else(|_| DEFAULT_CITIES.to_string()),
        )?;

        let config = PipelineConfig {
            source: SourceConfig {
                base_url: std::env::var("WDP_SOURCE_URL")
                    .unwrap_or_else(|_| DEFAULT_SOURCE_BASE_URL.to_string()),
                api_key: std::env::var("OPENWEATHER_API_KEY").unwrap_or_default(),
                units: std::env::var("WDP_SOURCE_UNITS")
                    .unwrap_or_else(|_| DEFAULT_SOURCE_UNITS.to_string()),
                timeout_secs: std::env::var("WDP_SOURCE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SOURCE_TIMEOUT_SECS),
            },
            raw_store: StoreConfig {
                url: std::env::var("WDP_RAW_DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_RAW_DATABASE_URL.to_string()),
                max_connections: std::env::var("WDP_DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: std::env::var("WDP_DB_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            warehouse: StoreConfig {
                url: std::env::var("WDP_WAREHOUSE_DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_WAREHOUSE_DATABASE_URL.to_string()),
                max_connections: std::env::var("WDP_DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                connect_timeout_secs: std::env::var("WDP_DB_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            cities,
            etl: EtlConfig {
                overlap_buffer_mins: std::env::var("WDP_OVERLAP_BUFFER_MINS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_OVERLAP_BUFFER_MINS),
            },
            validation: ValidationConfig {
                min_ingestion_success_pct: std::env::var("WDP_MIN_INGESTION_SUCCESS_PCT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MIN_INGESTION_SUCCESS_PCT),
                min_transform_success_pct: std::env::var("WDP_MIN_TRANSFORM_SUCCESS_PCT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MIN_TRANSFORM_SUCCESS_PCT),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.source.base_url.is_empty() {
            anyhow::bail!("Source base URL cannot be empty");
        }

        if self.source.timeout_secs == 0 {
            anyhow::bail!("Source timeout must be greater than 0");
        }

        if self.raw_store.url.is_empty() || self.warehouse.url.is_empty() {
            anyhow::bail!("Store URLs cannot be empty");
        }

        if self.raw_store.max_connections == 0 || self.warehouse.max_connections == 0 {
            anyhow::bail!("Store max_connections must be greater than 0");
        }

        if self.cities.is_empty() {
            anyhow::bail!("At least one city target must be configured");
        }

        if self.etl.overlap_buffer_mins < 0 {
            anyhow::bail!("Overlap buffer cannot be negative");
        }

        for threshold in [
            self.validation.min_ingestion_success_pct,
            self.validation.min_transform_success_pct,
        ] {
            if !(0.0..=100.0).contains(&threshold) {
                anyhow::bail!("Validation thresholds must be between 0 and 100");
            }
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                base_url: DEFAULT_SOURCE_BASE_URL.to_string(),
                api_key: String::new(),
                units: DEFAULT_SOURCE_UNITS.to_string(),
                timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
            },
            raw_store: StoreConfig {
                url: DEFAULT_RAW_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            warehouse: StoreConfig {
                url: DEFAULT_WAREHOUSE_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            cities: parse_cities(DEFAULT_CITIES).unwrap_or_default(),
            etl: EtlConfig {
                overlap_buffer_mins: DEFAULT_OVERLAP_BUFFER_MINS,
            },
            validation: ValidationConfig {
                min_ingestion_success_pct: DEFAULT_MIN_INGESTION_SUCCESS_PCT,
                min_transform_success_pct: DEFAULT_MIN_TRANSFORM_SUCCESS_PCT,
            },
        }
    }
}

/// Parse a `City,CC;City,CC` list into city targets
fn parse_cities(raw: &str) -> anyhow::Result<Vec<CityTarget>> {
    raw.split(';')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| {
            entry
                .trim()
                .parse::<CityTarget>()
                .map_err(|e| anyhow::anyhow!("{}", e))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cities() {
        let cities = parse_cities("Nairobi,KE;London,GB; New York,US ;").unwrap();
        assert_eq!(
            cities,
            vec![
                CityTarget::new("Nairobi", "KE"),
                CityTarget::new("London", "GB"),
                CityTarget::new("New York", "US"),
            ]
        );

        assert!(parse_cities("Nairobi").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.etl.overlap_buffer(), Duration::minutes(20));
    }

    #[test]
    fn test_validate_rejects_bad_thresholds() {
        let mut config = PipelineConfig::default();
        config.validation.min_transform_success_pct = 150.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_cities() {
        let mut config = PipelineConfig::default();
        config.cities.clear();
        assert!(config.validate().is_err());
    }
}
