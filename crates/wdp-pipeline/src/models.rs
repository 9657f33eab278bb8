//! Pipeline data models
//!
//! Schema types for the three shapes a weather observation takes on its way
//! through the pipeline: the raw store row ([`RawObservation`]), the
//! deserialized provider payload validated at the transform boundary
//! ([`ProviderPayload`]), and the flattened analytical record
//! ([`NormalizedRecord`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Natural composite key deduplicating raw observations.
///
/// `provider_city_id` is the provider's numeric city id, `observation_epoch`
/// the observation instant in Unix epoch seconds. Exactly one raw document
/// exists per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    pub provider_city_id: i64,
    pub observation_epoch: i64,
}

impl NaturalKey {
    /// Derive the key from a provider payload, if both fields are present.
    pub fn from_payload(payload: &serde_json::Value) -> Option<Self> {
        Some(Self {
            provider_city_id: payload.get("id")?.as_i64()?,
            observation_epoch: payload.get("dt")?.as_i64()?,
        })
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.provider_city_id, self.observation_epoch)
    }
}

/// One stored raw observation: the provider payload plus stamped metadata.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawObservation {
    pub provider_city_id: i64,
    pub observation_epoch: i64,
    /// City name derived from the payload at ingestion time
    pub city: Option<String>,
    pub payload: serde_json::Value,
    /// When this document first entered the raw store
    pub ingested_at: DateTime<Utc>,
    /// Refreshed on every upsert; drives incremental extraction
    pub updated_at: DateTime<Utc>,
}

impl RawObservation {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            provider_city_id: self.provider_city_id,
            observation_epoch: self.observation_epoch,
        }
    }
}

// ============================================================================
// Provider Payload Schema
// ============================================================================

/// Deserialized view of the provider's current-weather response.
///
/// Every nested group is optional and defaulting so a partially populated
/// payload degrades individual fields rather than failing the document.
/// A structurally mismatched payload (wrong JSON type for a group) is a
/// per-document transform failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderPayload {
    pub id: Option<i64>,
    pub dt: Option<i64>,
    pub name: Option<String>,
    #[serde(default)]
    pub coord: Coord,
    #[serde(default)]
    pub main: MainReadings,
    #[serde(default)]
    pub wind: Wind,
    #[serde(default)]
    pub clouds: Clouds,
    #[serde(default)]
    pub rain: Precipitation,
    #[serde(default)]
    pub snow: Precipitation,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
    #[serde(default)]
    pub sys: SysInfo,
    pub visibility: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Coord {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct MainReadings {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Clouds {
    pub all: Option<f64>,
}

/// Precipitation volume; the provider reports it under the `1h` key.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Precipitation {
    #[serde(rename = "1h")]
    pub one_hour: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeatherCondition {
    pub main: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SysInfo {
    pub country: Option<String>,
}

// ============================================================================
// Normalized Record
// ============================================================================

/// Flattened analytical record, keyed by `(city, observed_at)`.
///
/// Non-key fields are nullable; absent precipitation defaults to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub city: Option<String>,
    pub country: Option<String>,
    /// Observation instant, converted from the provider's epoch seconds
    pub observed_at: DateTime<Utc>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub temp_c: Option<f64>,
    pub feels_like_c: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub wind_speed_ms: Option<f64>,
    pub wind_deg: Option<f64>,
    pub cloud_pct: Option<f64>,
    pub visibility_m: Option<f64>,
    pub rain_1h_mm: f64,
    pub snow_1h_mm: f64,
    pub condition_main: Option<String>,
    pub condition_description: Option<String>,
    /// Load timestamp stamped at transform time
    pub ingested_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_natural_key_from_payload() {
        let payload = json!({"id": 184745, "dt": 1754550000, "name": "Nairobi"});
        let key = NaturalKey::from_payload(&payload).unwrap();
        assert_eq!(key.provider_city_id, 184745);
        assert_eq!(key.observation_epoch, 1754550000);
        assert_eq!(key.to_string(), "184745@1754550000");
    }

    #[test]
    fn test_natural_key_requires_both_fields() {
        assert!(NaturalKey::from_payload(&json!({"id": 184745})).is_none());
        assert!(NaturalKey::from_payload(&json!({"dt": 1754550000})).is_none());
        assert!(NaturalKey::from_payload(&json!({"id": "184745", "dt": 1754550000})).is_none());
    }

    #[test]
    fn test_provider_payload_defaults() {
        let payload: ProviderPayload =
            serde_json::from_value(json!({"id": 1, "dt": 2, "name": "Lagos"})).unwrap();
        assert_eq!(payload.coord.lat, None);
        assert_eq!(payload.rain.one_hour, None);
        assert!(payload.weather.is_empty());
        assert_eq!(payload.sys.country, None);
    }

    #[test]
    fn test_precipitation_one_hour_key() {
        let rain: Precipitation = serde_json::from_value(json!({"1h": 0.38})).unwrap();
        assert_eq!(rain.one_hour, Some(0.38));
    }
}
