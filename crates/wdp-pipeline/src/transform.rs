//! Raw-to-normalized transformation
//!
//! Pure per-document mapping from a stored raw observation to a flattened
//! [`NormalizedRecord`]. The provider payload is validated against the
//! [`ProviderPayload`] schema at this boundary; a structurally malformed
//! document degrades to a single counted failure, never an aborted batch.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::{NormalizedRecord, ProviderPayload, RawObservation};

/// Transform one raw observation, or `None` if its payload is malformed.
pub fn transform_observation(raw: &RawObservation) -> Option<NormalizedRecord> {
    let payload: ProviderPayload = match serde_json::from_value(raw.payload.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(
                key = %raw.natural_key(),
                error = %e,
                "Failed to transform raw observation"
            );
            return None;
        }
    };

    let observed_at = DateTime::from_timestamp(payload.dt.unwrap_or(0), 0)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    let first_condition = payload.weather.first();

    Some(NormalizedRecord {
        city: payload.name,
        country: payload.sys.country,
        observed_at,
        lat: payload.coord.lat,
        lon: payload.coord.lon,
        temp_c: payload.main.temp,
        feels_like_c: payload.main.feels_like,
        pressure_hpa: payload.main.pressure,
        humidity_pct: payload.main.humidity,
        wind_speed_ms: payload.wind.speed,
        wind_deg: payload.wind.deg,
        cloud_pct: payload.clouds.all,
        visibility_m: payload.visibility,
        rain_1h_mm: payload.rain.one_hour.unwrap_or(0.0),
        snow_1h_mm: payload.snow.one_hour.unwrap_or(0.0),
        condition_main: first_condition.and_then(|c| c.main.clone()),
        condition_description: first_condition.and_then(|c| c.description.clone()),
        ingested_at: Utc::now(),
    })
}

/// Result of transforming one extracted batch
#[derive(Debug, Clone, Default)]
pub struct TransformOutcome {
    pub records: Vec<NormalizedRecord>,
    pub failed: u32,
}

/// Transform a batch, isolating per-document failures.
pub fn transform_batch(documents: &[RawObservation]) -> TransformOutcome {
    let mut outcome = TransformOutcome::default();

    for raw in documents {
        match transform_observation(raw) {
            Some(record) => outcome.records.push(record),
            None => outcome.failed += 1,
        }
    }

    outcome
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_with_payload(payload: serde_json::Value) -> RawObservation {
        RawObservation {
            provider_city_id: payload.get("id").and_then(|v| v.as_i64()).unwrap_or(0),
            observation_epoch: payload.get("dt").and_then(|v| v.as_i64()).unwrap_or(0),
            city: payload
                .get("name")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            payload,
            ingested_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn full_payload() -> serde_json::Value {
        json!({
            "id": 184745,
            "dt": 1754550000,
            "name": "Nairobi",
            "coord": {"lat": -1.2833, "lon": 36.8167},
            "main": {"temp": 17.6, "feels_like": 17.2, "pressure": 1021.0, "humidity": 77.0},
            "wind": {"speed": 5.7, "deg": 140.0},
            "clouds": {"all": 40.0},
            "rain": {"1h": 0.25},
            "weather": [{"main": "Rain", "description": "light rain"}],
            "sys": {"country": "KE"},
            "visibility": 10000.0
        })
    }

    #[test]
    fn test_transform_full_payload() {
        let raw = raw_with_payload(full_payload());
        let record = transform_observation(&raw).unwrap();

        assert_eq!(record.city.as_deref(), Some("Nairobi"));
        assert_eq!(record.country.as_deref(), Some("KE"));
        assert_eq!(
            record.observed_at,
            DateTime::from_timestamp(1754550000, 0).unwrap()
        );
        assert_eq!(record.temp_c, Some(17.6));
        assert_eq!(record.rain_1h_mm, 0.25);
        assert_eq!(record.snow_1h_mm, 0.0);
        assert_eq!(record.condition_main.as_deref(), Some("Rain"));
    }

    #[test]
    fn test_transform_defaults_missing_groups() {
        let raw = raw_with_payload(json!({"id": 1, "dt": 1754550000, "name": "Lagos"}));
        let record = transform_observation(&raw).unwrap();

        assert_eq!(record.lat, None);
        assert_eq!(record.temp_c, None);
        assert_eq!(record.rain_1h_mm, 0.0);
        assert_eq!(record.condition_main, None);
        assert_eq!(record.country, None);
    }

    #[test]
    fn test_transform_missing_epoch_defaults_to_unix_epoch() {
        let raw = raw_with_payload(json!({"id": 7, "name": "Cairo"}));
        let record = transform_observation(&raw).unwrap();
        assert_eq!(record.observed_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_malformed_payload_is_isolated() {
        // `main` with the wrong JSON type fails schema validation
        let raw = raw_with_payload(json!({"id": 2, "dt": 3, "main": "not-an-object"}));
        assert!(transform_observation(&raw).is_none());
    }

    #[test]
    fn test_batch_isolates_single_failure() {
        let mut documents: Vec<RawObservation> = (0..9)
            .map(|i| {
                raw_with_payload(json!({
                    "id": i,
                    "dt": 1754550000 + i,
                    "name": format!("City{}", i),
                    "main": {"temp": 20.0}
                }))
            })
            .collect();
        documents.push(raw_with_payload(
            json!({"id": 9, "dt": 1754550009, "weather": "broken"}),
        ));

        let outcome = transform_batch(&documents);
        assert_eq!(outcome.records.len(), 9);
        assert_eq!(outcome.failed, 1);
    }
}
