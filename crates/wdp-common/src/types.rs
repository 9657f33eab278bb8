//! Common types used across WDP
//!
//! Run context, per-stage summaries, and the validation report exchanged
//! between pipeline stages and external monitors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WdpError;

/// Per-run invocation context supplied by the external scheduler.
///
/// The core consumes the previous watermark; persisting it between runs is
/// the scheduler's responsibility.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RunContext {
    /// Unique identifier for this run, used to key the result channel
    pub run_id: Uuid,

    /// Nominal start instant of this run
    pub run_timestamp: DateTime<Utc>,

    /// Instant up to which prior runs already processed raw documents
    pub previous_watermark: DateTime<Utc>,
}

impl RunContext {
    /// Create a context for a run starting now
    pub fn new(previous_watermark: DateTime<Utc>) -> Self {
        Self::with_timestamp(Utc::now(), previous_watermark)
    }

    /// Create a context with an explicit run timestamp
    pub fn with_timestamp(run_timestamp: DateTime<Utc>, previous_watermark: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            run_timestamp,
            previous_watermark,
        }
    }
}

/// One city to fetch observations for, identified the way the provider
/// expects (`{city},{ISO country code}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityTarget {
    pub city: String,
    pub country: String,
}

impl CityTarget {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            country: country.into(),
        }
    }
}

impl std::str::FromStr for CityTarget {
    type Err = WdpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (city, country) = s.split_once(',').ok_or_else(|| {
            WdpError::Config(format!(
                "Invalid city target '{}': expected 'City,CC' format",
                s
            ))
        })?;

        let city = city.trim();
        let country = country.trim();
        if city.is_empty() || country.is_empty() {
            return Err(WdpError::Config(format!(
                "Invalid city target '{}': city and country must be non-empty",
                s
            )));
        }

        Ok(CityTarget::new(city, country))
    }
}

impl std::fmt::Display for CityTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.city, self.country)
    }
}

// ============================================================================
// Stage Summaries
// ============================================================================

/// Outcome tally of the raw ingestion stage for one run.
///
/// Created fresh per run and immutable once returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionSummary {
    pub successful: u32,
    pub failed: u32,
    pub total: u32,
}

impl IngestionSummary {
    /// Success rate in percent, or `None` when no cities were configured
    pub fn success_rate_pct(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(f64::from(self.successful) / f64::from(self.total) * 100.0)
    }
}

/// Outcome tally of the extract/transform/load stage for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtlSummary {
    /// Raw documents matched by the incremental extraction query
    pub fetched: u32,
    /// Documents successfully transformed into normalized records
    pub transformed: u32,
    /// Records committed to the analytical store
    pub loaded: u32,
    /// Documents that failed transformation
    pub failed: u32,
}

impl EtlSummary {
    /// Transform success rate in percent, or `None` when nothing was fetched
    pub fn transform_rate_pct(&self) -> Option<f64> {
        if self.fetched == 0 {
            return None;
        }
        Some(f64::from(self.transformed) / f64::from(self.fetched) * 100.0)
    }
}

// ============================================================================
// Validation Report
// ============================================================================

/// Pass/fail verdict for one validation check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
        }
    }
}

/// Overall health verdict of one pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// All checks passed
    Success,
    /// At least one threshold check failed; the run still completed
    Degraded,
    /// Reserved for conditions more severe than a threshold miss
    Failed,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Success => "success",
            PipelineStatus::Degraded => "degraded",
            PipelineStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named check with its measured value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub value: f64,
    pub status: CheckStatus,
}

/// Deterministic health classification of one run, derived from the stage
/// summaries. Reported, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub pipeline_status: PipelineStatus,
    pub checks: Vec<ValidationCheck>,
}

impl ValidationReport {
    /// Whether this report must escalate to a fatal validation error
    pub fn is_fatal(&self) -> bool {
        self.pipeline_status == PipelineStatus::Failed
    }
}
