//! Pipeline validation stage
//!
//! Aggregates the stage summaries published on the result channel into
//! success-rate checks against the configured thresholds and derives the
//! run's health verdict. A failing check downgrades the verdict to
//! `degraded`; only the reserved `failed` verdict escalates to a fatal
//! validation error.

use tracing::{info, warn};
use uuid::Uuid;
use wdp_common::channel::{ResultChannel, Slot};
use wdp_common::types::{
    CheckStatus, EtlSummary, IngestionSummary, PipelineStatus, ValidationCheck, ValidationReport,
};

use crate::config::ValidationConfig;
use crate::{PipelineError, Result};

/// Name of the ingestion success-rate check
pub const INGESTION_CHECK: &str = "ingestion_success_rate";

/// Name of the transformation success-rate check
pub const TRANSFORM_CHECK: &str = "transformation_success_rate";

/// Validation stage
pub struct Validator {
    thresholds: ValidationConfig,
}

impl Validator {
    pub fn new(thresholds: ValidationConfig) -> Self {
        Self { thresholds }
    }

    /// Derive the validation report from whichever summaries are present.
    ///
    /// The transform check is omitted entirely when nothing was fetched,
    /// rather than producing a false pass or fail.
    pub fn validate(
        &self,
        ingestion: Option<&IngestionSummary>,
        etl: Option<&EtlSummary>,
    ) -> ValidationReport {
        let mut report = ValidationReport {
            pipeline_status: PipelineStatus::Success,
            checks: Vec::new(),
        };

        if let Some(rate) = ingestion.and_then(IngestionSummary::success_rate_pct) {
            self.push_check(
                &mut report,
                INGESTION_CHECK,
                rate,
                self.thresholds.min_ingestion_success_pct,
            );
        }

        if let Some(rate) = etl.and_then(EtlSummary::transform_rate_pct) {
            self.push_check(
                &mut report,
                TRANSFORM_CHECK,
                rate,
                self.thresholds.min_transform_success_pct,
            );
        }

        report
    }

    /// Validation stage entry point: read the stage summaries for this run
    /// from the channel, publish the report, and escalate a fatal verdict.
    pub fn run_validation(
        &self,
        channel: &ResultChannel,
        run_id: Uuid,
    ) -> Result<ValidationReport> {
        let ingestion: Option<IngestionSummary> =
            channel.fetch(run_id, Slot::IngestionResults)?;
        let etl: Option<EtlSummary> = channel.fetch(run_id, Slot::EtlSummary)?;

        let report = self.validate(ingestion.as_ref(), etl.as_ref());

        info!(
            run_id = %run_id,
            status = %report.pipeline_status,
            checks = report.checks.len(),
            "Pipeline validation complete"
        );

        channel.publish(run_id, Slot::ValidationResults, &report)?;

        if report.is_fatal() {
            return Err(PipelineError::ValidationFailed(format!(
                "pipeline status is '{}'",
                report.pipeline_status
            )));
        }

        Ok(report)
    }

    fn push_check(
        &self,
        report: &mut ValidationReport,
        name: &str,
        rate: f64,
        threshold: f64,
    ) {
        let status = if rate >= threshold {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        };

        if status == CheckStatus::Fail {
            warn!(check = name, value = rate, threshold, "Validation check failed");
            report.pipeline_status = PipelineStatus::Degraded;
        }

        report.checks.push(ValidationCheck {
            name: name.to_string(),
            value: rate,
            status,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(ValidationConfig {
            min_ingestion_success_pct: 75.0,
            min_transform_success_pct: 90.0,
        })
    }

    fn ingestion(successful: u32, total: u32) -> IngestionSummary {
        IngestionSummary {
            successful,
            failed: total - successful,
            total,
        }
    }

    fn etl(transformed: u32, fetched: u32) -> EtlSummary {
        EtlSummary {
            fetched,
            transformed,
            loaded: transformed,
            failed: fetched - transformed,
        }
    }

    #[test]
    fn test_rate_at_threshold_passes() {
        let report = validator().validate(Some(&ingestion(3, 4)), None);

        assert_eq!(report.pipeline_status, PipelineStatus::Success);
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].name, INGESTION_CHECK);
        assert_eq!(report.checks[0].value, 75.0);
        assert_eq!(report.checks[0].status, CheckStatus::Pass);
    }

    #[test]
    fn test_rate_below_threshold_degrades() {
        let report = validator().validate(Some(&ingestion(2, 4)), None);

        assert_eq!(report.pipeline_status, PipelineStatus::Degraded);
        assert_eq!(report.checks[0].value, 50.0);
        assert_eq!(report.checks[0].status, CheckStatus::Fail);
    }

    #[test]
    fn test_transform_check_omitted_when_nothing_fetched() {
        let report = validator().validate(Some(&ingestion(4, 4)), Some(&etl(0, 0)));

        assert_eq!(report.pipeline_status, PipelineStatus::Success);
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].name, INGESTION_CHECK);
    }

    #[test]
    fn test_transform_threshold() {
        let passing = validator().validate(None, Some(&etl(9, 10)));
        assert_eq!(passing.pipeline_status, PipelineStatus::Success);
        assert_eq!(passing.checks[0].value, 90.0);

        let failing = validator().validate(None, Some(&etl(8, 10)));
        assert_eq!(failing.pipeline_status, PipelineStatus::Degraded);
        assert_eq!(failing.checks[0].status, CheckStatus::Fail);
    }

    #[test]
    fn test_no_summaries_yield_empty_success_report() {
        let report = validator().validate(None, None);
        assert_eq!(report.pipeline_status, PipelineStatus::Success);
        assert!(report.checks.is_empty());
    }

    #[test]
    fn test_degraded_is_not_fatal() {
        let report = validator().validate(Some(&ingestion(1, 4)), None);
        assert!(!report.is_fatal());
    }

    #[test]
    fn test_stage_entry_publishes_report() {
        let channel = ResultChannel::new();
        let run_id = Uuid::new_v4();
        channel
            .publish(run_id, Slot::IngestionResults, &ingestion(4, 5))
            .unwrap();
        channel
            .publish(run_id, Slot::EtlSummary, &etl(5, 5))
            .unwrap();

        let report = validator().run_validation(&channel, run_id).unwrap();
        assert_eq!(report.pipeline_status, PipelineStatus::Success);
        assert_eq!(report.checks.len(), 2);

        let published: Option<ValidationReport> =
            channel.fetch(run_id, Slot::ValidationResults).unwrap();
        assert_eq!(published, Some(report));
    }
}
