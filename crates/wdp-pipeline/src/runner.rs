//! Pipeline run coordination
//!
//! Sequences ingest, extract/transform/load, and validation for one run,
//! publishing each stage's summary to the result channel and tracking the
//! per-run state machine:
//!
//! `Idle -> Ingesting -> Extracting -> Transforming -> Loading -> Validating
//! -> {Done | Failed}`
//!
//! Any fatal condition while ingesting or loading moves the run straight to
//! `Failed`, skipping later stages. Validation always runs when loading
//! completed, even with zero records.

use tracing::{debug, error, info};
use wdp_common::channel::{ResultChannel, Slot};
use wdp_common::types::{EtlSummary, IngestionSummary, PipelineStatus, RunContext, ValidationReport};

use crate::config::PipelineConfig;
use crate::etl::{extraction_since, EtlStage};
use crate::ingest::RawIngestor;
use crate::raw_store::RawStore;
use crate::source::WeatherClient;
use crate::validate::Validator;
use crate::warehouse::Warehouse;
use crate::Result;

/// Per-run pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Ingesting,
    Extracting,
    Transforming,
    Loading,
    Validating,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Ingesting => "ingesting",
            RunState::Extracting => "extracting",
            RunState::Transforming => "transforming",
            RunState::Loading => "loading",
            RunState::Validating => "validating",
            RunState::Done => "done",
            RunState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final result of one completed run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: PipelineStatus,
    pub ingestion: IngestionSummary,
    pub etl: EtlSummary,
    pub report: ValidationReport,
}

/// Sequences one pipeline run over both stores
pub struct PipelineRunner {
    config: PipelineConfig,
    ingestor: RawIngestor,
    etl: EtlStage,
    validator: Validator,
    channel: ResultChannel,
    state: RunState,
}

impl PipelineRunner {
    /// Connect run-scoped store pools and build every stage.
    ///
    /// Pools are released when the runner is dropped, on every exit path.
    pub async fn connect(config: PipelineConfig, channel: ResultChannel) -> Result<Self> {
        let source = WeatherClient::new(config.source.clone())?;
        let raw_store = RawStore::connect(&config.raw_store).await?;
        let warehouse = Warehouse::connect(&config.warehouse).await?;

        Ok(Self::new(config, source, raw_store, warehouse, channel))
    }

    /// Build a runner over existing store handles
    pub fn new(
        config: PipelineConfig,
        source: WeatherClient,
        raw_store: RawStore,
        warehouse: Warehouse,
        channel: ResultChannel,
    ) -> Self {
        let ingestor = RawIngestor::new(source, raw_store.clone(), config.cities.clone());
        let etl = EtlStage::new(raw_store, warehouse);
        let validator = Validator::new(config.validation.clone());

        Self {
            config,
            ingestor,
            etl,
            validator,
            channel,
            state: RunState::Idle,
        }
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// The channel stages publish their summaries to
    pub fn channel(&self) -> &ResultChannel {
        &self.channel
    }

    /// Execute one full run.
    ///
    /// `Ok` means the run is `Done` (status success or degraded); any fatal
    /// stage error moves the run to `Failed` and propagates to the invoker.
    pub async fn run(&mut self, ctx: &RunContext) -> Result<RunOutcome> {
        info!(
            run_id = %ctx.run_id,
            run_timestamp = %ctx.run_timestamp,
            previous_watermark = %ctx.previous_watermark,
            "Starting pipeline run"
        );

        match self.execute(ctx).await {
            Ok(outcome) => {
                self.transition(RunState::Done);
                info!(run_id = %ctx.run_id, status = %outcome.status, "Pipeline run complete");
                Ok(outcome)
            }
            Err(e) => {
                self.transition(RunState::Failed);
                error!(run_id = %ctx.run_id, error = %e, "Pipeline run failed");
                Err(e)
            }
        }
    }

    async fn execute(&mut self, ctx: &RunContext) -> Result<RunOutcome> {
        self.transition(RunState::Ingesting);
        self.ingestor.prepare().await?;
        let ingestion = self.ingestor.ingest_all(ctx).await?;
        self.channel
            .publish(ctx.run_id, Slot::IngestionResults, &ingestion)?;

        self.transition(RunState::Extracting);
        let since = extraction_since(ctx.previous_watermark, self.config.etl.overlap_buffer());
        let documents = self.etl.extract(since).await?;

        self.transition(RunState::Transforming);
        let outcome = self.etl.transform(&documents);

        self.transition(RunState::Loading);
        let loaded = self.etl.load(&outcome.records).await?;

        let etl_summary = EtlSummary {
            fetched: documents.len() as u32,
            transformed: outcome.records.len() as u32,
            loaded: loaded as u32,
            failed: outcome.failed,
        };
        self.channel
            .publish(ctx.run_id, Slot::EtlSummary, &etl_summary)?;

        self.transition(RunState::Validating);
        let report = self.validator.run_validation(&self.channel, ctx.run_id)?;

        Ok(RunOutcome {
            status: report.pipeline_status,
            ingestion,
            etl: etl_summary,
            report,
        })
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_state_names() {
        assert_eq!(RunState::Idle.as_str(), "idle");
        assert_eq!(RunState::Validating.as_str(), "validating");
        assert_eq!(RunState::Failed.to_string(), "failed");
    }

    #[tokio::test]
    async fn test_runner_starts_idle() {
        let config = PipelineConfig::default();
        let mut source_config = config.source.clone();
        source_config.api_key = "test-key".to_string();

        let source = WeatherClient::new(source_config).unwrap();
        let raw_store = RawStore::new(sqlx::PgPool::connect_lazy(&config.raw_store.url).unwrap());
        let warehouse = Warehouse::new(sqlx::PgPool::connect_lazy(&config.warehouse.url).unwrap());

        let runner = PipelineRunner::new(
            config,
            source,
            raw_store,
            warehouse,
            ResultChannel::new(),
        );
        assert_eq!(runner.state(), RunState::Idle);
    }
}
