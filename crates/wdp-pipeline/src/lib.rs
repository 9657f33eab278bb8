//! WDP Pipeline Library
//!
//! Incremental ETL pipeline moving current weather observations from the
//! OpenWeatherMap API into a durable raw store, then into an analytical
//! store, with a final validation gate that classifies run health.
//!
//! # Overview
//!
//! One run is strictly linear:
//!
//! - **ingest**: fetch one observation per configured city and upsert it
//!   into the raw store keyed by `(provider_city_id, observation_epoch)`
//! - **etl**: extract raw documents updated since the watermark (minus an
//!   overlap buffer), transform each into a normalized record, and bulk
//!   upsert the batch into the analytical store in one transaction
//! - **validate**: aggregate the stage summaries into threshold checks and
//!   a pipeline status verdict
//!
//! Stage summaries are published to the run-scoped result channel
//! (`wdp_common::channel`) so external monitors can read them by
//! `(run_id, slot)`.
//!
//! Scheduling, retries, and watermark persistence belong to the external
//! scheduler; the pipeline only consumes a [`wdp_common::types::RunContext`].

pub mod config;
pub mod etl;
pub mod ingest;
pub mod models;
pub mod raw_store;
pub mod runner;
pub mod source;
pub mod transform;
pub mod validate;
pub mod warehouse;

pub use config::PipelineConfig;
pub use etl::{extraction_since, EtlStage};
pub use ingest::RawIngestor;
pub use models::{NaturalKey, NormalizedRecord, ProviderPayload, RawObservation};
pub use raw_store::{RawStore, UpsertOutcome};
pub use runner::{PipelineRunner, RunOutcome, RunState};
pub use source::WeatherClient;
pub use transform::{transform_batch, transform_observation, TransformOutcome};
pub use validate::Validator;
pub use warehouse::Warehouse;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Error types for the weather pipeline
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Source request error: {0}")]
    Source(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed provider payload: {0}")]
    MalformedPayload(String),

    #[error("All {attempted} configured cities failed to ingest")]
    AllSourcesUnavailable { attempted: usize },

    #[error("Pipeline validation failed: {0}")]
    ValidationFailed(String),

    #[error("Result channel error: {0}")]
    Channel(#[from] wdp_common::WdpError),

    #[error("Configuration error: {0}")]
    Config(String),
}
