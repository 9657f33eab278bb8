//! Raw ingestion stage
//!
//! Sequential fold over the configured cities: fetch one observation per
//! city and upsert it into the raw store. Each city is its own failure
//! domain; one failed fetch or upsert is tallied and never stops the rest.
//! Only the total-failure case escalates to a fatal stage error.

use tracing::{info, warn};
use wdp_common::types::{CityTarget, IngestionSummary, RunContext};

use crate::models::NaturalKey;
use crate::raw_store::{RawStore, UpsertOutcome};
use crate::source::WeatherClient;
use crate::{PipelineError, Result};

/// Raw ingestion stage: provider fetch + natural-key upsert per city
pub struct RawIngestor {
    source: WeatherClient,
    store: RawStore,
    cities: Vec<CityTarget>,
}

impl RawIngestor {
    pub fn new(source: WeatherClient, store: RawStore, cities: Vec<CityTarget>) -> Self {
        Self {
            source,
            store,
            cities,
        }
    }

    /// Set up the raw store schema and indexes this stage writes through.
    ///
    /// The ingest side owns the natural-key constraint; a failure here is
    /// fatal before any city is attempted.
    pub async fn prepare(&self) -> Result<()> {
        self.store.ensure_schema().await
    }

    /// Fetch and upsert observations for every configured city.
    ///
    /// Returns the tally even when some cities failed; raises
    /// [`PipelineError::AllSourcesUnavailable`] only when every city failed.
    pub async fn ingest_all(&self, ctx: &RunContext) -> Result<IngestionSummary> {
        let mut summary = IngestionSummary {
            total: self.cities.len() as u32,
            ..Default::default()
        };

        for target in &self.cities {
            match self.ingest_city(target).await {
                Ok(outcome) => {
                    summary.successful += 1;
                    info!(
                        run_id = %ctx.run_id,
                        city = %target,
                        outcome = outcome.as_str(),
                        "Raw observation upserted"
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!(run_id = %ctx.run_id, city = %target, error = %e, "Failed to ingest city");
                }
            }
        }

        if summary.successful == 0 && summary.total > 0 {
            return Err(PipelineError::AllSourcesUnavailable {
                attempted: summary.total as usize,
            });
        }

        info!(
            run_id = %ctx.run_id,
            successful = summary.successful,
            failed = summary.failed,
            total = summary.total,
            "Ingestion complete"
        );

        Ok(summary)
    }

    /// Fetch and upsert one city's observation
    async fn ingest_city(&self, target: &CityTarget) -> Result<UpsertOutcome> {
        let payload = self.source.fetch_current(target).await?;

        // A payload without the key fields cannot be deduplicated, so it is
        // never stored.
        let key = NaturalKey::from_payload(&payload).ok_or_else(|| {
            PipelineError::MalformedPayload(format!(
                "payload for {} is missing 'id' or 'dt'",
                target
            ))
        })?;

        let city = payload
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        self.store
            .upsert_observation(key, city.as_deref(), &payload)
            .await
    }
}
