//! Raw store access
//!
//! Postgres-backed raw store holding provider payloads as JSONB, keyed by
//! the natural `(provider_city_id, observation_epoch)` key. Owns the schema
//! and index setup for the raw side, the idempotent natural-key upsert, and
//! the extractor's `updated_at` range query.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;

use crate::config::StoreConfig;
use crate::models::{NaturalKey, RawObservation};
use crate::Result;

/// Raw observations table name
pub const RAW_TABLE: &str = "raw_weather_observations";

/// Whether an upsert created a new document or overwrote an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl UpsertOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertOutcome::Inserted => "inserted",
            UpsertOutcome::Updated => "updated",
        }
    }
}

/// Storage handler for the raw side of the pipeline
#[derive(Debug, Clone)]
pub struct RawStore {
    db: PgPool,
}

impl RawStore {
    /// Create a store over an existing pool
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Connect a run-scoped pool from store configuration
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;

        info!("Raw store connection pool established");

        Ok(Self { db })
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    /// Create the raw table and its indexes (idempotent).
    ///
    /// The unique natural-key constraint enforces one document per
    /// `(provider_city_id, observation_epoch)`; the secondary indexes on
    /// `city` and `updated_at` support monitoring lookups and the
    /// extractor's range query.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS raw_weather_observations (
                id BIGSERIAL PRIMARY KEY,
                provider_city_id BIGINT NOT NULL,
                observation_epoch BIGINT NOT NULL,
                city TEXT,
                payload JSONB NOT NULL,
                ingested_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT raw_weather_natural_key
                    UNIQUE (provider_city_id, observation_epoch)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_raw_weather_city ON raw_weather_observations (city)",
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_raw_weather_updated_at \
             ON raw_weather_observations (updated_at)",
        )
        .execute(&self.db)
        .await?;

        info!("Raw store schema ensured");

        Ok(())
    }

    /// Upsert one payload under its natural key.
    ///
    /// Applying the same payload twice is a no-op beyond refreshing
    /// `updated_at`; the unique constraint guarantees no duplicate document
    /// for the key ever exists.
    pub async fn upsert_observation(
        &self,
        key: NaturalKey,
        city: Option<&str>,
        payload: &serde_json::Value,
    ) -> Result<UpsertOutcome> {
        // xmax = 0 only for rows created by this statement, so it tells a
        // fresh insert apart from a conflict update.
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO raw_weather_observations (
                provider_city_id,
                observation_epoch,
                city,
                payload
            )
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (provider_city_id, observation_epoch)
            DO UPDATE SET
                city = EXCLUDED.city,
                payload = EXCLUDED.payload,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(key.provider_city_id)
        .bind(key.observation_epoch)
        .bind(city)
        .bind(payload)
        .fetch_one(&self.db)
        .await?;

        Ok(if inserted {
            UpsertOutcome::Inserted
        } else {
            UpsertOutcome::Updated
        })
    }

    /// Fetch raw documents updated at or after `since`, ordered by
    /// `updated_at`. An empty result is an empty batch, not an error.
    pub async fn fetch_updated_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<RawObservation>> {
        let documents = sqlx::query_as::<_, RawObservation>(
            r#"
            SELECT provider_city_id, observation_epoch, city, payload, ingested_at, updated_at
            FROM raw_weather_observations
            WHERE updated_at >= $1
            ORDER BY updated_at
            "#,
        )
        .bind(since)
        .fetch_all(&self.db)
        .await?;

        Ok(documents)
    }
}
