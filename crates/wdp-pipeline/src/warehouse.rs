//! Analytical store loader
//!
//! Single transactional bulk upsert of normalized records into the
//! `weather_observations` table, keyed by `(city, observed_at)`. The whole
//! batch commits or the whole batch rolls back; there is no partial commit
//! within one load call.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::info;

use crate::config::StoreConfig;
use crate::models::NormalizedRecord;
use crate::Result;

/// Analytical observations table name
pub const WAREHOUSE_TABLE: &str = "weather_observations";

/// Storage handler for the analytical side of the pipeline
#[derive(Debug, Clone)]
pub struct Warehouse {
    db: PgPool,
}

impl Warehouse {
    /// Create a warehouse over an existing pool
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

        info!("Warehouse connection pool established");

        Ok(Self { db })
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    /// Create the analytical table (idempotent). Key columns are NOT NULL;
    /// a record violating that rolls back its whole batch at load time.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS weather_observations (
                city TEXT NOT NULL,
                country TEXT,
                observed_at TIMESTAMPTZ NOT NULL,
                lat DOUBLE PRECISION,
                lon DOUBLE PRECISION,
                temp_c DOUBLE PRECISION,
                feels_like_c DOUBLE PRECISION,
                pressure_hpa DOUBLE PRECISION,
                humidity_pct DOUBLE PRECISION,
                wind_speed_ms DOUBLE PRECISION,
                wind_deg DOUBLE PRECISION,
                cloud_pct DOUBLE PRECISION,
                visibility_m DOUBLE PRECISION,
                rain_1h_mm DOUBLE PRECISION NOT NULL DEFAULT 0,
                snow_1h_mm DOUBLE PRECISION NOT NULL DEFAULT 0,
                condition_main TEXT,
                condition_description TEXT,
                ingested_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (city, observed_at)
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        info!("Warehouse schema ensured");

        Ok(())
    }

    /// Bulk upsert one batch in a single transaction.
    ///
    /// On key conflict every non-key column is updated to the new values.
    /// Empty input reports zero loaded without touching the database.
    pub async fn bulk_upsert(&self, records: &[NormalizedRecord]) -> Result<usize> {
        if records.is_empty() {
            info!("No records to load into warehouse");
            return Ok(0);
        }

        let mut tx = self.db.begin().await?;

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"
            INSERT INTO weather_observations (
                city, country, observed_at, lat, lon,
                temp_c, feels_like_c, pressure_hpa, humidity_pct,
                wind_speed_ms, wind_deg, cloud_pct, visibility_m,
                rain_1h_mm, snow_1h_mm, condition_main, condition_description,
                ingested_at
            )
            "#,
        );

        query_builder.push_values(records, |mut b, record| {
            b.push_bind(&record.city)
                .push_bind(&record.country)
                .push_bind(record.observed_at)
                .push_bind(record.lat)
                .push_bind(record.lon)
                .push_bind(record.temp_c)
                .push_bind(record.feels_like_c)
                .push_bind(record.pressure_hpa)
                .push_bind(record.humidity_pct)
                .push_bind(record.wind_speed_ms)
                .push_bind(record.wind_deg)
                .push_bind(record.cloud_pct)
                .push_bind(record.visibility_m)
                .push_bind(record.rain_1h_mm)
                .push_bind(record.snow_1h_mm)
                .push_bind(&record.condition_main)
                .push_bind(&record.condition_description)
                .push_bind(record.ingested_at);
        });

        query_builder.push(
            r#"
            ON CONFLICT (city, observed_at)
            DO UPDATE SET
                country = EXCLUDED.country,
                lat = EXCLUDED.lat,
                lon = EXCLUDED.lon,
                temp_c = EXCLUDED.temp_c,
                feels_like_c = EXCLUDED.feels_like_c,
                pressure_hpa = EXCLUDED.pressure_hpa,
                humidity_pct = EXCLUDED.humidity_pct,
                wind_speed_ms = EXCLUDED.wind_speed_ms,
                wind_deg = EXCLUDED.wind_deg,
                cloud_pct = EXCLUDED.cloud_pct,
                visibility_m = EXCLUDED.visibility_m,
                rain_1h_mm = EXCLUDED.rain_1h_mm,
                snow_1h_mm = EXCLUDED.snow_1h_mm,
                condition_main = EXCLUDED.condition_main,
                condition_description = EXCLUDED.condition_description,
                ingested_at = EXCLUDED.ingested_at
            "#,
        );

        // An error here drops the transaction uncommitted, rolling the
        // whole batch back.
        query_builder.build().execute(&mut *tx).await?;

        tx.commit().await?;

        info!(loaded = records.len(), "Loaded records into warehouse");

        Ok(records.len())
    }
}
