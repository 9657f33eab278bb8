//! Inter-stage result channel
//!
//! Each pipeline stage publishes its structured summary under a named slot,
//! keyed by the run id. Downstream stages and external monitors read by
//! `(run_id, slot)`. This replaces any task-runner-specific side-channel
//! with an explicit publish/subscribe contract; payloads are stored as JSON
//! so monitors can consume them without linking against stage types.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::Result;

/// Named slot a stage publishes its result under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    IngestionResults,
    EtlSummary,
    ValidationResults,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::IngestionResults => "ingestion_results",
            Slot::EtlSummary => "etl_summary",
            Slot::ValidationResults => "validation_results",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run-scoped key-value store for stage results.
///
/// Cheaply cloneable; all clones share the same underlying store.
#[derive(Debug, Clone, Default)]
pub struct ResultChannel {
    slots: Arc<Mutex<HashMap<(Uuid, Slot), serde_json::Value>>>,
}

impl ResultChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a stage result under `(run_id, slot)`, replacing any earlier
    /// value for the same key.
    pub fn publish<T: Serialize>(&self, run_id: Uuid, slot: Slot, value: &T) -> Result<()> {
        let payload = serde_json::to_value(value)?;
        self.lock().insert((run_id, slot), payload);
        Ok(())
    }

    /// Fetch a previously published result, if any.
    pub fn fetch<T: DeserializeOwned>(&self, run_id: Uuid, slot: Slot) -> Result<Option<T>> {
        match self.lock().get(&(run_id, slot)) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Raw JSON view of a slot, for monitors that do not know the payload type.
    pub fn fetch_raw(&self, run_id: Uuid, slot: Slot) -> Option<serde_json::Value> {
        self.lock().get(&(run_id, slot)).cloned()
    }

    /// Slots published so far for the given run.
    pub fn published_slots(&self, run_id: Uuid) -> Vec<Slot> {
        let mut slots: Vec<Slot> = self
            .lock()
            .keys()
            .filter(|(id, _)| *id == run_id)
            .map(|(_, slot)| *slot)
            .collect();
        slots.sort_by_key(|s| s.as_str());
        slots
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(Uuid, Slot), serde_json::Value>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
