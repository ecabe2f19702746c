use crate::adapter::{Adapter, MemoryAdapter};
use crate::collection::Collection;
use crate::document::{Document, IdStrategy};
use crate::event::EventBus;
use crate::query::{Query, QueryOptions};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Name of the collection holding query analytics records.
pub const ANALYTICS_COLLECTION: &str = "_query_metrics";

/// The instrumented query operations. `count` is intentionally not one
/// of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Find,
    FindOne,
    FindById,
}

/// One telemetry entry describing a query's shape, duration, and result
/// size. Append-only, never validated, never deduplicated.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRecord {
    pub collection: String,
    pub operation: QueryKind,
    pub query: Value,
    pub duration_ms: u64,
    pub result_count: usize,
    pub timestamp: i64,
}

/// Best-effort telemetry sink shared by every collection of a database.
/// Lazily creates a schema-less, memory-backed collection on first
/// record. Recording failures are swallowed; they must never fail the
/// originating query.
pub struct AnalyticsSink {
    adapter: Arc<dyn Adapter>,
    events: Arc<EventBus>,
    inner: OnceLock<Collection>,
}

impl AnalyticsSink {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self::with_adapter(events, Arc::new(MemoryAdapter::new()))
    }

    pub fn with_adapter(events: Arc<EventBus>, adapter: Arc<dyn Adapter>) -> Self {
        AnalyticsSink {
            adapter,
            events,
            inner: OnceLock::new(),
        }
    }

    /// The sink collection carries no analytics handle of its own, so
    /// queries against it are never instrumented and recording cannot
    /// recurse.
    fn collection(&self) -> &Collection {
        self.inner.get_or_init(|| {
            Collection::new(
                ANALYTICS_COLLECTION,
                self.adapter.clone(),
                None,
                false,
                IdStrategy::Ulid,
                self.events.clone(),
                None,
            )
        })
    }

    pub fn record(&self, record: QueryRecord) {
        let value = match serde_json::to_value(&record) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("analytics record dropped: {e}");
                return;
            }
        };
        if let Err(e) = self.collection().insert(value) {
            log::warn!("analytics record dropped: {e}");
        }
    }

    /// All records written so far, in insertion order.
    pub fn records(&self) -> Vec<Document> {
        match self.inner.get() {
            Some(collection) => collection.find(&Query::new(), &QueryOptions::default()),
            None => Vec::new(),
        }
    }
}
