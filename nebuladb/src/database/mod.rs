use crate::adapter::{Adapter, MemoryAdapter};
use crate::analytics::AnalyticsSink;
use crate::collection::{Collection, CollectionOptions};
use crate::document::Document;
use crate::error::{NebulaDbError, Result};
use crate::event::{ChangeEvent, EventBus};
use crate::schema::{parse_schema_str, Schema};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Owns named adapters, schemas, and collections; routes lookups and
/// carries the event bus and analytics sink shared by its collections.
/// Collections receive their adapter/schema/event-sink references at
/// construction — the database is never a data store itself.
pub struct Database {
    name: String,
    adapters: RwLock<HashMap<String, Arc<dyn Adapter>>>,
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    events: Arc<EventBus>,
    analytics: Arc<AnalyticsSink>,
}

impl Database {
    /// Create a database. A `MemoryAdapter` is pre-registered under
    /// `"memory"` as the default persistence target.
    pub fn new(name: impl Into<String>) -> Self {
        let events = Arc::new(EventBus::new());
        let mut adapters: HashMap<String, Arc<dyn Adapter>> = HashMap::new();
        adapters.insert("memory".to_string(), Arc::new(MemoryAdapter::new()));

        Database {
            name: name.into(),
            adapters: RwLock::new(adapters),
            schemas: RwLock::new(HashMap::new()),
            collections: RwLock::new(HashMap::new()),
            analytics: Arc::new(AnalyticsSink::new(events.clone())),
            events,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Registries ───────────────────────────────────────────────────

    pub fn register_adapter(&self, name: impl Into<String>, adapter: Arc<dyn Adapter>) {
        self.adapters.write().insert(name.into(), adapter);
    }

    pub fn register_schema(&self, name: impl Into<String>, schema: Schema) {
        self.schemas.write().insert(name.into(), Arc::new(schema));
    }

    /// Register a schema from its YAML source.
    pub fn register_schema_str(&self, name: impl Into<String>, yaml: &str) -> Result<()> {
        let schema = parse_schema_str(yaml)?;
        self.register_schema(name, schema);
        Ok(())
    }

    pub fn adapter(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.read().get(name).cloned()
    }

    pub fn schema(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.read().get(name).cloned()
    }

    // ── Collections ──────────────────────────────────────────────────

    /// Create a collection. A missing adapter is fatal; a missing
    /// schema degrades to schema-less operation with a warning. The
    /// collection loads from its adapter before this returns.
    pub fn create_collection(
        &self,
        name: impl Into<String>,
        options: CollectionOptions,
    ) -> Result<Arc<Collection>> {
        let name = name.into();
        if name.is_empty() {
            return Err(NebulaDbError::Other(
                "collection name must not be empty".to_string(),
            ));
        }
        if self.collections.read().contains_key(&name) {
            return Err(NebulaDbError::CollectionExists(name));
        }

        let adapter = self
            .adapter(&options.adapter)
            .ok_or_else(|| NebulaDbError::AdapterNotFound(options.adapter.clone()))?;

        let schema = match &options.schema {
            Some(schema_name) => {
                let schema = self.schema(schema_name);
                if schema.is_none() {
                    log::warn!(
                        "schema '{schema_name}' is not registered; collection '{name}' runs schema-less"
                    );
                }
                schema
            }
            None => None,
        };

        let collection = Arc::new(Collection::new(
            name.clone(),
            adapter,
            schema,
            options.validate_schema,
            options.id_strategy,
            self.events.clone(),
            Some(self.analytics.clone()),
        ));
        self.collections.write().insert(name, collection.clone());
        Ok(collection)
    }

    pub fn collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    // ── Events & telemetry ───────────────────────────────────────────

    /// Subscribe to insert/update/remove events from every collection.
    pub fn subscribe<F>(&self, subscriber: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(subscriber);
    }

    /// Query analytics records written so far, in insertion order.
    pub fn query_analytics(&self) -> Vec<Document> {
        self.analytics.records()
    }

    /// Per-collection document counts.
    pub fn status(&self) -> Value {
        let collections = self.collections.read();
        let mut counts = serde_json::Map::new();
        for (name, collection) in collections.iter() {
            counts.insert(name.clone(), json!({ "count": collection.len() }));
        }
        json!({
            "name": self.name,
            "collections": counts,
        })
    }
}
