use crate::adapter::Adapter;
use crate::analytics::{AnalyticsSink, QueryKind, QueryRecord};
use crate::document::{Document, IdStrategy, ID_FIELD};
use crate::error::{NebulaDbError, Result};
use crate::event::{ChangeEvent, EventBus};
use crate::query::{self, Query, QueryOptions};
use crate::schema::Schema;
use crate::validation;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Options for creating a collection.
#[derive(Debug, Clone)]
pub struct CollectionOptions {
    /// Name of a registered adapter. Resolution failure is fatal: a
    /// collection with no persistence target cannot accept writes.
    pub adapter: String,
    /// Name of a registered schema. Resolution failure degrades to
    /// schema-less operation with a warning.
    pub schema: Option<String>,
    pub validate_schema: bool,
    pub id_strategy: IdStrategy,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        CollectionOptions {
            adapter: "memory".to_string(),
            schema: None,
            validate_schema: true,
            id_strategy: IdStrategy::default(),
        }
    }
}

impl CollectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapter(mut self, name: impl Into<String>) -> Self {
        self.adapter = name.into();
        self
    }

    pub fn schema(mut self, name: impl Into<String>) -> Self {
        self.schema = Some(name.into());
        self
    }

    pub fn validate_schema(mut self, validate: bool) -> Self {
        self.validate_schema = validate;
        self
    }

    pub fn id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }
}

/// Outcome of handing the document set to the adapter. Persistence
/// failures are reported, never thrown: the in-memory sequence remains
/// the source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub success: bool,
    pub error: Option<String>,
}

/// Outcome of `sync`: reload from the adapter, then re-save once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub success: bool,
    pub synced: usize,
    pub error: Option<String>,
}

/// The core engine: an in-memory ordered sequence of documents for one
/// logical name, validated against an optional schema and persisted
/// through its bound adapter. Insertion order is preserved; it is the
/// only implicit ordering a caller may rely on absent an explicit sort.
pub struct Collection {
    name: String,
    documents: RwLock<Vec<Document>>,
    adapter: Arc<dyn Adapter>,
    schema: Option<Arc<Schema>>,
    validate_schema: bool,
    id_strategy: IdStrategy,
    events: Arc<EventBus>,
    analytics: Option<Arc<AnalyticsSink>>,
    /// Serializes adapter saves so two mutations cannot interleave their
    /// snapshots at the adapter boundary.
    save_lock: Mutex<()>,
}

impl Collection {
    /// Build a collection and perform its initial load. A failing load
    /// is logged and leaves the collection empty; absent data is a
    /// valid empty collection.
    pub(crate) fn new(
        name: impl Into<String>,
        adapter: Arc<dyn Adapter>,
        schema: Option<Arc<Schema>>,
        validate_schema: bool,
        id_strategy: IdStrategy,
        events: Arc<EventBus>,
        analytics: Option<Arc<AnalyticsSink>>,
    ) -> Self {
        let name = name.into();
        let documents = match adapter.load(&name) {
            Ok(documents) => documents,
            Err(e) => {
                log::warn!("initial load failed for collection '{name}': {e}");
                Vec::new()
            }
        };

        Collection {
            name,
            documents: RwLock::new(documents),
            adapter,
            schema,
            validate_schema,
            id_strategy,
            events,
            analytics,
            save_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    // ── CRUD ─────────────────────────────────────────────────────────

    /// Insert a document. Applies schema defaults, generates an id if
    /// the caller supplied none, validates, appends, saves, and emits
    /// an `Insert` event. A caller-supplied id that already exists is
    /// rejected. On any failure nothing is mutated or persisted.
    pub fn insert(&self, value: Value) -> Result<Document> {
        let mut doc = Document::from_value(value)?;

        if let Some(schema) = &self.schema {
            validation::apply_defaults(schema, &mut doc);
        }

        match doc.id().map(str::to_string) {
            Some(id) => {
                if self.find_position(&id).is_some() {
                    return Err(NebulaDbError::DuplicateId {
                        collection: self.name.clone(),
                        id,
                    });
                }
            }
            None => doc.set_id(self.id_strategy.generate()),
        }

        if self.validate_schema {
            if let Some(schema) = &self.schema {
                validation::ensure_valid(schema, &doc)?;
            }
        }

        self.documents.write().push(doc.clone());
        self.persist();
        self.events.emit(&ChangeEvent::Insert {
            collection: self.name.clone(),
            document: doc.clone(),
        });

        Ok(doc)
    }

    /// Merge a patch over the document with the given id, shallowly;
    /// the original id is always preserved. Returns `Ok(None)` for an
    /// unknown id — that is a normal, non-exceptional outcome. A merged
    /// result that fails validation aborts without mutating state.
    pub fn update(&self, id: &str, patch: Value) -> Result<Option<Document>> {
        let patch = match patch {
            Value::Object(map) => map,
            other => {
                return Err(NebulaDbError::InvalidDocument(
                    crate::document::json_type_name(&other),
                ))
            }
        };

        let (old, merged) = {
            let documents = self.documents.read();
            let position = match documents.iter().position(|d| d.id() == Some(id)) {
                Some(position) => position,
                None => return Ok(None),
            };
            let old = documents[position].clone();
            let mut merged = old.clone();
            for (field, value) in &patch {
                if field != ID_FIELD {
                    merged.insert(field.clone(), value.clone());
                }
            }
            (old, merged)
        };

        if self.validate_schema {
            if let Some(schema) = &self.schema {
                validation::ensure_valid(schema, &merged)?;
            }
        }

        {
            let mut documents = self.documents.write();
            // Re-resolve the position: the read lock was released
            let position = match documents.iter().position(|d| d.id() == Some(id)) {
                Some(position) => position,
                None => return Ok(None),
            };
            documents[position] = merged.clone();
        }

        self.persist();
        self.events.emit(&ChangeEvent::Update {
            collection: self.name.clone(),
            document: merged.clone(),
            old_document: old,
        });

        Ok(Some(merged))
    }

    /// Remove the document with the given id, preserving the relative
    /// order of the rest. Returns `false` for an unknown id.
    pub fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut documents = self.documents.write();
            match documents.iter().position(|d| d.id() == Some(id)) {
                Some(position) => documents.remove(position),
                None => return false,
            }
        };

        self.persist();
        self.events.emit(&ChangeEvent::Remove {
            collection: self.name.clone(),
            document: removed,
        });
        true
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// All documents matching the query, with sort, skip, and limit
    /// applied in that order. Never mutates the collection.
    pub fn find(&self, query: &Query, options: &QueryOptions) -> Vec<Document> {
        let started = Instant::now();
        let results = self.run_query(query, options);
        self.record_analytics(
            QueryKind::Find,
            Value::Object(query.clone()),
            started,
            results.len(),
        );
        results
    }

    /// The first document matching the query after options are applied.
    pub fn find_one(&self, query: &Query, options: &QueryOptions) -> Option<Document> {
        let started = Instant::now();
        let result = self.run_query(query, options).into_iter().next();
        let count = usize::from(result.is_some());
        self.record_analytics(QueryKind::FindOne, Value::Object(query.clone()), started, count);
        result
    }

    /// The first document whose id equals the given one.
    pub fn find_by_id(&self, id: &str) -> Option<Document> {
        let started = Instant::now();
        let result = {
            let documents = self.documents.read();
            documents.iter().find(|d| d.id() == Some(id)).cloned()
        };
        let count = usize::from(result.is_some());
        self.record_analytics(QueryKind::FindById, json!({ ID_FIELD: id }), started, count);
        result
    }

    /// Number of matching documents. Options are not applied and no
    /// analytics record is written.
    pub fn count(&self, query: &Query) -> usize {
        self.documents
            .read()
            .iter()
            .filter(|d| query::matches(d, query))
            .count()
    }

    fn run_query(&self, query: &Query, options: &QueryOptions) -> Vec<Document> {
        query::warn_reserved(&self.name, query);
        let mut results: Vec<Document> = {
            let documents = self.documents.read();
            documents
                .iter()
                .filter(|d| query::matches(d, query))
                .cloned()
                .collect()
        };
        query::apply_options(&mut results, options);
        results
    }

    fn find_position(&self, id: &str) -> Option<usize> {
        self.documents.read().iter().position(|d| d.id() == Some(id))
    }

    fn record_analytics(&self, kind: QueryKind, query: Value, started: Instant, count: usize) {
        let Some(sink) = &self.analytics else { return };
        sink.record(QueryRecord {
            collection: self.name.clone(),
            operation: kind,
            query,
            duration_ms: started.elapsed().as_millis() as u64,
            result_count: count,
            timestamp: Utc::now().timestamp_millis(),
        });
    }

    // ── Persistence cycle ────────────────────────────────────────────

    /// Hand the full current sequence to the adapter. Failures are
    /// logged and reported; the caller's in-memory state is unaffected.
    pub fn save(&self) -> SaveReport {
        let _guard = self.save_lock.lock();
        self.save_inner()
    }

    fn save_inner(&self) -> SaveReport {
        let snapshot = self.documents.read().clone();
        match self.adapter.save(&self.name, &snapshot) {
            Ok(()) => SaveReport {
                success: true,
                error: None,
            },
            Err(e) => {
                log::warn!("save failed for collection '{}': {e}", self.name);
                SaveReport {
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Mutating operations already succeeded in memory; a failed save
    /// only logs.
    fn persist(&self) {
        let _guard = self.save_lock.lock();
        let _ = self.save_inner();
    }

    /// Reload from the adapter, replace the in-memory sequence
    /// wholesale, then re-save once. A failing load keeps the current
    /// in-memory documents.
    pub fn sync(&self) -> SyncReport {
        let _guard = self.save_lock.lock();

        let loaded = match self.adapter.load(&self.name) {
            Ok(loaded) => loaded,
            Err(e) => {
                log::warn!("sync load failed for collection '{}': {e}", self.name);
                return SyncReport {
                    success: false,
                    synced: 0,
                    error: Some(e.to_string()),
                };
            }
        };

        let synced = loaded.len();
        *self.documents.write() = loaded;

        let save = self.save_inner();
        SyncReport {
            success: save.success,
            synced,
            error: save.error,
        }
    }

    // ── Maintenance ──────────────────────────────────────────────────

    /// Validate every stored document against the bound schema and
    /// report the ones with violations. Schema-less collections report
    /// nothing.
    pub fn validate_all(&self) -> Vec<DocumentIssues> {
        let Some(schema) = &self.schema else {
            return Vec::new();
        };
        self.documents
            .read()
            .iter()
            .filter_map(|doc| {
                let result = validation::validate_document(schema, doc);
                if result.is_ok() {
                    None
                } else {
                    Some(DocumentIssues {
                        id: doc.id().map(str::to_string),
                        errors: result.errors,
                    })
                }
            })
            .collect()
    }
}

/// Validation issues found on one stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIssues {
    pub id: Option<String>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::schema::parse_schema_str;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adapter whose saves (and optionally loads) always fail.
    struct FailingAdapter {
        fail_load: bool,
    }

    impl Adapter for FailingAdapter {
        fn load(&self, collection: &str) -> Result<Vec<Document>> {
            if self.fail_load {
                Err(NebulaDbError::Adapter(format!(
                    "load unavailable for '{collection}'"
                )))
            } else {
                Ok(Vec::new())
            }
        }

        fn save(&self, collection: &str, _documents: &[Document]) -> Result<()> {
            Err(NebulaDbError::Adapter(format!(
                "save unavailable for '{collection}'"
            )))
        }
    }

    fn todo_schema() -> Arc<Schema> {
        Arc::new(
            parse_schema_str(
                r#"
id: { type: string, required: true }
title: { type: string, required: true }
status: { type: string, enum: [pending, done], default: pending }
"#,
            )
            .unwrap(),
        )
    }

    fn collection_with(adapter: Arc<dyn Adapter>, schema: Option<Arc<Schema>>) -> Collection {
        Collection::new(
            "todos",
            adapter,
            schema,
            true,
            IdStrategy::Ulid,
            Arc::new(EventBus::new()),
            None,
        )
    }

    fn todos() -> Collection {
        collection_with(Arc::new(MemoryAdapter::new()), Some(todo_schema()))
    }

    fn query(value: Value) -> Query {
        match value {
            Value::Object(map) => map,
            _ => panic!("query must be an object"),
        }
    }

    #[test]
    fn test_insert_applies_defaults_and_generates_id() {
        let todos = todos();
        let doc = todos.insert(json!({ "title": "write tests" })).unwrap();

        assert!(doc.id().is_some());
        assert_eq!(doc.get("status"), Some(&json!("pending")));
        assert_eq!(todos.len(), 1);
    }

    #[test]
    fn test_insert_honors_caller_id() {
        let todos = todos();
        let doc = todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();
        assert_eq!(doc.id(), Some("t1"));
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let todos = todos();
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();
        let err = todos.insert(json!({ "id": "t1", "title": "y" })).unwrap_err();
        assert!(matches!(err, NebulaDbError::DuplicateId { .. }));
        assert_eq!(todos.len(), 1);
    }

    #[test]
    fn test_insert_rejects_non_objects() {
        let todos = todos();
        assert!(todos.insert(json!([1, 2])).is_err());
        assert!(todos.insert(json!("nope")).is_err());
        assert_eq!(todos.len(), 0);
    }

    #[test]
    fn test_insert_validation_failure_leaves_no_trace() {
        let adapter = Arc::new(MemoryAdapter::new());
        let todos = collection_with(adapter.clone(), Some(todo_schema()));

        // Missing required title
        let err = todos.insert(json!({ "id": "t1" })).unwrap_err();
        assert!(matches!(err, NebulaDbError::Validation(_)));
        assert_eq!(todos.len(), 0);
        assert!(adapter.load("todos").unwrap().is_empty());
    }

    #[test]
    fn test_insert_persists_through_adapter() {
        let adapter = Arc::new(MemoryAdapter::new());
        let todos = collection_with(adapter.clone(), Some(todo_schema()));
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();

        let saved = adapter.load("todos").unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].id(), Some("t1"));
    }

    #[test]
    fn test_insert_succeeds_when_save_fails() {
        let todos = collection_with(
            Arc::new(FailingAdapter { fail_load: false }),
            Some(todo_schema()),
        );
        let doc = todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();
        assert_eq!(doc.id(), Some("t1"));
        assert_eq!(todos.len(), 1);
        assert!(!todos.save().success);
    }

    #[test]
    fn test_initial_load_populates_documents() {
        let adapter = Arc::new(MemoryAdapter::new());
        adapter
            .save(
                "todos",
                &[Document::from_value(json!({ "id": "t1", "title": "x" })).unwrap()],
            )
            .unwrap();

        let todos = collection_with(adapter, Some(todo_schema()));
        assert_eq!(todos.len(), 1);
    }

    #[test]
    fn test_failed_initial_load_starts_empty() {
        let todos = collection_with(
            Arc::new(FailingAdapter { fail_load: true }),
            Some(todo_schema()),
        );
        assert!(todos.is_empty());
    }

    #[test]
    fn test_update_merges_and_preserves_id() {
        let todos = todos();
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();

        let updated = todos
            .update("t1", json!({ "status": "done", "id": "hijacked" }))
            .unwrap()
            .unwrap();

        assert_eq!(updated.id(), Some("t1"));
        assert_eq!(updated.get("status"), Some(&json!("done")));
        assert_eq!(updated.get("title"), Some(&json!("x")));
    }

    #[test]
    fn test_update_missing_id_is_none() {
        let todos = todos();
        assert!(todos.update("ghost", json!({ "status": "done" })).unwrap().is_none());
        assert_eq!(todos.len(), 0);
    }

    #[test]
    fn test_update_validation_failure_keeps_original() {
        let todos = todos();
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();

        let err = todos.update("t1", json!({ "status": "archived" })).unwrap_err();
        assert!(matches!(err, NebulaDbError::Validation(_)));

        let doc = todos.find_by_id("t1").unwrap();
        assert_eq!(doc.get("status"), Some(&json!("pending")));
    }

    #[test]
    fn test_update_rejects_non_object_patch() {
        let todos = todos();
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();
        assert!(todos.update("t1", json!("done")).is_err());
    }

    #[test]
    fn test_remove() {
        let todos = todos();
        todos.insert(json!({ "id": "t1", "title": "a" })).unwrap();
        todos.insert(json!({ "id": "t2", "title": "b" })).unwrap();
        todos.insert(json!({ "id": "t3", "title": "c" })).unwrap();

        assert!(todos.remove("t2"));
        assert!(!todos.remove("t2"));

        // Relative order of the rest is preserved
        let all = todos.find(&Query::new(), &QueryOptions::default());
        let ids: Vec<_> = all.iter().map(|d| d.id().unwrap().to_string()).collect();
        assert_eq!(ids, ["t1", "t3"]);
    }

    #[test]
    fn test_find_preserves_insertion_order() {
        let todos = todos();
        for n in 0..4 {
            todos
                .insert(json!({ "id": format!("t{n}"), "title": "x" }))
                .unwrap();
        }
        let all = todos.find(&Query::new(), &QueryOptions::default());
        let ids: Vec<_> = all.iter().map(|d| d.id().unwrap().to_string()).collect();
        assert_eq!(ids, ["t0", "t1", "t2", "t3"]);
    }

    #[test]
    fn test_find_is_pure() {
        let todos = todos();
        todos.insert(json!({ "id": "t1", "title": "a" })).unwrap();
        todos
            .insert(json!({ "id": "t2", "title": "b", "status": "done" }))
            .unwrap();

        let q = query(json!({ "status": "pending" }));
        let first = todos.find(&q, &QueryOptions::default());
        let second = todos.find(&q, &QueryOptions::default());
        assert_eq!(first, second);
        assert_eq!(todos.len(), 2);
    }

    #[test]
    fn test_find_one_and_find_by_id() {
        let todos = todos();
        todos.insert(json!({ "id": "t1", "title": "a" })).unwrap();
        todos.insert(json!({ "id": "t2", "title": "b" })).unwrap();

        let first = todos.find_one(&Query::new(), &QueryOptions::default()).unwrap();
        assert_eq!(first.id(), Some("t1"));

        assert_eq!(todos.find_by_id("t2").unwrap().get("title"), Some(&json!("b")));
        assert!(todos.find_by_id("ghost").is_none());
        assert!(todos
            .find_one(&query(json!({ "title": "z" })), &QueryOptions::default())
            .is_none());
    }

    #[test]
    fn test_count_matches_find_length() {
        let todos = todos();
        for n in 0..3 {
            todos
                .insert(json!({ "id": format!("t{n}"), "title": "x" }))
                .unwrap();
        }
        todos.update("t1", json!({ "status": "done" })).unwrap();

        let q = query(json!({ "status": "pending" }));
        assert_eq!(todos.count(&q), todos.find(&q, &QueryOptions::default()).len());
        assert_eq!(todos.count(&q), 2);
        assert_eq!(todos.count(&Query::new()), 3);
    }

    #[test]
    fn test_analytics_records_instrumented_operations() {
        let events = Arc::new(EventBus::new());
        let sink = Arc::new(AnalyticsSink::new(events.clone()));
        let todos = Collection::new(
            "todos",
            Arc::new(MemoryAdapter::new()),
            Some(todo_schema()),
            true,
            IdStrategy::Ulid,
            events,
            Some(sink.clone()),
        );
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();

        todos.find(&query(json!({ "status": "pending" })), &QueryOptions::default());
        todos.find_one(&Query::new(), &QueryOptions::default());
        todos.find_by_id("t1");
        todos.count(&Query::new()); // not instrumented

        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("operation"), Some(&json!("find")));
        assert_eq!(records[0].get("collection"), Some(&json!("todos")));
        assert_eq!(records[0].get("query"), Some(&json!({ "status": "pending" })));
        assert_eq!(records[0].get("result_count"), Some(&json!(1)));
        assert_eq!(records[1].get("operation"), Some(&json!("find_one")));
        assert_eq!(records[2].get("operation"), Some(&json!("find_by_id")));
        assert_eq!(records[2].get("query"), Some(&json!({ "id": "t1" })));
    }

    #[test]
    fn test_analytics_failure_does_not_affect_queries() {
        let events = Arc::new(EventBus::new());
        let sink = Arc::new(AnalyticsSink::with_adapter(
            events.clone(),
            Arc::new(FailingAdapter { fail_load: true }),
        ));
        let todos = Collection::new(
            "todos",
            Arc::new(MemoryAdapter::new()),
            Some(todo_schema()),
            true,
            IdStrategy::Ulid,
            events,
            Some(sink),
        );
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();

        let results = todos.find(&Query::new(), &QueryOptions::default());
        assert_eq!(results.len(), 1);
        assert_eq!(todos.find_by_id("t1").unwrap().id(), Some("t1"));
    }

    #[test]
    fn test_reserved_prefix_query_fields_are_ignored() {
        let todos = todos();
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();

        let results = todos.find(&query(json!({ "$where": "1" })), &QueryOptions::default());
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_sync_round_trip() {
        let adapter = Arc::new(MemoryAdapter::new());
        let todos = collection_with(adapter.clone(), Some(todo_schema()));
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();

        // Another writer replaces the backing store
        adapter
            .save(
                "todos",
                &[
                    Document::from_value(json!({ "id": "t2", "title": "y" })).unwrap(),
                    Document::from_value(json!({ "id": "t3", "title": "z" })).unwrap(),
                ],
            )
            .unwrap();

        let report = todos.sync();
        assert!(report.success);
        assert_eq!(report.synced, 2);
        assert_eq!(todos.len(), 2);
        assert!(todos.find_by_id("t1").is_none());
        assert_eq!(adapter.load("todos").unwrap().len(), 2);
    }

    #[test]
    fn test_sync_load_failure_keeps_documents() {
        let broken = collection_with(
            Arc::new(FailingAdapter { fail_load: true }),
            Some(todo_schema()),
        );
        broken.insert(json!({ "id": "t1", "title": "x" })).unwrap();

        let report = broken.sync();
        assert!(!report.success);
        assert_eq!(report.synced, 0);
        assert!(report.error.is_some());
        assert_eq!(broken.len(), 1);
    }

    #[test]
    fn test_events_are_emitted_per_mutation() {
        let events = Arc::new(EventBus::new());
        let inserts = Arc::new(AtomicUsize::new(0));
        let updates = Arc::new(AtomicUsize::new(0));
        let removes = Arc::new(AtomicUsize::new(0));
        {
            let (i, u, r) = (inserts.clone(), updates.clone(), removes.clone());
            events.subscribe(move |event| match event {
                ChangeEvent::Insert { .. } => {
                    i.fetch_add(1, Ordering::SeqCst);
                }
                ChangeEvent::Update { old_document, document, .. } => {
                    assert_eq!(old_document.get("status"), Some(&json!("pending")));
                    assert_eq!(document.get("status"), Some(&json!("done")));
                    u.fetch_add(1, Ordering::SeqCst);
                }
                ChangeEvent::Remove { .. } => {
                    r.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        let todos = Collection::new(
            "todos",
            Arc::new(MemoryAdapter::new()),
            Some(todo_schema()),
            true,
            IdStrategy::Ulid,
            events,
            None,
        );
        todos.insert(json!({ "id": "t1", "title": "x" })).unwrap();
        todos.update("t1", json!({ "status": "done" })).unwrap();
        todos.remove("t1");

        assert_eq!(inserts.load(Ordering::SeqCst), 1);
        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert_eq!(removes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lookup_misses_emit_nothing_and_change_nothing() {
        let events = Arc::new(EventBus::new());
        let emitted = Arc::new(AtomicUsize::new(0));
        {
            let emitted = emitted.clone();
            events.subscribe(move |_| {
                emitted.fetch_add(1, Ordering::SeqCst);
            });
        }
        let todos = Collection::new(
            "todos",
            Arc::new(MemoryAdapter::new()),
            Some(todo_schema()),
            true,
            IdStrategy::Ulid,
            events,
            None,
        );

        assert!(todos.update("ghost", json!({ "status": "done" })).unwrap().is_none());
        assert!(!todos.remove("ghost"));
        assert_eq!(emitted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validate_schema_off_skips_validation_but_applies_defaults() {
        let todos = Collection::new(
            "todos",
            Arc::new(MemoryAdapter::new()),
            Some(todo_schema()),
            false,
            IdStrategy::Ulid,
            Arc::new(EventBus::new()),
            None,
        );
        // Missing required title: accepted with validation off
        let doc = todos.insert(json!({ "id": "t1" })).unwrap();
        assert_eq!(doc.get("status"), Some(&json!("pending")));
    }

    #[test]
    fn test_schema_less_collection_accepts_anything() {
        let free = Collection::new(
            "scratch",
            Arc::new(MemoryAdapter::new()),
            None,
            true,
            IdStrategy::Nanoid,
            Arc::new(EventBus::new()),
            None,
        );
        let doc = free.insert(json!({ "whatever": [1, { "nested": true }] })).unwrap();
        assert!(doc.id().is_some());
    }

    #[test]
    fn test_validate_all_reports_violations() {
        // Load documents that bypass validation via the adapter
        let adapter = Arc::new(MemoryAdapter::new());
        adapter
            .save(
                "todos",
                &[
                    Document::from_value(json!({ "id": "good", "title": "x" })).unwrap(),
                    Document::from_value(json!({ "id": "bad", "status": "bogus" })).unwrap(),
                ],
            )
            .unwrap();
        let todos = collection_with(adapter, Some(todo_schema()));

        let issues = todos.validate_all();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id.as_deref(), Some("bad"));
        assert_eq!(issues[0].errors.len(), 2);
    }

    #[test]
    fn test_task_lifecycle_pending_to_done() {
        let schema = Arc::new(
            parse_schema_str(
                r#"
id: { type: string, required: true }
status: { type: string, enum: [pending, done], default: pending }
"#,
            )
            .unwrap(),
        );
        let todos = collection_with(Arc::new(MemoryAdapter::new()), Some(schema));

        let stored = todos.insert(json!({ "id": "t1", "text": "x" })).unwrap();
        assert_eq!(stored.get("status"), Some(&json!("pending")));

        let pending = todos.find(&query(json!({ "status": "pending" })), &QueryOptions::default());
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id(), Some("t1"));

        let merged = todos.update("t1", json!({ "status": "done" })).unwrap().unwrap();
        assert_eq!(merged.get("status"), Some(&json!("done")));

        let pending = todos.find(&query(json!({ "status": "pending" })), &QueryOptions::default());
        assert!(pending.is_empty());
    }
}
