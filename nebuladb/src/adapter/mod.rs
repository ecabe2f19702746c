use crate::document::Document;
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;

/// A persistence backend for whole document sets. One adapter instance
/// may back multiple collections, keyed by collection name.
///
/// `load` must not fail for "no existing data" — an absent collection is
/// a valid empty one. `save` always receives the full current sequence;
/// there is no delta persistence.
pub trait Adapter: Send + Sync {
    fn load(&self, collection: &str) -> Result<Vec<Document>>;
    fn save(&self, collection: &str, documents: &[Document]) -> Result<()>;
}

/// In-memory adapter. The default persistence target; also backs the
/// query-analytics sink.
#[derive(Default)]
pub struct MemoryAdapter {
    sets: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Adapter for MemoryAdapter {
    fn load(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(self.sets.read().get(collection).cloned().unwrap_or_default())
    }

    fn save(&self, collection: &str, documents: &[Document]) -> Result<()> {
        self.sets
            .write()
            .insert(collection.to_string(), documents.to_vec());
        Ok(())
    }
}

/// File-backed adapter storing each collection as `<root>/<name>.json`.
pub struct FileAdapter {
    root: PathBuf,
}

impl FileAdapter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileAdapter { root: root.into() }
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.json"))
    }
}

impl Adapter for FileAdapter {
    fn load(&self, collection: &str) -> Result<Vec<Document>> {
        let path = self.collection_path(collection);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, collection: &str, documents: &[Document]) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let raw = serde_json::to_string_pretty(documents)?;
        std::fs::write(self.collection_path(collection), raw)?;
        Ok(())
    }
}
