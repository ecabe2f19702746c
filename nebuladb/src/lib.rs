pub mod adapter;
pub mod analytics;
pub mod collection;
pub mod database;
pub mod document;
pub mod error;
pub mod event;
pub mod query;
pub mod schema;
pub mod validation;

pub use adapter::{Adapter, FileAdapter, MemoryAdapter};
pub use analytics::{QueryKind, QueryRecord};
pub use collection::{Collection, CollectionOptions, SaveReport, SyncReport};
pub use database::Database;
pub use document::{Document, IdStrategy};
pub use error::{NebulaDbError, Result};
pub use event::ChangeEvent;
pub use query::{Query, QueryOptions, SortOrder};
pub use schema::{FieldDefinition, FieldType, Schema};
