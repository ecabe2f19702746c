use thiserror::Error;

#[derive(Error, Debug)]
pub enum NebulaDbError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Adapter '{0}' is not registered")]
    AdapterNotFound(String),

    #[error("Collection '{0}' already exists")]
    CollectionExists(String),

    #[error("Duplicate document id '{id}' in collection '{collection}'")]
    DuplicateId { collection: String, id: String },

    #[error("Document must be an object, got {0}")]
    InvalidDocument(&'static str),

    #[error("Adapter error: {0}")]
    Adapter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, NebulaDbError>;
