use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagCsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV file is empty or has no header: {}", path.display())]
    NoHeader { path: PathBuf },

    #[error("DataType \"{type_name}\" is not supported")]
    UnsupportedType { type_name: String },

    #[error("Cannot read value of property \"{field}\" from CSV file")]
    MissingField { field: String },

    #[error("Invalid value \"{value}\" for property \"{field}\"")]
    InvalidValue { field: String, value: String },

    #[error("Row has {found} field(s) but the header has {expected}")]
    RowLength { expected: usize, found: usize },

    #[error("Node not found: {path}")]
    NodeNotFound { path: String },

    #[error("Node already exists: {path}")]
    NodeExists { path: String },

    #[error("Cannot add children to {path}: node is not a container")]
    NotAContainer { path: String },

    #[error("Invalid node name: \"{name}\"")]
    InvalidName { name: String },

    #[error("Project tree lock poisoned")]
    LockPoisoned,

    #[error("Background task panicked: {0}")]
    TaskPanicked(String),
}

impl TagCsvError {
    /// Errors confined to a single row or node; the pass can continue.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            TagCsvError::UnsupportedType { .. }
                | TagCsvError::MissingField { .. }
                | TagCsvError::InvalidValue { .. }
                | TagCsvError::RowLength { .. }
        )
    }

    /// Errors raised by the tree store while mutating it.
    pub fn is_store(&self) -> bool {
        matches!(
            self,
            TagCsvError::NodeNotFound { .. }
                | TagCsvError::NodeExists { .. }
                | TagCsvError::NotAContainer { .. }
                | TagCsvError::InvalidName { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TagCsvError>;
