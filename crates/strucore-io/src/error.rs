//! Error types for the transport layer.

use thiserror::Error;

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("element {element}: unknown kind '{kind}'")]
    UnknownElementKind { element: i64, kind: String },

    #[error("load {load}: unknown kind '{kind}'")]
    UnknownLoadKind { load: i64, kind: String },

    #[error("load {load}: unknown direction '{direction}'")]
    UnknownLoadDirection { load: i64, direction: String },

    #[error("load {load}: exactly one of node_id and element_id must be set")]
    AmbiguousLoadTarget { load: i64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
