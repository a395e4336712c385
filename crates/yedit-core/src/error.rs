//! Error types for yedit-core

use std::path::PathBuf;

/// Failures raised by the store, the batch processor and the persistence layer.
///
/// Read-path misses (absent key, index out of range, wrong container while
/// reading) are never reported here; they come back as `None` or `false`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected item type found while going through key path: {path} ({reason})")]
    PathConflict { path: String, reason: String },

    #[error("Could not determine type of incoming value: {0}")]
    ValueType(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Problem with loading {content_type} content: {message}")]
    Parse {
        content_type: &'static str,
        message: String,
    },

    #[error("Please specify a filename.")]
    NoFilename,

    #[error("Unsupported content_type: {0}. Please specify a content_type of yaml or json.")]
    UnsupportedContentType(String),

    #[error("{} is being written by another process", path.display())]
    Locked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize document: {0}")]
    Serialize(String),

    #[error("{0}")]
    Load(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn conflict(path: &str, reason: impl Into<String>) -> Self {
        Error::PathConflict {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
