use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the chanlogs pipeline.
#[derive(Debug, Error)]
pub enum ChanlogError {
    #[error("unsupported event type: {0}")]
    UnsupportedEvent(String),

    #[error("invalid template '{template}': {reason}")]
    Template { template: String, reason: String },

    #[error("template field '{field}' is not available on {event_type} event")]
    MissingField { field: String, event_type: String },

    #[error("failed to append to {path}: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database unavailable: {0}")]
    BackendUnavailable(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("toggle storage error: {0}")]
    Toggle(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ChanlogError>;
