//! Error types for export operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while bootstrapping or running an export.
///
/// Only `Authentication` and the configuration variants abort a run. Every
/// other variant is captured per node by the walker and reported in the
/// summary.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Lookup failed for {id}: {message}")]
    Lookup { id: String, message: String },

    #[error("Content fetch failed for {id}: {message}")]
    ContentFetch { id: String, message: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl ExportError {
    pub(crate) fn lookup(id: impl Into<String>, message: impl Into<String>) -> Self {
        ExportError::Lookup {
            id: id.into(),
            message: message.into(),
        }
    }

    pub(crate) fn content(id: impl Into<String>, message: impl Into<String>) -> Self {
        ExportError::ContentFetch {
            id: id.into(),
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures that abort the whole run rather than a single node.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExportError::Authentication(_)
                | ExportError::ConfigError(_)
                | ExportError::ConfigLoad(_)
                | ExportError::Runtime(_)
        )
    }
}
