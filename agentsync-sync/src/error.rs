//! Error types for agentsync-sync.
//!
//! Only whole-run failures are errors. Per-file and per-module failures are
//! recorded as outcomes in the sync report instead.

use std::path::PathBuf;

use thiserror::Error;

use agentsync_core::{ConfigError, ManifestError};

/// All errors that abort a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The manifest could not be found, parsed, or validated.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// The user config could not be read.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Cloning or otherwise materializing the source failed.
    #[error("failed to materialize source: {0}")]
    Materialize(String),

    /// Materializing the source did not finish in time.
    #[error("materializing source timed out after {secs}s")]
    MaterializeTimeout { secs: u64 },

    /// Nothing in the manifest applies to the requested stream.
    #[error("no entries applicable to value-stream '{stream}' (skipped: {skipped})")]
    NoApplicableEntries { stream: String, skipped: String },

    /// Resolution produced no files and no modules.
    #[error("no files resolved for value-stream '{stream}'")]
    NothingResolved { stream: String },

    /// A workspace precondition failed before any mutation.
    #[error("policy gate failed: {0}")]
    Policy(String),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (audit trail).
    #[error("audit JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
