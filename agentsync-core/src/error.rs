//! Error types for agentsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Underlying I/O failure while reading the manifest.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file does not exist in the source root.
    #[error("manifest not found at {path} (files in source root: {available})")]
    NotFound { path: PathBuf, available: String },

    /// The document is not structured data, not an object, or has no entries
    /// collection.
    #[error("malformed manifest {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    /// A single entry is invalid. The whole manifest is rejected.
    #[error("invalid manifest entry {index}: {message}")]
    InvalidEntry { index: usize, message: String },
}

/// Errors from reading the optional config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with the config path for context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
