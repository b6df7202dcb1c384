//! agentsync core library: manifest model, loader, applicability, config.
//!
//! - [`types`]: manifest entries and their enums
//! - [`manifest`]: load / parse the publication manifest
//! - [`applicability`]: which entries apply to a value-stream
//! - [`config`]: optional `~/.agentsync/config.yaml`
//! - [`error`]: [`ManifestError`], [`ConfigError`]

pub mod applicability;
pub mod config;
pub mod error;
pub mod manifest;
pub mod types;

pub use applicability::{derive_streams, filter_applicable, is_applicable, Partition, SkipReason};
pub use config::{Config, LayoutConfig};
pub use error::{ConfigError, ManifestError};
pub use manifest::{load_manifest, parse_manifest, ManifestFormat, DEFAULT_MANIFEST};
pub use types::{
    Category, DeclaredLocation, EntryStatus, ExpectedCounts, LocationKind, Manifest,
    ManifestEntry, ManifestMeta, StreamName, WILDCARD_SCOPE,
};
