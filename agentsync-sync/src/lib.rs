//! # agentsync-sync
//!
//! Path resolution and the sync engine.
//!
//! Call [`fetch`] to materialize the source, select the entries that apply to
//! a value-stream, and copy their artifacts into a workspace. [`plan_diff`]
//! previews the same run as unified diffs and [`list_streams`] enumerates the
//! value-streams a manifest knows about.

pub mod audit;
pub mod diff;
pub mod error;
pub mod layout;
pub mod materialize;
pub mod pipeline;
pub mod resolver;
mod walk;
pub mod writer;

pub use diff::{Change, FileDiff};
pub use error::SyncError;
pub use layout::{route, Bucket, Layout};
pub use materialize::{GitMaterializer, LocalMaterializer, Materializer};
pub use pipeline::{
    check_workspace, fetch, list_streams, plan_diff, DiffReport, FetchReport, FetchRequest,
    Selection, Skipped, StreamCount, StreamListing,
};
pub use resolver::{resolve, Resolution, ResolvedFile, ResolvedModule};
pub use writer::{sync, FileOutcome, FileStatus, ModuleOutcome, SyncReport, SyncStats};
