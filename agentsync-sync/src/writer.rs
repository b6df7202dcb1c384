//! Sync engine: applies a [`Resolution`] to the workspace.
//!
//! Modules are handled first and are replaced wholesale: an existing
//! destination directory is removed before the source module is copied in,
//! so files that only exist at the destination never survive. Individual
//! files are then compared byte-for-byte and copied through a `.tmp` +
//! rename, preserving the source's permissions and timestamps. Files inside
//! a module's source directory are left to the module path.
//!
//! Every failure here is isolated to its file or module and recorded as an
//! `error` outcome; [`sync`] itself cannot fail.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::layout::{Bucket, Layout, MODULE_MARKER};
use crate::resolver::{Resolution, ResolvedFile, ResolvedModule};
use crate::walk;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Classification of a single file copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    New,
    Updated,
    Unchanged,
    Error,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::New => write!(f, "new"),
            FileStatus::Updated => write!(f, "updated"),
            FileStatus::Unchanged => write!(f, "unchanged"),
            FileStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of processing one resolved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub bucket: Bucket,
    pub owner: String,
    pub status: FileStatus,
    /// Error message for [`FileStatus::Error`].
    pub detail: Option<String>,
    /// Hex SHA-256 of the content now at (or, in a dry run, headed for) the
    /// destination. `None` on error.
    pub digest: Option<String>,
}

/// Result of processing one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutcome {
    pub source_dir: PathBuf,
    pub destination: PathBuf,
    pub owner: String,
    /// A destination directory existed and was (or would be) removed.
    pub replaced_existing: bool,
    /// Number of files copied (or that would be copied).
    pub files: usize,
    pub missing_marker: bool,
    /// `Some` when the module failed; the destination may be absent.
    pub error: Option<String>,
}

impl ModuleOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub new: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// File errors plus failed modules.
    pub error: usize,
    pub modules_replaced: usize,
}

impl SyncStats {
    fn record(&mut self, status: FileStatus) {
        match status {
            FileStatus::New => self.new += 1,
            FileStatus::Updated => self.updated += 1,
            FileStatus::Unchanged => self.unchanged += 1,
            FileStatus::Error => self.error += 1,
        }
    }

    /// True when nothing was written or would be written.
    pub fn is_noop(&self) -> bool {
        self.new == 0 && self.updated == 0 && self.error == 0 && self.modules_replaced == 0
    }
}

/// Everything [`sync`] did, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub modules: Vec<ModuleOutcome>,
    pub files: Vec<FileOutcome>,
    /// Resolved files that no routing rule accepts.
    pub unrouted: Vec<PathBuf>,
    pub stats: SyncStats,
    pub dry_run: bool,
}

// ---------------------------------------------------------------------------
// sync
// ---------------------------------------------------------------------------

/// Apply `resolution` to the workspace described by `layout`.
///
/// With `dry_run` every item is classified exactly as a real run would, but
/// nothing is removed or written.
pub fn sync(resolution: &Resolution, layout: &Layout, dry_run: bool) -> SyncReport {
    let mut report = SyncReport {
        dry_run,
        ..SyncReport::default()
    };

    for module in &resolution.modules {
        let outcome = sync_module(module, layout, dry_run);
        if outcome.is_ok() {
            report.stats.modules_replaced += 1;
        } else {
            report.stats.error += 1;
        }
        report.modules.push(outcome);
    }

    let mut claimed: HashSet<PathBuf> = HashSet::new();
    for file in resolution.files() {
        if resolution.in_module(&file.source) {
            tracing::debug!(path = %file.source.display(), "covered by module replacement");
            continue;
        }
        let Some(bucket) = file.bucket else {
            tracing::warn!(path = %file.source.display(), "no destination for file type, skipping");
            report.unrouted.push(file.source.clone());
            continue;
        };
        let Some(destination) = layout.destination_for(bucket, &file.source) else {
            report.unrouted.push(file.source.clone());
            continue;
        };
        if !claimed.insert(destination.clone()) {
            tracing::warn!(
                path = %destination.display(),
                source = %file.source.display(),
                "destination already written in this run; later source wins"
            );
        }

        let outcome = sync_file(file, bucket, destination, dry_run);
        report.stats.record(outcome.status);
        report.files.push(outcome);
    }

    report
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Classify `source` against whatever currently sits at `destination`.
pub fn classify(source_bytes: &[u8], destination: &Path) -> std::io::Result<FileStatus> {
    match fs::read(destination) {
        Ok(existing) if existing == source_bytes => Ok(FileStatus::Unchanged),
        Ok(_) => Ok(FileStatus::Updated),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileStatus::New),
        Err(e) => Err(e),
    }
}

fn sync_file(file: &ResolvedFile, bucket: Bucket, destination: PathBuf, dry_run: bool) -> FileOutcome {
    let mut outcome = FileOutcome {
        source: file.source.clone(),
        destination,
        bucket,
        owner: file.owner.clone(),
        status: FileStatus::Error,
        detail: None,
        digest: None,
    };

    let bytes = match fs::read(&file.source) {
        Ok(b) => b,
        Err(e) => return failed(outcome, format!("read {}: {e}", file.source.display())),
    };
    let status = match classify(&bytes, &outcome.destination) {
        Ok(s) => s,
        Err(e) => {
            let detail = format!("read {}: {e}", outcome.destination.display());
            return failed(outcome, detail);
        }
    };

    if status != FileStatus::Unchanged && !dry_run {
        if let Err(e) = walk::write_preserving(&file.source, &bytes, &outcome.destination) {
            let detail = format!("write {}: {e}", outcome.destination.display());
            return failed(outcome, detail);
        }
        tracing::info!(path = %outcome.destination.display(), %status, "copied");
    } else {
        tracing::debug!(path = %outcome.destination.display(), %status, dry_run, "not written");
    }

    outcome.status = status;
    outcome.digest = Some(digest(&bytes));
    outcome
}

fn failed(mut outcome: FileOutcome, detail: String) -> FileOutcome {
    tracing::error!(path = %outcome.source.display(), "{detail}");
    outcome.status = FileStatus::Error;
    outcome.detail = Some(detail);
    outcome
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

fn sync_module(module: &ResolvedModule, layout: &Layout, dry_run: bool) -> ModuleOutcome {
    let destination = layout
        .module_destination(&module.source_dir)
        .unwrap_or_else(|| layout.scripts.clone());
    let mut outcome = ModuleOutcome {
        source_dir: module.source_dir.clone(),
        replaced_existing: destination.exists(),
        destination,
        owner: module.owner.clone(),
        files: 0,
        missing_marker: false,
        error: None,
    };

    // Refuse to replace anything with an empty module.
    let source_files = match walk::collect_all(&module.source_dir) {
        Ok(files) => files,
        Err(e) => return module_failed(outcome, format!("read {}: {e}", module.source_dir.display())),
    };
    if source_files.is_empty() {
        return module_failed(
            outcome,
            format!("source module {} is empty", module.source_dir.display()),
        );
    }

    if dry_run {
        outcome.files = source_files.len();
        outcome.missing_marker = !module.source_dir.join(MODULE_MARKER).is_file();
    } else {
        if outcome.replaced_existing {
            if let Err(e) = remove_existing(&outcome.destination) {
                let error = format!("remove {}: {e}", outcome.destination.display());
                return module_failed(outcome, error);
            }
            tracing::info!(path = %outcome.destination.display(), "removed existing module");
        }
        match walk::copy_tree(&module.source_dir, &outcome.destination) {
            Ok(n) => outcome.files = n,
            Err(e) => {
                let error = format!("copy into {}: {e}", outcome.destination.display());
                return module_failed(outcome, error);
            }
        }
        outcome.missing_marker = !outcome.destination.join(MODULE_MARKER).is_file();
        tracing::info!(path = %outcome.destination.display(), files = outcome.files, "module replaced");
    }

    if outcome.missing_marker {
        tracing::warn!(module = %outcome.destination.display(), "runner module has no {MODULE_MARKER}");
    }
    outcome
}

fn remove_existing(path: &Path) -> std::io::Result<()> {
    if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn module_failed(mut outcome: ModuleOutcome, error: String) -> ModuleOutcome {
    tracing::error!(module = %outcome.source_dir.display(), "{error}");
    outcome.error = Some(error);
    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
