//! Fetch pipeline entrypoints used by the CLI.
//!
//! materialize → load manifest → filter → resolve → sync → audit.
//!
//! The materialized source lives in a scratch [`TempDir`] that is released
//! on every exit path unless the caller asks to keep it.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;

use agentsync_core::{
    derive_streams, filter_applicable, load_manifest, LayoutConfig, Manifest, ManifestMeta,
    Partition, SkipReason, StreamName,
};

use crate::audit::{self, AuditTrail};
use crate::diff::{diff_resolution, FileDiff};
use crate::error::{io_err, SyncError};
use crate::layout::Layout;
use crate::materialize::Materializer;
use crate::resolver::{resolve, Resolution};
use crate::writer::{sync, SyncReport};

// ---------------------------------------------------------------------------
// Requests and reports
// ---------------------------------------------------------------------------

/// Parameters of one `fetch` or `diff` run.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub stream: StreamName,
    pub workspace: PathBuf,
    pub manifest: String,
    pub layout: LayoutConfig,
    pub dry_run: bool,
    pub audit: bool,
    /// Keep the scratch directory holding the materialized source.
    pub keep_source: bool,
}

/// A skipped manifest entry, by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub name: String,
    pub reason: SkipReason,
}

/// What a fetch decided before touching the workspace.
#[derive(Debug, Clone)]
pub struct Selection {
    pub source: String,
    pub meta: ManifestMeta,
    pub manifest_warnings: Vec<String>,
    /// The stream is not named by any manifest entry.
    pub unknown_stream: bool,
    pub applied: Vec<String>,
    pub skipped: Vec<Skipped>,
    pub missing: Vec<String>,
    /// Retained scratch directory, when requested.
    pub kept_source: Option<PathBuf>,
}

/// Result of [`fetch`].
#[derive(Debug, Clone)]
pub struct FetchReport {
    pub stream: StreamName,
    pub selection: Selection,
    pub sync: SyncReport,
    pub layout: Layout,
    pub audit_path: Option<PathBuf>,
}

/// Result of [`plan_diff`].
#[derive(Debug, Clone)]
pub struct DiffReport {
    pub stream: StreamName,
    pub selection: Selection,
    pub layout: Layout,
    pub diffs: Vec<FileDiff>,
}

/// One row of [`StreamListing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamCount {
    pub stream: StreamName,
    pub applicable: usize,
}

/// Result of [`list_streams`].
#[derive(Debug, Clone, Serialize)]
pub struct StreamListing {
    pub source: String,
    pub manifest: ManifestMeta,
    pub streams: Vec<StreamCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kept_source: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Scratch source
// ---------------------------------------------------------------------------

struct Source {
    /// Held for its drop; removes the scratch directory unless kept.
    _scratch: TempDir,
    kept: Option<PathBuf>,
    root: PathBuf,
    origin: String,
}

impl Source {
    fn open(materializer: &dyn Materializer, keep: bool) -> Result<Self, SyncError> {
        let scratch = tempfile::Builder::new()
            .prefix("agentsync-")
            .keep(keep)
            .tempdir()
            .map_err(|e| io_err(std::env::temp_dir(), e))?;
        // Reported before anything can fail, so a failed run still names it.
        let kept = keep.then(|| scratch.path().to_path_buf());
        if let Some(dir) = &kept {
            tracing::warn!("source kept at {}", dir.display());
        }
        let root = materializer.materialize(scratch.path())?;
        Ok(Self {
            _scratch: scratch,
            kept,
            root,
            origin: materializer.describe(),
        })
    }
}

/// Before any mutation the workspace root must exist and be a directory.
pub fn check_workspace(workspace: &Path) -> Result<(), SyncError> {
    match std::fs::metadata(workspace) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SyncError::Policy(format!(
            "workspace {} is not a directory",
            workspace.display()
        ))),
        Err(_) => Err(SyncError::Policy(format!(
            "workspace {} does not exist",
            workspace.display()
        ))),
    }
}

fn load(source: &Source, manifest_name: &str) -> Result<Manifest, SyncError> {
    let manifest = load_manifest(&source.root, manifest_name)?;
    for warning in &manifest.warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(
        version = %manifest.meta.version,
        entries = manifest.meta.entry_count,
        "manifest loaded"
    );
    Ok(manifest)
}

/// Runs only universal entries; never named by a scope, never unknown.
const UTILITY_STREAM: &str = "utility";

/// Filter and resolve; fails when nothing applies or nothing resolves.
fn select<'m>(
    source: &Source,
    manifest: &'m Manifest,
    stream: &StreamName,
) -> Result<(Partition<'m>, Resolution, Selection), SyncError> {
    let unknown_stream =
        stream.as_str() != UTILITY_STREAM && !derive_streams(&manifest.entries).contains(stream);
    if unknown_stream {
        tracing::warn!(stream = %stream, "value-stream is not named in the manifest");
    }

    let partition = filter_applicable(&manifest.entries, stream);
    let skipped: Vec<Skipped> = partition
        .skipped
        .iter()
        .map(|(e, reason)| Skipped {
            name: e.name.clone(),
            reason: *reason,
        })
        .collect();

    if partition.applicable.is_empty() {
        let names: Vec<_> = skipped.iter().map(|s| s.name.as_str()).collect();
        return Err(SyncError::NoApplicableEntries {
            stream: stream.to_string(),
            skipped: if names.is_empty() {
                "none".to_string()
            } else {
                names.join(", ")
            },
        });
    }

    let resolution = resolve(&source.root, &partition.applicable, stream);
    if resolution.is_empty() {
        return Err(SyncError::NothingResolved {
            stream: stream.to_string(),
        });
    }

    let selection = Selection {
        source: source.origin.clone(),
        meta: manifest.meta.clone(),
        manifest_warnings: manifest.warnings.clone(),
        unknown_stream,
        applied: partition.applicable.iter().map(|e| e.name.clone()).collect(),
        skipped,
        missing: resolution.missing.clone(),
        kept_source: source.kept.clone(),
    };
    Ok((partition, resolution, selection))
}

// ---------------------------------------------------------------------------
// Entrypoints
// ---------------------------------------------------------------------------

/// Fetch every applicable artifact for `request.stream` into the workspace.
pub fn fetch(materializer: &dyn Materializer, request: &FetchRequest) -> Result<FetchReport, SyncError> {
    check_workspace(&request.workspace)?;

    let source = Source::open(materializer, request.keep_source)?;
    let manifest = load(&source, &request.manifest)?;
    let (partition, resolution, selection) = select(&source, &manifest, &request.stream)?;

    let layout = Layout::new(&request.workspace, &request.layout);
    let report = sync(&resolution, &layout, request.dry_run);

    let audit_path = if request.audit && !request.dry_run {
        let trail = AuditTrail::new(
            request.stream.as_str(),
            selection.source.clone(),
            &manifest.meta,
            &partition,
            &report,
            &resolution.missing,
            &layout,
        );
        Some(audit::write(&request.workspace, &trail)?)
    } else {
        None
    };

    Ok(FetchReport {
        stream: request.stream.clone(),
        selection,
        sync: report,
        layout,
        audit_path,
    })
}

/// Everything `fetch` would change, as unified diffs. Writes nothing.
pub fn plan_diff(materializer: &dyn Materializer, request: &FetchRequest) -> Result<DiffReport, SyncError> {
    check_workspace(&request.workspace)?;

    let source = Source::open(materializer, request.keep_source)?;
    let manifest = load(&source, &request.manifest)?;
    let (_, resolution, selection) = select(&source, &manifest, &request.stream)?;

    let layout = Layout::new(&request.workspace, &request.layout);
    let diffs = diff_resolution(&resolution, &layout)?;

    Ok(DiffReport {
        stream: request.stream.clone(),
        selection,
        layout,
        diffs,
    })
}

/// Every value-stream named in the manifest, with its applicable-entry count.
pub fn list_streams(
    materializer: &dyn Materializer,
    manifest_name: &str,
    keep_source: bool,
) -> Result<StreamListing, SyncError> {
    let source = Source::open(materializer, keep_source)?;
    let manifest = load(&source, manifest_name)?;

    let streams = derive_streams(&manifest.entries)
        .into_iter()
        .map(|stream| StreamCount {
            applicable: filter_applicable(&manifest.entries, &stream).applicable.len(),
            stream,
        })
        .collect();

    Ok(StreamListing {
        source: source.origin.clone(),
        manifest: manifest.meta,
        streams,
        kept_source: source.kept.clone(),
    })
}
