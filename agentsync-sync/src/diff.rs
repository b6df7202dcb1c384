//! Unified diff preview for `agentsync diff`.
//!
//! Compares what a fetch would write against the current workspace. Nothing
//! is written.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use similar::TextDiff;

use crate::{
    error::io_err,
    layout::Layout,
    resolver::{Resolution, ResolvedModule},
    walk, SyncError,
};

/// How a destination file would change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    Create,
    Modify,
    /// Only produced by module replacement.
    Delete,
}

/// A single destination file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub change: Change,
    pub unified_diff: String,
}

/// Diff every routed file and every module in `resolution` against the
/// workspace. Unchanged files are omitted.
pub fn diff_resolution(resolution: &Resolution, layout: &Layout) -> Result<Vec<FileDiff>, SyncError> {
    let mut diffs = Vec::new();

    for module in &resolution.modules {
        diff_module(module, layout, &mut diffs)?;
    }

    for file in resolution.files() {
        if resolution.in_module(&file.source) {
            continue;
        }
        let Some(dest) = file.bucket.and_then(|b| layout.destination_for(b, &file.source)) else {
            continue;
        };
        let new = read_text(&file.source)?.unwrap_or_default();
        if let Some(diff) = diff_one(layout, &dest, &new)? {
            diffs.push(diff);
        }
    }

    Ok(diffs)
}

fn diff_module(module: &ResolvedModule, layout: &Layout, out: &mut Vec<FileDiff>) -> Result<(), SyncError> {
    let Some(dest_root) = layout.module_destination(&module.source_dir) else {
        return Ok(());
    };
    let source_files = walk::collect_all(&module.source_dir)
        .map_err(|e| io_err(&module.source_dir, e))?;
    let mut incoming = BTreeSet::new();
    for src in &source_files {
        let Ok(rel) = src.strip_prefix(&module.source_dir) else {
            continue;
        };
        incoming.insert(rel.to_path_buf());
        let new = read_text(src)?.unwrap_or_default();
        if let Some(diff) = diff_one(layout, &dest_root.join(rel), &new)? {
            out.push(diff);
        }
    }

    if !dest_root.is_dir() {
        return Ok(());
    }
    let existing = walk::collect_all(&dest_root).map_err(|e| io_err(&dest_root, e))?;
    for dest in existing {
        let Ok(rel) = dest.strip_prefix(&dest_root) else {
            continue;
        };
        if incoming.contains(rel) {
            continue;
        }
        let old = read_text(&dest)?.unwrap_or_default();
        let shown = layout.display_path(&dest).display().to_string();
        out.push(FileDiff {
            unified_diff: unified(&old, "", &format!("a/{shown}"), "/dev/null"),
            path: dest,
            change: Change::Delete,
        });
    }
    Ok(())
}

fn diff_one(layout: &Layout, dest: &Path, new: &str) -> Result<Option<FileDiff>, SyncError> {
    let (old, change) = match read_text(dest)? {
        Some(old) if old == new => return Ok(None),
        Some(old) => (old, Change::Modify),
        None => (String::new(), Change::Create),
    };
    let shown = layout.display_path(dest).display().to_string();
    let old_header = match change {
        Change::Create => "/dev/null".to_string(),
        _ => format!("a/{shown}"),
    };
    Ok(Some(FileDiff {
        path: dest.to_path_buf(),
        change,
        unified_diff: unified(&old, new, &old_header, &format!("b/{shown}")),
    }))
}

fn unified(old: &str, new: &str, old_header: &str, new_header: &str) -> String {
    TextDiff::from_lines(old, new)
        .unified_diff()
        .header(old_header, new_header)
        .context_radius(3)
        .to_string()
}

/// Lossy UTF-8 contents, or `None` when the file does not exist.
fn read_text(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}
