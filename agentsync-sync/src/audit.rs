//! Audit trail of a fetch run.
//!
//! Persists an [`AuditTrail`] JSON document at
//! `<workspace>/temp/fetch-audit.json`, overwritten on every real run.
//! Writes use the atomic `.tmp` + rename pattern.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use agentsync_core::{ManifestMeta, Partition};

use crate::error::{io_err, SyncError};
use crate::layout::Layout;
use crate::writer::{FileStatus, SyncReport, SyncStats};

/// An entry that took part in the run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AppliedEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub streams: Vec<String>,
    pub file_count: usize,
    pub version: String,
}

/// An entry left out of the run, and why.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub category: String,
    pub reason: &'static str,
}

/// One synced file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuditFile {
    /// Relative to the workspace.
    pub path: String,
    pub status: FileStatus,
    pub sha256: String,
}

/// One replaced module.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AuditModule {
    pub path: String,
    pub files: usize,
    pub replaced_existing: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditTrail {
    pub timestamp: DateTime<Utc>,
    pub value_stream: String,
    pub source: String,
    pub manifest: ManifestMeta,
    pub agents_applied: Vec<AppliedEntry>,
    pub agents_skipped: Vec<SkippedEntry>,
    pub statistics: SyncStats,
    pub files: Vec<AuditFile>,
    pub modules: Vec<AuditModule>,
    pub missing: Vec<String>,
}

impl AuditTrail {
    pub fn new(
        value_stream: &str,
        source: String,
        manifest: &ManifestMeta,
        partition: &Partition<'_>,
        report: &SyncReport,
        missing: &[String],
        layout: &Layout,
    ) -> Self {
        let relative = |p: &Path| layout.display_path(p).display().to_string();

        Self {
            timestamp: Utc::now(),
            value_stream: value_stream.to_string(),
            source,
            manifest: manifest.clone(),
            agents_applied: partition
                .applicable
                .iter()
                .map(|e| AppliedEntry {
                    name: e.name.clone(),
                    category: e.category.to_string(),
                    streams: e.scopes.clone(),
                    file_count: e.locations.len(),
                    version: e.version().to_string(),
                })
                .collect(),
            agents_skipped: partition
                .skipped
                .iter()
                .map(|(e, reason)| SkippedEntry {
                    name: e.name.clone(),
                    category: e.category.to_string(),
                    reason: reason.as_str(),
                })
                .collect(),
            statistics: report.stats,
            files: report
                .files
                .iter()
                .filter_map(|f| {
                    Some(AuditFile {
                        path: relative(&f.destination),
                        status: f.status,
                        sha256: f.digest.clone()?,
                    })
                })
                .collect(),
            modules: report
                .modules
                .iter()
                .filter(|m| m.is_ok())
                .map(|m| AuditModule {
                    path: relative(&m.destination),
                    files: m.files,
                    replaced_existing: m.replaced_existing,
                })
                .collect(),
            missing: missing.to_vec(),
        }
    }
}

/// `<workspace>/temp/fetch-audit.json`
pub fn audit_path(workspace: &Path) -> PathBuf {
    workspace.join("temp").join("fetch-audit.json")
}

/// Write `trail` atomically and return its path.
pub fn write(workspace: &Path, trail: &AuditTrail) -> Result<PathBuf, SyncError> {
    let path = audit_path(workspace);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid audit path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(trail)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    tracing::info!(path = %path.display(), "audit trail written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentsync_core::{
        filter_applicable, Category, EntryStatus, ExpectedCounts, LayoutConfig, ManifestEntry,
        StreamName,
    };
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn entry(name: &str, category: Category, scopes: &[&str], status: EntryStatus) -> ManifestEntry {
        let mut metadata = BTreeMap::new();
        metadata.insert("version".to_string(), "2.0.0".to_string());
        ManifestEntry {
            name: name.into(),
            category,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            locations: vec![],
            expected: ExpectedCounts::default(),
            status,
            metadata,
        }
    }

    #[test]
    fn trail_lists_applied_and_skipped_with_reasons() {
        let tmp = TempDir::new().unwrap();
        let entries = vec![
            entry("linter", Category::Universal, &[], EntryStatus::Active),
            entry("reporter", Category::Scoped, &["sales"], EntryStatus::Active),
            entry("old", Category::Universal, &[], EntryStatus::Deprecated),
        ];
        let partition = filter_applicable(&entries, &StreamName::from("finance"));
        let meta = ManifestMeta {
            version: "1".into(),
            published_at: "2026-01-01".into(),
            entry_count: 3,
        };
        let layout = Layout::new(tmp.path(), &LayoutConfig::default());
        let trail = AuditTrail::new(
            "finance",
            "local".into(),
            &meta,
            &partition,
            &SyncReport::default(),
            &[],
            &layout,
        );

        let path = write(tmp.path(), &trail).unwrap();
        assert_eq!(path, tmp.path().join("temp").join("fetch-audit.json"));
        assert!(!path.with_extension("json.tmp").exists());

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["value_stream"], "finance");
        assert_eq!(json["agents_applied"][0]["name"], "linter");
        assert_eq!(json["agents_applied"][0]["type"], "utility");
        assert_eq!(json["agents_applied"][0]["version"], "2.0.0");
        let skipped = json["agents_skipped"].as_array().unwrap();
        assert_eq!(skipped.len(), 2);
        assert_eq!(skipped[0]["reason"], "not_applicable");
        assert_eq!(skipped[1]["reason"], "deprecated");
        assert_eq!(json["statistics"]["modules_replaced"], 0);
    }
}
