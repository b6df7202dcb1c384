//! Manifest loading tests against files on disk.
//! Error messages, dialect handling, and loader warnings.

use agentsync_core::{load_manifest, Category, ManifestError, DEFAULT_MANIFEST};
use assert_fs::prelude::*;
use predicates::prelude::*;

fn write_manifest(dir: &assert_fs::TempDir, name: &str, body: &str) {
    dir.child(name).write_str(body).expect("write manifest");
}

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn missing_manifest_lists_root_files() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("README.md").write_str("# hi").unwrap();
    root.child("other.json").write_str("{}").unwrap();

    let err = load_manifest(root.path(), DEFAULT_MANIFEST).unwrap_err();
    assert!(matches!(err, ManifestError::NotFound { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains(DEFAULT_MANIFEST), "must name the manifest, got: {msg}");
    assert!(
        predicate::str::contains("README.md, other.json").eval(msg.as_str()),
        "must list root files, got: {msg}"
    );
}

#[test]
fn invalid_json_is_malformed_with_position() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(&root, DEFAULT_MANIFEST, "{\"agents\": [ unclosed");

    let err = load_manifest(root.path(), DEFAULT_MANIFEST).unwrap_err();
    assert!(matches!(err, ManifestError::Malformed { .. }), "got: {err}");
    assert!(err.to_string().contains("line 1"), "got: {err}");
}

#[test]
fn top_level_list_is_malformed() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(&root, DEFAULT_MANIFEST, "[1, 2, 3]");

    let err = load_manifest(root.path(), DEFAULT_MANIFEST).unwrap_err();
    assert!(matches!(err, ManifestError::Malformed { .. }), "got: {err}");
    assert!(err.to_string().contains("object"));
}

#[test]
fn missing_agents_collection_is_malformed_and_lists_keys() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(&root, DEFAULT_MANIFEST, r#"{"version": "1", "entries": []}"#);

    let err = load_manifest(root.path(), DEFAULT_MANIFEST).unwrap_err();
    assert!(matches!(err, ManifestError::Malformed { .. }), "got: {err}");
    let msg = err.to_string();
    assert!(msg.contains("version, entries") || msg.contains("entries, version"), "got: {msg}");
}

#[test]
fn agents_not_a_list_is_malformed() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(&root, DEFAULT_MANIFEST, r#"{"agents": {"name": "x"}}"#);

    let err = load_manifest(root.path(), DEFAULT_MANIFEST).unwrap_err();
    assert!(matches!(err, ManifestError::Malformed { .. }), "got: {err}");
}

#[test]
fn files_not_a_list_is_invalid_entry() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(
        &root,
        DEFAULT_MANIFEST,
        r#"{"agents": [{"name": "a", "type": "utility", "files": "tools/a.py"}]}"#,
    );

    let err = load_manifest(root.path(), DEFAULT_MANIFEST).unwrap_err();
    match err {
        ManifestError::InvalidEntry { index, message } => {
            assert_eq!(index, 0);
            assert!(message.contains("'files' must be a list"), "got: {message}");
        }
        other => panic!("expected InvalidEntry, got {other:?}"),
    }
}

#[test]
fn streams_not_a_list_is_invalid_entry() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(
        &root,
        DEFAULT_MANIFEST,
        r#"{"agents": [{"name": "a", "type": "value-stream", "streams": "finance"}]}"#,
    );

    let err = load_manifest(root.path(), DEFAULT_MANIFEST).unwrap_err();
    assert!(matches!(err, ManifestError::InvalidEntry { index: 0, .. }), "got: {err}");
}

#[test]
fn missing_name_is_invalid_entry() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(&root, DEFAULT_MANIFEST, r#"{"agents": [{"type": "utility"}]}"#);

    let err = load_manifest(root.path(), DEFAULT_MANIFEST).unwrap_err();
    assert!(matches!(err, ManifestError::InvalidEntry { index: 0, .. }), "got: {err}");
    assert!(err.to_string().contains("name"));
}

// ---------------------------------------------------------------------------
// 2. Successful loads
// ---------------------------------------------------------------------------

#[test]
fn file_list_dialect_with_alias_spellings() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(
        &root,
        DEFAULT_MANIFEST,
        r#"{
            "version": "2026-01-18",
            "published_at": "2026-01-18T12:00:00Z",
            "agents": [
                {
                    "agent": "workflow-architect",
                    "agent_type": "utility",
                    "streams": ["Kennispublicatie", "it-development"],
                    "files": [
                        "exports/utility/prompts/workflow-architect.prompt.md",
                        "exports/utility/charters-agents/charter.workflow-architect.md"
                    ],
                    "status": "active",
                    "version": "1.2.0"
                }
            ]
        }"#,
    );

    let m = load_manifest(root.path(), DEFAULT_MANIFEST).expect("load");
    assert_eq!(m.meta.version, "2026-01-18");
    assert_eq!(m.meta.entry_count, 1);
    let e = &m.entries[0];
    assert_eq!(e.name, "workflow-architect");
    assert_eq!(e.category, Category::Universal);
    assert_eq!(e.scopes, vec!["kennispublicatie", "it-development"]);
    assert_eq!(e.locations.len(), 2);
    assert_eq!(e.version(), "1.2.0");
    assert!(m.warnings.is_empty());
}

#[test]
fn entry_without_locations_warns_but_loads() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(
        &root,
        DEFAULT_MANIFEST,
        r#"{"agents": [{"name": "empty", "type": "utility"}]}"#,
    );

    let m = load_manifest(root.path(), DEFAULT_MANIFEST).expect("load");
    assert_eq!(m.entries.len(), 1);
    assert_eq!(m.warnings.len(), 1);
    assert!(m.warnings[0].contains("empty"));
    assert_eq!(m.meta.version, "unspecified");
    assert_eq!(m.meta.published_at, "unspecified");
}

#[test]
fn yaml_manifest_selected_by_extension() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    write_manifest(
        &root,
        "agents.yml",
        "agents:\n  - name: reporter\n    type: value-stream\n    value_streams: [Finance]\n    files: [reports/finance/reporter.py]\n",
    );

    let m = load_manifest(root.path(), "agents.yml").expect("load");
    assert_eq!(m.entries[0].category, Category::Scoped);
    assert_eq!(m.entries[0].scopes, vec!["finance"]);
}
