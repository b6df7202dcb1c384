//! Manifest loader.
//!
//! Parses the publication manifest at the root of the source repository into
//! [`ManifestEntry`] values. Two manifest dialects are accepted: the
//! file-list dialect (`name`/`type`/`value_streams`/`files`) and the
//! stream-keyed dialect (`naam`/`valueStream` plus manifest-level `locaties`
//! templates). Each semantic field is looked up through an ordered list of
//! candidate keys; the first key holding a non-null value wins.
//!
//! Documents ending in `.yaml`/`.yml` are parsed as YAML, everything else as
//! JSON. Both are normalised to a [`serde_json::Value`] tree first.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::ManifestError;
use crate::types::{
    Category, DeclaredLocation, EntryStatus, ExpectedCounts, Manifest, ManifestEntry,
    ManifestMeta, WILDCARD_SCOPE,
};

/// Default manifest file name in the source root.
pub const DEFAULT_MANIFEST: &str = "agents-publicatie.json";

// ---------------------------------------------------------------------------
// Field aliases (priority order)
// ---------------------------------------------------------------------------

const ENTRIES_KEYS: &[&str] = &["agents"];
const VERSION_KEYS: &[&str] = &["version", "versie"];
const PUBLISHED_KEYS: &[&str] = &["published_at", "publicatiedatum"];
const TEMPLATES_KEYS: &[&str] = &["locaties", "locations"];

const NAME_KEYS: &[&str] = &["name", "agent", "naam"];
const CATEGORY_KEYS: &[&str] = &["type", "agent_type"];
const SCOPES_KEYS: &[&str] = &["value_streams", "streams"];
const STREAM_KEYS: &[&str] = &["valueStream", "value_stream"];
const FILES_KEYS: &[&str] = &["files"];
const STATUS_KEYS: &[&str] = &["status"];
const PROMPT_COUNT_KEYS: &[&str] = &["expected_prompts", "aantalPrompts"];
const RUNNER_COUNT_KEYS: &[&str] = &["expected_runners", "aantalRunners"];

/// Keys consumed by the loader itself; everything else lands in `metadata`.
const RESERVED_KEYS: &[&[&str]] = &[
    NAME_KEYS,
    CATEGORY_KEYS,
    SCOPES_KEYS,
    STREAM_KEYS,
    FILES_KEYS,
];

const STREAM_PLACEHOLDER: &str = "<value-stream>";
const NAME_PLACEHOLDER: &str = "<agent-naam>";
const VERB_PLACEHOLDER: &str = "<werkwoord>";

/// Stream value that marks an entry as universal in the stream-keyed dialect.
const UTILITY_STREAM: &str = "utility";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Supported manifest encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Yaml,
}

impl ManifestFormat {
    /// Pick the format from the file extension. Defaults to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// Load `<source_root>/<manifest_name>`.
///
/// Returns [`ManifestError::NotFound`] (listing the files that *are* in the
/// root) when the manifest is absent.
pub fn load_manifest(source_root: &Path, manifest_name: &str) -> Result<Manifest, ManifestError> {
    let path = source_root.join(manifest_name);
    if !path.is_file() {
        return Err(ManifestError::NotFound {
            available: list_root_files(source_root),
            path,
        });
    }
    let text = std::fs::read_to_string(&path).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;
    parse_manifest(&text, ManifestFormat::from_path(&path), &path)
}

/// Parse manifest text. `origin` is only used in error messages.
pub fn parse_manifest(
    text: &str,
    format: ManifestFormat,
    origin: &Path,
) -> Result<Manifest, ManifestError> {
    let malformed = |message: String| ManifestError::Malformed {
        path: origin.to_path_buf(),
        message,
    };

    let root: Value = match format {
        ManifestFormat::Json => serde_json::from_str(text).map_err(|e| {
            malformed(format!(
                "invalid JSON at line {}, column {}: {e}",
                e.line(),
                e.column()
            ))
        })?,
        ManifestFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|e| malformed(format!("invalid YAML: {e}")))?
        }
    };

    let Value::Object(doc) = root else {
        return Err(malformed(format!(
            "top level must be an object, got {}",
            type_name(&root)
        )));
    };

    let Some(entries_raw) = lookup(&doc, ENTRIES_KEYS) else {
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        return Err(malformed(format!(
            "missing 'agents' collection (found keys: {})",
            keys.join(", ")
        )));
    };
    let Value::Array(entries_raw) = entries_raw else {
        return Err(malformed(format!(
            "'agents' must be a list, got {}",
            type_name(entries_raw)
        )));
    };

    let templates = lookup(&doc, TEMPLATES_KEYS).and_then(Value::as_object);

    let mut entries = Vec::with_capacity(entries_raw.len());
    let mut warnings = Vec::new();
    for (index, raw) in entries_raw.iter().enumerate() {
        let entry = parse_entry(index, raw, templates)?;
        if entry.locations.is_empty() {
            warnings.push(format!("entry '{}' declares no file locations", entry.name));
        }
        entries.push(entry);
    }

    let meta = ManifestMeta {
        version: lookup(&doc, VERSION_KEYS)
            .map(stringify)
            .unwrap_or_else(|| "unspecified".to_string()),
        published_at: lookup(&doc, PUBLISHED_KEYS)
            .map(stringify)
            .unwrap_or_else(|| "unspecified".to_string()),
        entry_count: entries.len(),
    };

    Ok(Manifest {
        meta,
        entries,
        warnings,
    })
}

// ---------------------------------------------------------------------------
// Entry parsing
// ---------------------------------------------------------------------------

fn parse_entry(
    index: usize,
    raw: &Value,
    templates: Option<&Map<String, Value>>,
) -> Result<ManifestEntry, ManifestError> {
    let invalid = |message: String| ManifestError::InvalidEntry { index, message };

    let Value::Object(fields) = raw else {
        return Err(invalid(format!("must be an object, got {}", type_name(raw))));
    };

    let name = lookup(fields, NAME_KEYS)
        .map(stringify)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| invalid("missing required field 'name'".to_string()))?;

    let stream = lookup(fields, STREAM_KEYS).map(stringify);

    let category = match lookup(fields, CATEGORY_KEYS) {
        Some(value) => {
            let raw_category = stringify(value).to_lowercase();
            Category::parse(&raw_category).ok_or_else(|| {
                invalid(format!("entry '{name}' has unknown type '{raw_category}'"))
            })?
        }
        None => match stream.as_deref() {
            Some(s) if s.eq_ignore_ascii_case(UTILITY_STREAM) => Category::Universal,
            Some(_) => Category::Scoped,
            None => return Err(invalid(format!("entry '{name}' missing required field 'type'"))),
        },
    };

    let scopes = match lookup(fields, SCOPES_KEYS) {
        Some(Value::Array(items)) => items.iter().map(|v| stringify(v).to_lowercase()).collect(),
        Some(other) => {
            return Err(invalid(format!(
                "entry '{name}': 'value_streams' must be a list, got {}",
                type_name(other)
            )))
        }
        None => match stream.as_deref() {
            Some(s) if s.eq_ignore_ascii_case(UTILITY_STREAM) => vec![WILDCARD_SCOPE.to_string()],
            Some(s) => vec![s.to_lowercase()],
            None => Vec::new(),
        },
    };

    let count = |keys: &[&str]| {
        parse_count(fields, keys).map_err(|m| invalid(format!("entry '{name}': {m}")))
    };
    let expected = ExpectedCounts {
        prompts: count(PROMPT_COUNT_KEYS)?,
        runners: count(RUNNER_COUNT_KEYS)?,
    };

    let mut locations = match lookup(fields, FILES_KEYS) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| DeclaredLocation::new(stringify(v)))
            .collect(),
        Some(other) => {
            return Err(invalid(format!(
                "entry '{name}': 'files' must be a list, got {}",
                type_name(other)
            )))
        }
        None => Vec::new(),
    };

    if let (Some(stream), Some(templates)) = (stream.as_deref(), templates) {
        locations.extend(expand_templates(templates, stream, &name, expected));
    }

    let status = lookup(fields, STATUS_KEYS)
        .map(|v| EntryStatus::parse(&stringify(v)))
        .unwrap_or_default();

    let metadata: BTreeMap<String, String> = fields
        .iter()
        .filter(|(k, _)| !RESERVED_KEYS.iter().any(|group| group.contains(&k.as_str())))
        .map(|(k, v)| (k.clone(), stringify(v)))
        .collect();

    Ok(ManifestEntry {
        name,
        category,
        scopes,
        locations,
        expected,
        status,
        metadata,
    })
}

/// Expand manifest-level `locaties` templates for a stream-keyed entry.
///
/// The charter template is always declared; prompt and runner templates only
/// when the entry expects at least one of them.
fn expand_templates(
    templates: &Map<String, Value>,
    stream: &str,
    name: &str,
    expected: ExpectedCounts,
) -> Vec<DeclaredLocation> {
    let wanted = [
        ("charters", true),
        ("prompts", expected.prompts.unwrap_or(0) > 0),
        ("runners", expected.runners.unwrap_or(0) > 0),
    ];

    wanted
        .iter()
        .filter(|(_, include)| *include)
        .filter_map(|(key, _)| templates.get(*key).and_then(Value::as_str))
        .map(|template| {
            DeclaredLocation::new(
                template
                    .replace(STREAM_PLACEHOLDER, stream)
                    .replace(NAME_PLACEHOLDER, name)
                    .replace(VERB_PLACEHOLDER, "*"),
            )
        })
        .collect()
}

fn parse_count(fields: &Map<String, Value>, keys: &[&str]) -> Result<Option<u32>, String> {
    match lookup(fields, keys) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| format!("'{}' must be a non-negative integer", keys[0])),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("'{}' must be a non-negative integer", keys[0])),
        Some(other) => Err(format!(
            "'{}' must be a non-negative integer, got {}",
            keys[0],
            type_name(other)
        )),
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// First candidate key holding a non-null value.
fn lookup<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| fields.get(*k))
        .find(|v| !v.is_null())
}

/// Strings verbatim, everything else in its JSON rendering.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn list_root_files(root: &Path) -> String {
    let Ok(entries) = std::fs::read_dir(root) else {
        return "<unreadable>".to_string();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    if names.is_empty() {
        "<none>".to_string()
    } else {
        names.join(", ")
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocationKind;
    use std::path::PathBuf;

    fn parse_json(text: &str) -> Result<Manifest, ManifestError> {
        parse_manifest(text, ManifestFormat::Json, &PathBuf::from("agents.json"))
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ManifestFormat::from_path(Path::new("a.yaml")), ManifestFormat::Yaml);
        assert_eq!(ManifestFormat::from_path(Path::new("a.YML")), ManifestFormat::Yaml);
        assert_eq!(ManifestFormat::from_path(Path::new("a.json")), ManifestFormat::Json);
        assert_eq!(ManifestFormat::from_path(Path::new("manifest")), ManifestFormat::Json);
    }

    #[test]
    fn first_alias_wins() {
        let m = parse_json(
            r#"{"agents":[{"name":"primary","agent":"secondary","type":"utility","agent_type":"value-stream"}]}"#,
        )
        .unwrap();
        assert_eq!(m.entries[0].name, "primary");
        assert_eq!(m.entries[0].category, Category::Universal);
    }

    #[test]
    fn null_alias_falls_through_to_next_candidate() {
        let m = parse_json(r#"{"agents":[{"name":null,"agent":"fallback","type":"utility"}]}"#)
            .unwrap();
        assert_eq!(m.entries[0].name, "fallback");
    }

    #[test]
    fn unknown_fields_fold_into_metadata() {
        let m = parse_json(
            r#"{"agents":[{"name":"a","type":"utility","version":"1.2.0","owner":{"team":"x"},"status":"active"}]}"#,
        )
        .unwrap();
        let meta = &m.entries[0].metadata;
        assert_eq!(meta.get("version").map(String::as_str), Some("1.2.0"));
        assert_eq!(meta.get("owner").map(String::as_str), Some(r#"{"team":"x"}"#));
        assert_eq!(meta.get("status").map(String::as_str), Some("active"));
        assert!(!meta.contains_key("name"));
        assert!(!meta.contains_key("type"));
    }

    #[test]
    fn scopes_and_category_are_lowercased() {
        let m = parse_json(
            r#"{"agents":[{"name":"a","type":"Value-Stream","value_streams":["Finance","SALES"]}]}"#,
        )
        .unwrap();
        assert_eq!(m.entries[0].category, Category::Scoped);
        assert_eq!(m.entries[0].scopes, vec!["finance", "sales"]);
    }

    #[test]
    fn stream_keyed_dialect_expands_templates() {
        let m = parse_json(
            r#"{
                "versie": "2026-01-18",
                "publicatiedatum": "2026-01-18T12:00:00Z",
                "locaties": {
                    "charters": "exports/<value-stream>/charters-agents/charter.<agent-naam>.md",
                    "prompts": "exports/<value-stream>/prompts/<agent-naam>-<werkwoord>.prompt.md",
                    "runners": "exports/<value-stream>/runners/<agent-naam>"
                },
                "agents": [
                    {"naam": "moeder", "valueStream": "utility", "aantalPrompts": 3, "aantalRunners": 1},
                    {"naam": "schrijver", "valueStream": "kennispublicatie", "aantalPrompts": 0}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(m.meta.version, "2026-01-18");
        assert_eq!(m.meta.published_at, "2026-01-18T12:00:00Z");

        let moeder = &m.entries[0];
        assert_eq!(moeder.category, Category::Universal);
        assert_eq!(moeder.scopes, vec!["*"]);
        let templates: Vec<&str> = moeder.locations.iter().map(|l| l.template.as_str()).collect();
        assert_eq!(
            templates,
            vec![
                "exports/utility/charters-agents/charter.moeder.md",
                "exports/utility/prompts/moeder-*.prompt.md",
                "exports/utility/runners/moeder",
            ]
        );
        assert_eq!(moeder.locations[1].kind, LocationKind::Prompt);
        assert_eq!(moeder.expected.prompts, Some(3));

        let schrijver = &m.entries[1];
        assert_eq!(schrijver.category, Category::Scoped);
        assert_eq!(schrijver.scopes, vec!["kennispublicatie"]);
        assert_eq!(schrijver.locations.len(), 1, "prompts skipped when count is 0");
    }

    #[test]
    fn missing_type_is_invalid_entry_with_index() {
        let err = parse_json(r#"{"agents":[{"name":"ok","type":"utility"},{"name":"bad"}]}"#)
            .unwrap_err();
        match err {
            ManifestError::InvalidEntry { index, message } => {
                assert_eq!(index, 1);
                assert!(message.contains("type"), "got: {message}");
            }
            other => panic!("expected InvalidEntry, got {other:?}"),
        }
    }

    #[test]
    fn unknown_category_is_invalid_entry() {
        let err = parse_json(r#"{"agents":[{"name":"a","type":"plugin"}]}"#).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidEntry { index: 0, .. }));
    }

    #[test]
    fn non_numeric_count_is_invalid_entry() {
        let err = parse_json(r#"{"agents":[{"name":"a","type":"utility","aantalPrompts":"many"}]}"#)
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidEntry { index: 0, .. }));
    }

    #[test]
    fn yaml_manifest_parses() {
        let text = "version: '3'\nagents:\n  - name: linter\n    type: utility\n    files:\n      - tools/linter.py\n";
        let m = parse_manifest(text, ManifestFormat::Yaml, Path::new("agents.yaml")).unwrap();
        assert_eq!(m.meta.version, "3");
        assert_eq!(m.entries[0].locations[0].template, "tools/linter.py");
        assert_eq!(m.entries[0].locations[0].kind, LocationKind::Runner);
    }
}
