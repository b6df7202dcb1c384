//! Domain types for the agent manifest.
//!
//! A [`ManifestEntry`] is built once per manifest parse and never mutated
//! afterwards. All scope strings are lower-cased at load time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scope marker meaning "applies to every value-stream".
pub const WILDCARD_SCOPE: &str = "*";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A lower-cased value-stream classifier (e.g. `kennispublicatie`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamName(pub String);

impl StreamName {
    /// Normalise user input: strips stray shell quotes and lower-cases.
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().trim_matches(|c| c == '\'' || c == '"').to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for StreamName {
    fn from(s: &str) -> Self {
        Self::normalize(s)
    }
}

impl From<String> for StreamName {
    fn from(s: String) -> Self {
        Self::normalize(&s)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Whether an entry is universal ("utility") or scoped to value-streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Universal,
    Scoped,
}

impl Category {
    /// Parse the manifest spellings of a category. Input must already be
    /// lower-cased.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "utility" | "universal" => Some(Self::Universal),
            "value-stream" | "value_stream" | "valuestream" | "scoped" | "stream" => {
                Some(Self::Scoped)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Universal => write!(f, "utility"),
            Category::Scoped => write!(f, "value-stream"),
        }
    }
}

/// Lifecycle status of an entry. Deprecated entries are never applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    #[default]
    Active,
    Deprecated,
}

impl EntryStatus {
    /// Anything other than `deprecated` (case-insensitive) counts as active.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("deprecated") {
            Self::Deprecated
        } else {
            Self::Active
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Active => write!(f, "active"),
            EntryStatus::Deprecated => write!(f, "deprecated"),
        }
    }
}

/// The kind of artifact a declared location is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Document,
    Prompt,
    Runner,
}

impl LocationKind {
    /// Infer the kind from the final segment of a path template.
    pub fn infer(template: &str) -> Self {
        let file_name = template
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(template)
            .to_lowercase();
        if file_name.ends_with(".md") {
            if file_name.contains("prompt") {
                Self::Prompt
            } else {
                Self::Document
            }
        } else {
            Self::Runner
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A path template relative to the source root.
///
/// May contain `<value-stream>` and `<agent-naam>` placeholders and a
/// wildcard in its final segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredLocation {
    pub template: String,
    pub kind: LocationKind,
}

impl DeclaredLocation {
    pub fn new(template: impl Into<String>) -> Self {
        let template = template.into();
        let kind = LocationKind::infer(&template);
        Self { template, kind }
    }
}

/// Optional count hints. They only decide whether a zero-match wildcard is
/// reported as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpectedCounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runners: Option<u32>,
}

impl ExpectedCounts {
    /// Hint relevant to a location of the given kind. Documents have none.
    pub fn for_kind(&self, kind: LocationKind) -> Option<u32> {
        match kind {
            LocationKind::Prompt => self.prompts,
            LocationKind::Runner => self.runners,
            LocationKind::Document => None,
        }
    }
}

/// One declared artifact from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub category: Category,
    /// Lower-cased stream names or [`WILDCARD_SCOPE`]. Empty means universal.
    pub scopes: Vec<String>,
    pub locations: Vec<DeclaredLocation>,
    pub expected: ExpectedCounts,
    pub status: EntryStatus,
    /// Everything the loader did not recognise, stringified.
    pub metadata: BTreeMap<String, String>,
}

impl ManifestEntry {
    pub fn has_wildcard_scope(&self) -> bool {
        self.scopes.iter().any(|s| s == WILDCARD_SCOPE)
    }

    /// First scope that is not the wildcard marker.
    pub fn first_concrete_scope(&self) -> Option<&str> {
        self.scopes
            .iter()
            .map(String::as_str)
            .find(|s| *s != WILDCARD_SCOPE)
    }

    pub fn version(&self) -> &str {
        self.metadata
            .get("version")
            .map(String::as_str)
            .unwrap_or("unspecified")
    }
}

/// Manifest-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMeta {
    pub version: String,
    pub published_at: String,
    pub entry_count: usize,
}

/// Result of loading a manifest document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub meta: ManifestMeta,
    pub entries: Vec<ManifestEntry>,
    /// Non-fatal loader warnings, in entry order.
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_name_strips_quotes_and_lowercases() {
        assert_eq!(StreamName::from("'Finance'").as_str(), "finance");
        assert_eq!(StreamName::from("\"IT-Development\"").as_str(), "it-development");
    }

    #[test]
    fn category_spellings() {
        assert_eq!(Category::parse("utility"), Some(Category::Universal));
        assert_eq!(Category::parse("value-stream"), Some(Category::Scoped));
        assert_eq!(Category::parse("scoped"), Some(Category::Scoped));
        assert_eq!(Category::parse("plugin"), None);
    }

    #[test]
    fn location_kind_inference() {
        assert_eq!(
            LocationKind::infer("exports/x/prompts/a.prompt.md"),
            LocationKind::Prompt
        );
        assert_eq!(
            LocationKind::infer("exports/x/charters-agents/charter.a.md"),
            LocationKind::Document
        );
        assert_eq!(LocationKind::infer("exports/x/runners/a.py"), LocationKind::Runner);
        assert_eq!(LocationKind::infer("exports/x/runners/moeder"), LocationKind::Runner);
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(EntryStatus::parse("Deprecated"), EntryStatus::Deprecated);
        assert_eq!(EntryStatus::parse("active"), EntryStatus::Active);
        assert_eq!(EntryStatus::parse("beta"), EntryStatus::Active);
    }

    #[test]
    fn expected_counts_by_kind() {
        let counts = ExpectedCounts { prompts: Some(2), runners: Some(0) };
        assert_eq!(counts.for_kind(LocationKind::Prompt), Some(2));
        assert_eq!(counts.for_kind(LocationKind::Runner), Some(0));
        assert_eq!(counts.for_kind(LocationKind::Document), None);
    }
}
