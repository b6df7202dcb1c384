//! Destination layout and the file routing table.
//!
//! | Extension | Name contains | Bucket     | Default root        |
//! |-----------|---------------|------------|---------------------|
//! | `.md`     | `charter`     | `Document` | `charters-agents/`  |
//! | `.md`     | `prompt`      | `Prompt`   | `.github/prompts/`  |
//! | `.py`     | (any)         | `Script`   | `scripts/`          |
//!
//! Rules are evaluated top to bottom; the first match wins. Files matching no
//! rule are skipped by the sync engine.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use agentsync_core::LayoutConfig;

/// Extension of runner scripts, without the dot.
pub const RUNNER_EXTENSION: &str = "py";

/// File expected inside every runner module.
pub const MODULE_MARKER: &str = "__init__.py";

/// Path segment that turns a declared directory into a whole-directory module.
pub const RUNNERS_SEGMENT: &str = "runners";

/// Destination category of a resolved file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Document,
    Prompt,
    Script,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Document => write!(f, "document"),
            Bucket::Prompt => write!(f, "prompt"),
            Bucket::Script => write!(f, "script"),
        }
    }
}

/// One row of the routing table.
#[derive(Debug, Clone, Copy)]
pub struct RoutingRule {
    /// Lower-case extension without the dot.
    pub extension: &'static str,
    /// Lower-case substring the file name must contain, if any.
    pub marker: Option<&'static str>,
    pub bucket: Bucket,
}

impl RoutingRule {
    fn matches(&self, extension: &str, file_name: &str) -> bool {
        extension == self.extension && self.marker.map_or(true, |m| file_name.contains(m))
    }
}

pub const ROUTES: &[RoutingRule] = &[
    RoutingRule {
        extension: "md",
        marker: Some("charter"),
        bucket: Bucket::Document,
    },
    RoutingRule {
        extension: "md",
        marker: Some("prompt"),
        bucket: Bucket::Prompt,
    },
    RoutingRule {
        extension: RUNNER_EXTENSION,
        marker: None,
        bucket: Bucket::Script,
    },
];

/// Route a source file to its bucket. `None` means "not synced".
pub fn route(path: &Path) -> Option<Bucket> {
    let file_name = path.file_name()?.to_string_lossy().to_lowercase();
    let extension = path.extension()?.to_string_lossy().to_lowercase();
    ROUTES
        .iter()
        .find(|rule| rule.matches(&extension, &file_name))
        .map(|rule| rule.bucket)
}

/// Whether `path` has the runner-script extension.
pub fn is_runner_script(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(RUNNER_EXTENSION))
        .unwrap_or(false)
}

/// Absolute destination roots inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub workspace: PathBuf,
    pub documents: PathBuf,
    pub prompts: PathBuf,
    pub scripts: PathBuf,
}

impl Layout {
    pub fn new(workspace: impl Into<PathBuf>, config: &LayoutConfig) -> Self {
        let workspace = workspace.into();
        Self {
            documents: workspace.join(&config.documents),
            prompts: workspace.join(&config.prompts),
            scripts: workspace.join(&config.scripts),
            workspace,
        }
    }

    pub fn root_for(&self, bucket: Bucket) -> &Path {
        match bucket {
            Bucket::Document => &self.documents,
            Bucket::Prompt => &self.prompts,
            Bucket::Script => &self.scripts,
        }
    }

    /// Flattened destination: `<root>/<file name>`.
    pub fn destination_for(&self, bucket: Bucket, source: &Path) -> Option<PathBuf> {
        Some(self.root_for(bucket).join(source.file_name()?))
    }

    /// Modules always land directly under the script root.
    pub fn module_destination(&self, module_source: &Path) -> Option<PathBuf> {
        Some(self.scripts.join(module_source.file_name()?))
    }

    /// `path` relative to the workspace, for display.
    pub fn display_path<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.workspace).unwrap_or(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_table_order() {
        assert_eq!(route(Path::new("charter.writer.md")), Some(Bucket::Document));
        assert_eq!(route(Path::new("writer-schrijf.prompt.md")), Some(Bucket::Prompt));
        assert_eq!(route(Path::new("Charter-Prompt.MD")), Some(Bucket::Document));
        assert_eq!(route(Path::new("writer.py")), Some(Bucket::Script));
        assert_eq!(route(Path::new("README.md")), None);
        assert_eq!(route(Path::new("notes.txt")), None);
        assert_eq!(route(Path::new("Makefile")), None);
    }

    #[test]
    fn default_layout_roots() {
        let layout = Layout::new("/ws", &LayoutConfig::default());
        assert_eq!(layout.documents, PathBuf::from("/ws/charters-agents"));
        assert_eq!(layout.prompts, PathBuf::from("/ws/.github/prompts"));
        assert_eq!(layout.scripts, PathBuf::from("/ws/scripts"));
        assert_eq!(
            layout.destination_for(Bucket::Prompt, Path::new("/src/x/a.prompt.md")),
            Some(PathBuf::from("/ws/.github/prompts/a.prompt.md"))
        );
        assert_eq!(
            layout.module_destination(Path::new("/src/exports/utility/runners/moeder")),
            Some(PathBuf::from("/ws/scripts/moeder"))
        );
    }
}
