//! Path resolver: declared locations → concrete source paths.
//!
//! For each location of each applicable entry:
//!
//! 1. Substitute `<value-stream>` and `<agent-naam>`.
//! 2. Wildcard in the final segment ⇒ glob the parent directory.
//! 3. Directory under a `runners` segment ⇒ whole-directory module.
//! 4. Other directory ⇒ every runner script beneath it.
//! 5. Plain file ⇒ itself.
//!
//! Missing paths never abort resolution; they accumulate in
//! [`Resolution::missing`]. Read-only: nothing here touches the workspace.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use globset::GlobBuilder;

use agentsync_core::{Category, DeclaredLocation, ManifestEntry, StreamName};

use crate::layout::{self, Bucket, RUNNERS_SEGMENT};
use crate::walk;

const STREAM_PLACEHOLDER: &str = "<value-stream>";
const NAME_PLACEHOLDER: &str = "<agent-naam>";

/// A single source file and where it is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub source: PathBuf,
    /// `None` when no routing rule matches; the engine skips such files.
    pub bucket: Option<Bucket>,
    /// Name of the manifest entry that declared it.
    pub owner: String,
}

/// A runner directory that is replaced as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub source_dir: PathBuf,
    pub owner: String,
}

impl ResolvedModule {
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.source_dir)
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub scoped: Vec<ResolvedFile>,
    pub universal: Vec<ResolvedFile>,
    pub modules: Vec<ResolvedModule>,
    pub missing: Vec<String>,
}

impl Resolution {
    /// True when there is nothing to copy at all.
    pub fn is_empty(&self) -> bool {
        self.scoped.is_empty() && self.universal.is_empty() && self.modules.is_empty()
    }

    /// Scoped files first, then universal files.
    pub fn files(&self) -> impl Iterator<Item = &ResolvedFile> {
        self.scoped.iter().chain(self.universal.iter())
    }

    pub fn in_module(&self, path: &Path) -> bool {
        self.modules.iter().any(|m| m.contains(path))
    }
}

/// Resolve every declared location of `entries` against `source_root`.
pub fn resolve(source_root: &Path, entries: &[&ManifestEntry], target: &StreamName) -> Resolution {
    let mut resolver = Resolver {
        root: source_root,
        out: Resolution::default(),
        seen: HashSet::new(),
    };
    for entry in entries {
        for location in &entry.locations {
            resolver.resolve_location(entry, location, target);
        }
    }
    resolver.out
}

/// Substitute placeholders in a location template.
///
/// `<value-stream>` becomes the target when the entry names it, otherwise
/// the entry's first concrete scope, otherwise the target.
pub fn substitute(template: &str, entry: &ManifestEntry, target: &StreamName) -> String {
    let stream = if entry.scopes.iter().any(|s| s == target.as_str()) {
        target.as_str()
    } else {
        entry.first_concrete_scope().unwrap_or(target.as_str())
    };
    template
        .replace(STREAM_PLACEHOLDER, stream)
        .replace(NAME_PLACEHOLDER, &entry.name)
}

fn has_wildcard(segment: &str) -> bool {
    segment.contains(['*', '?'])
}

struct Resolver<'a> {
    root: &'a Path,
    out: Resolution,
    seen: HashSet<PathBuf>,
}

impl Resolver<'_> {
    fn resolve_location(&mut self, entry: &ManifestEntry, location: &DeclaredLocation, target: &StreamName) {
        let relative = substitute(&location.template, entry, target);
        let relative = relative.trim_start_matches(['/', '\\']);
        let path = self.root.join(relative);

        let wildcard = path
            .file_name()
            .map(|n| has_wildcard(&n.to_string_lossy()))
            .unwrap_or(false);

        if wildcard {
            self.resolve_wildcard(entry, location, &path, relative);
        } else if !path.exists() {
            self.missing(format!("{}: file missing {relative}", entry.name));
        } else {
            self.resolve_existing(entry, path);
        }
    }

    fn resolve_wildcard(
        &mut self,
        entry: &ManifestEntry,
        location: &DeclaredLocation,
        path: &Path,
        relative: &str,
    ) {
        let (Some(parent), Some(pattern)) = (path.parent(), path.file_name()) else {
            self.missing(format!("{}: invalid pattern {relative}", entry.name));
            return;
        };
        if !parent.is_dir() {
            let shown = parent.strip_prefix(self.root).unwrap_or(parent);
            self.missing(format!("{}: dir missing {}", entry.name, shown.display()));
            return;
        }

        let pattern = pattern.to_string_lossy();
        let matcher = match GlobBuilder::new(&pattern).literal_separator(true).build() {
            Ok(glob) => glob.compile_matcher(),
            Err(err) => {
                self.missing(format!("{}: invalid pattern {relative}: {err}", entry.name));
                return;
            }
        };

        // Hidden names only match a pattern that itself starts with a dot.
        let include_hidden = pattern.starts_with('.');
        let matches: Vec<PathBuf> = match walk::sorted_entries(parent) {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| include_hidden || !e.file_name().to_string_lossy().starts_with('.'))
                .filter(|e| matcher.is_match(e.file_name()))
                .map(|e| e.path())
                .collect(),
            Err(err) => {
                self.missing(format!("{}: unreadable dir {relative}: {err}", entry.name));
                return;
            }
        };

        if matches.is_empty() {
            if entry.expected.for_kind(location.kind).unwrap_or(0) > 0 {
                self.missing(format!("{}: no files match {relative}", entry.name));
            } else {
                tracing::debug!(entry = %entry.name, pattern = %relative, "no matches (none expected)");
            }
            return;
        }

        for path in matches {
            self.resolve_existing(entry, path);
        }
    }

    fn resolve_existing(&mut self, entry: &ManifestEntry, path: PathBuf) {
        if !path.is_dir() {
            self.push_file(entry, path);
            return;
        }

        if self.is_runner_module(&path) {
            if self.seen.insert(path.clone()) {
                self.out.modules.push(ResolvedModule {
                    source_dir: path,
                    owner: entry.name.clone(),
                });
            }
            return;
        }

        match walk::collect_files(&path, &layout::is_runner_script) {
            Ok(files) => {
                for file in files {
                    self.push_file(entry, file);
                }
            }
            Err(err) => {
                let shown = path.strip_prefix(self.root).unwrap_or(&path).display().to_string();
                self.missing(format!("{}: unreadable dir {shown}: {err}", entry.name));
            }
        }
    }

    /// A directory is a module when a `runners` segment appears in its path
    /// below the source root.
    fn is_runner_module(&self, dir: &Path) -> bool {
        dir.strip_prefix(self.root)
            .unwrap_or(dir)
            .components()
            .any(|c| matches!(c, Component::Normal(s) if s == RUNNERS_SEGMENT))
    }

    fn push_file(&mut self, entry: &ManifestEntry, source: PathBuf) {
        if !self.seen.insert(source.clone()) {
            return;
        }
        let file = ResolvedFile {
            bucket: layout::route(&source),
            source,
            owner: entry.name.clone(),
        };
        match entry.category {
            Category::Universal => self.out.universal.push(file),
            Category::Scoped => self.out.scoped.push(file),
        }
    }

    fn missing(&mut self, message: String) {
        tracing::warn!("{message}");
        self.out.missing.push(message);
    }
}
