//! Applicability filter: which manifest entries apply to a value-stream.
//!
//! Rule, per entry:
//! 1. `deprecated` ⇒ skipped.
//! 2. universal and (no scopes, `*`, or the target) ⇒ applicable.
//! 3. scoped and (the target or `*`) ⇒ applicable.
//! 4. otherwise skipped.
//!
//! Pure and order-preserving.

use std::collections::BTreeSet;

use crate::types::{Category, EntryStatus, ManifestEntry, StreamName, WILDCARD_SCOPE};

/// Why an entry was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Deprecated,
    NotApplicable,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Deprecated => "deprecated",
            SkipReason::NotApplicable => "not_applicable",
        }
    }
}

/// Output of [`filter_applicable`]. Both lists keep manifest order.
#[derive(Debug, Clone, Default)]
pub struct Partition<'a> {
    pub applicable: Vec<&'a ManifestEntry>,
    pub skipped: Vec<(&'a ManifestEntry, SkipReason)>,
}

/// Whether `entry` applies to `target`, ignoring status.
pub fn is_applicable(entry: &ManifestEntry, target: &StreamName) -> bool {
    let target = target.as_str();
    let names_target = entry.scopes.iter().any(|s| s == target);
    match entry.category {
        Category::Universal => entry.scopes.is_empty() || entry.has_wildcard_scope() || names_target,
        Category::Scoped => names_target || entry.has_wildcard_scope(),
    }
}

/// Split `entries` into applicable and skipped for `target`.
pub fn filter_applicable<'a>(entries: &'a [ManifestEntry], target: &StreamName) -> Partition<'a> {
    let mut partition = Partition::default();
    for entry in entries {
        if entry.status == EntryStatus::Deprecated {
            partition.skipped.push((entry, SkipReason::Deprecated));
        } else if is_applicable(entry, target) {
            partition.applicable.push(entry);
        } else {
            partition.skipped.push((entry, SkipReason::NotApplicable));
        }
    }
    partition
}

/// Every concrete stream named anywhere in the manifest, sorted and unique.
pub fn derive_streams(entries: &[ManifestEntry]) -> Vec<StreamName> {
    entries
        .iter()
        .flat_map(|e| e.scopes.iter())
        .filter(|s| !s.is_empty() && s.as_str() != WILDCARD_SCOPE)
        .map(|s| StreamName::normalize(s))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
