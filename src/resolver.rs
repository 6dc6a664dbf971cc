//! Maps changed files to the set of test scopes worth re-running.

use crate::snapshot::Snapshot;
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Suffix (before the extension) that marks a file as a test.
pub const TEST_SUFFIX: &str = "_test";

/// Token handed to `go test` for a whole-tree run.
pub const TREE_SENTINEL: &str = "./...";

/// A directory to re-test, or the whole-tree sentinel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    Dir(PathBuf),
    Tree,
}

impl Scope {
    /// Argument form passed to the test command.
    pub fn as_arg(&self) -> String {
        match self {
            Scope::Dir(dir) => dir.to_string_lossy().into_owned(),
            Scope::Tree => TREE_SENTINEL.to_string(),
        }
    }

    /// Short label for notifications and log lines.
    pub fn label(&self) -> String {
        match self {
            Scope::Dir(dir) => dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.to_string_lossy().into_owned()),
            Scope::Tree => TREE_SENTINEL.to_string(),
        }
    }
}

/// What to do with a changed file that has no test counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Log a notice and skip the file.
    #[default]
    Skip,
    /// Assume the test layout differs from the naming convention and
    /// escalate to a whole-tree run.
    Smart,
}

/// Scope-resolution settings for one dispatcher instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvePolicy {
    pub fallback: FallbackPolicy,
    /// Collapse every cycle's scopes to a single whole-tree run.
    pub full: bool,
}

/// True when the file name carries the `_test.go` convention.
pub fn is_test_file(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with(TEST_SUFFIX))
}

/// Path of the sibling test file for a regular source file.
pub fn sibling_test_file(path: &Path) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    let dir = path.parent()?;
    Some(dir.join(format!("{stem}{TEST_SUFFIX}.{ext}")))
}

/// Decide the scope implied by one modified path, if any.
///
/// A test file always re-tests its own directory. A regular file re-tests
/// its directory iff its sibling test exists in the snapshot (a membership
/// lookup, never a directory re-walk). Otherwise the fallback policy
/// applies.
pub fn resolve_one(path: &Path, snapshot: &Snapshot, policy: &ResolvePolicy) -> Option<Scope> {
    let dir = path.parent()?.to_path_buf();

    if is_test_file(path) {
        return Some(Scope::Dir(dir));
    }
    if let Some(test_path) = sibling_test_file(path) {
        if snapshot.contains(&test_path) {
            return Some(Scope::Dir(dir));
        }
    }
    match policy.fallback {
        FallbackPolicy::Smart => Some(Scope::Tree),
        FallbackPolicy::Skip => {
            eprintln!(
                "{}: no tests found for {}",
                "Info".blue(),
                path.display()
            );
            None
        }
    }
}

/// Resolve a cycle's modified paths into a deduplicated scope set.
///
/// Five changed files in one directory come out as exactly one scope. Under
/// `full`, any non-empty result collapses to the whole-tree sentinel.
pub fn resolve_all(
    modified: &[PathBuf],
    snapshot: &Snapshot,
    policy: &ResolvePolicy,
) -> BTreeSet<Scope> {
    let mut scopes = BTreeSet::new();
    for path in modified {
        if let Some(scope) = resolve_one(path, snapshot, policy) {
            scopes.insert(scope);
        }
    }
    if policy.full && !scopes.is_empty() {
        scopes.clear();
        scopes.insert(Scope::Tree);
    }
    scopes
}
