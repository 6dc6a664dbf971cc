//! Snapshot of watched source files and the diff between scan cycles.

use anyhow::{Context, Result};
use colored::Colorize;
use globset::GlobSet;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// Extension of the files the snapshotter records. Everything else is
/// invisible, including for sibling-test existence checks.
pub const SOURCE_EXTENSION: &str = "go";

/// Path -> last-modified time for every recognized source file.
///
/// The dispatch loop owns one long-lived `Snapshot` and mutates it in place
/// as changes are observed; it is never wholesale replaced after the first
/// walk. Deleted files keep their last recorded entry for the lifetime of
/// the process (documented limitation, see DESIGN.md).
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    files: HashMap<PathBuf, SystemTime>,
}

/// Per-cycle classification of freshly walked paths.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// Paths seen for the first time. Recorded, but they never trigger a
    /// run: a file must exist in a prior cycle before it can be "changed".
    pub added: Vec<PathBuf>,
    /// Paths whose modification time moved since the previous cycle.
    pub modified: Vec<PathBuf>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn insert(&mut self, path: PathBuf, mtime: SystemTime) {
        self.files.insert(path, mtime);
    }

    pub fn mtime(&self, path: &Path) -> Option<SystemTime> {
        self.files.get(path).copied()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.keys()
    }

    /// Compare a freshly walked snapshot against this one and absorb it.
    ///
    /// New paths are inserted, changed timestamps are updated, equal
    /// timestamps are skipped. Paths present here but missing from `fresh`
    /// (deletions) are left untouched. Pure map work, no I/O.
    pub fn diff_absorb(&mut self, fresh: Snapshot) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for (path, mtime) in fresh.files {
            match self.files.get(&path) {
                None => {
                    self.files.insert(path.clone(), mtime);
                    changes.added.push(path);
                }
                Some(previous) if *previous != mtime => {
                    self.files.insert(path.clone(), mtime);
                    changes.modified.push(path);
                }
                Some(_) => {}
            }
        }
        changes
    }
}

/// Walk `root` and record every `.go` file's modification time.
///
/// An unreadable root is an error; a single entry failing mid-walk (deleted
/// between listing and stat, permission hiccup) is logged and skipped so the
/// rest of the cycle proceeds.
pub fn walk(root: &Path, ignore_set: Option<&GlobSet>) -> Result<Snapshot> {
    if !root.is_dir() {
        anyhow::bail!("not a directory: {}", root.display());
    }

    let mut snapshot = Snapshot::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                eprintln!("{}: skipping unreadable entry: {}", "Warning".yellow(), e);
                continue;
            }
        };
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
            continue;
        }
        if let Some(set) = ignore_set {
            if set.is_match(path) {
                continue;
            }
        }
        let mtime = match entry
            .metadata()
            .map_err(|e| e.to_string())
            .and_then(|m| m.modified().map_err(|e| e.to_string()))
        {
            Ok(t) => t,
            Err(e) => {
                eprintln!(
                    "{}: could not stat {}: {}",
                    "Warning".yellow(),
                    path.display(),
                    e
                );
                continue;
            }
        };
        snapshot.insert(path.to_path_buf(), mtime);
    }

    Ok(snapshot)
}

/// Walk with a friendlier error for the startup path.
pub fn initial_walk(root: &Path, ignore_set: Option<&GlobSet>) -> Result<Snapshot> {
    walk(root, ignore_set).with_context(|| format!("failed to scan {}", root.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "package x\n").unwrap();
        path
    }

    #[test]
    fn walk_records_only_go_files() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "main.go");
        touch(dir.path(), "pkg/util.go");
        touch(dir.path(), "pkg/util_test.go");
        touch(dir.path(), "README.md");
        touch(dir.path(), "notes.txt");

        let snapshot = walk(dir.path(), None).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.contains(&dir.path().join("main.go")));
        assert!(snapshot.contains(&dir.path().join("pkg/util_test.go")));
        assert!(!snapshot.contains(&dir.path().join("README.md")));
    }

    #[test]
    fn walk_missing_root_errors() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("nope");
        assert!(walk(&gone, None).is_err());
    }

    #[test]
    fn walk_honors_ignore_globs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "main.go");
        touch(dir.path(), "vendor/dep/dep.go");

        let set = crate::config::build_ignore_set(&["**/vendor/**".to_string()]).unwrap();
        let snapshot = walk(dir.path(), Some(&set)).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&dir.path().join("main.go")));
    }

    #[test]
    fn first_diff_reports_everything_as_added() {
        let mut previous = Snapshot::new();
        let mut fresh = Snapshot::new();
        fresh.insert(PathBuf::from("/w/a.go"), UNIX_EPOCH);
        fresh.insert(PathBuf::from("/w/b.go"), UNIX_EPOCH);

        let changes = previous.diff_absorb(fresh);
        assert_eq!(changes.added.len(), 2);
        assert!(changes.modified.is_empty());
        assert_eq!(previous.len(), 2);
    }

    #[test]
    fn equal_timestamps_never_trigger() {
        let t = UNIX_EPOCH + Duration::from_secs(100);
        let mut previous = Snapshot::new();
        previous.insert(PathBuf::from("/w/a.go"), t);
        let mut fresh = Snapshot::new();
        fresh.insert(PathBuf::from("/w/a.go"), t);

        let changes = previous.diff_absorb(fresh);
        assert!(changes.added.is_empty());
        assert!(changes.modified.is_empty());
    }

    #[test]
    fn moved_timestamp_is_modified_and_absorbed() {
        let t0 = UNIX_EPOCH + Duration::from_secs(100);
        let t1 = UNIX_EPOCH + Duration::from_secs(200);
        let mut previous = Snapshot::new();
        previous.insert(PathBuf::from("/w/a.go"), t0);
        let mut fresh = Snapshot::new();
        fresh.insert(PathBuf::from("/w/a.go"), t1);

        let changes = previous.diff_absorb(fresh);
        assert_eq!(changes.modified, vec![PathBuf::from("/w/a.go")]);
        assert_eq!(previous.mtime(Path::new("/w/a.go")), Some(t1));
    }

    #[test]
    fn deletions_stay_in_snapshot() {
        let t = UNIX_EPOCH + Duration::from_secs(100);
        let mut previous = Snapshot::new();
        previous.insert(PathBuf::from("/w/gone.go"), t);

        let changes = previous.diff_absorb(Snapshot::new());
        assert!(changes.added.is_empty());
        assert!(changes.modified.is_empty());
        assert!(previous.contains(Path::new("/w/gone.go")));
    }
}
