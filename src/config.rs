//! Configuration: `.tattlerc.json` discovery and the CLI merge.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = ".tattlerc.json";

/// Watch settings from `.tattlerc.json`. Every field is optional in the
/// file; CLI flags override whatever the file sets.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Scan interval in seconds.
    #[serde(default)]
    pub interval: Option<u64>,

    /// Always run the whole tree (`./...`) when anything changes.
    #[serde(default)]
    pub full: bool,

    /// Escalate files with no test counterpart to a whole-tree run.
    #[serde(default)]
    pub smart: bool,

    /// Pass `-v` to the test command.
    #[serde(default)]
    pub verbose: bool,

    /// Pass `-failfast` to the test command.
    #[serde(default)]
    pub failfast: bool,

    /// Deliver desktop notifications.
    #[serde(default)]
    pub notify: bool,

    /// Glob patterns excluded from the snapshot entirely.
    #[serde(default)]
    pub ignore: Vec<String>,

    /// Extra arguments appended to every test invocation.
    #[serde(default)]
    pub args: Vec<String>,
}

/// CLI-side values that take precedence over the config file. `None`/false
/// means the flag was not given.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub interval: Option<u64>,
    pub full: bool,
    pub smart: bool,
    pub verbose: bool,
    pub failfast: bool,
    pub notify: bool,
    pub ignore: Vec<String>,
    pub args: Vec<String>,
}

impl Config {
    /// Merge CLI flags into the file config. Flags win; list-valued options
    /// are appended after the file's entries.
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if cli.interval.is_some() {
            self.interval = cli.interval;
        }
        self.full |= cli.full;
        self.smart |= cli.smart;
        self.verbose |= cli.verbose;
        self.failfast |= cli.failfast;
        self.notify |= cli.notify;
        self.ignore.extend(cli.ignore);
        self.args.extend(cli.args);
        self
    }

    /// Effective interval in seconds (default 5).
    pub fn interval_secs(&self) -> u64 {
        self.interval.unwrap_or(5)
    }
}

/// Find and load the config file: an explicit path, or a search of the
/// watch root and its parents. No file means defaults.
pub fn load_config(work_dir: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(p) = custom_path {
        let path = if p.is_absolute() {
            p.to_path_buf()
        } else {
            work_dir.join(p)
        };
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        Some(path)
    } else {
        find_config_in_parents(work_dir)
    };

    match path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid JSON in config: {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Search for `.tattlerc.json` in a directory and its parents.
fn find_config_in_parents(mut dir: &Path) -> Option<PathBuf> {
    loop {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Build a GlobSet from ignore patterns for path matching.
pub fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("invalid ignore pattern: {pattern}"))?;
        builder.add(glob);
    }
    builder.build().map_err(|e| anyhow::anyhow!("{}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_no_config_file() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.interval_secs(), 5);
        assert!(!config.full);
        assert!(config.ignore.is_empty());
    }

    #[test]
    fn loads_from_parent_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{ "interval": 2, "smart": true, "ignore": ["**/vendor/**"] }"#,
        )
        .unwrap();

        let config = load_config(&nested, None).unwrap();
        assert_eq!(config.interval_secs(), 2);
        assert!(config.smart);
        assert_eq!(config.ignore, vec!["**/vendor/**".to_string()]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "{ nope").unwrap();
        assert!(load_config(dir.path(), None).is_err());
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = load_config(dir.path(), Some(Path::new("missing.json")));
        assert!(err.is_err());
    }

    #[test]
    fn cli_flags_override_file_values() {
        let config = Config {
            interval: Some(10),
            smart: false,
            ignore: vec!["**/gen/**".to_string()],
            ..Config::default()
        };
        let merged = config.merge_with_cli(CliOverrides {
            interval: Some(1),
            smart: true,
            ignore: vec!["**/vendor/**".to_string()],
            ..CliOverrides::default()
        });
        assert_eq!(merged.interval_secs(), 1);
        assert!(merged.smart);
        assert_eq!(merged.ignore.len(), 2);
    }

    #[test]
    fn ignore_set_matches() {
        let set = build_ignore_set(&["**/vendor/**".to_string()]).unwrap();
        assert!(set.is_match(Path::new("proj/vendor/dep/dep.go")));
        assert!(!set.is_match(Path::new("proj/pkg/dep.go")));
    }

    #[test]
    fn bad_glob_is_an_error() {
        assert!(build_ignore_set(&["a{".to_string()]).is_err());
    }
}
