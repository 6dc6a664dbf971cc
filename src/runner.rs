//! Runs the external test command per scope, recovering from
//! wrong-working-directory failures on whole-tree runs.

use crate::output::{classify, RunOutcome};
use crate::resolver::Scope;
use colored::Colorize;
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// File whose presence marks a directory as a module root.
pub const MODULE_MARKER: &str = "go.mod";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to run test command: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not relocate to '{candidate}'; tests cannot run from here")]
    RecoveryExhausted { candidate: String, output: String },
}

/// Flags forwarded to the test command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Pass `-v`.
    pub verbose: bool,
    /// Pass `-failfast`.
    pub failfast: bool,
    /// Extra arguments appended verbatim.
    pub extra_args: Vec<String>,
}

/// Invokes the test command, one scope at a time, strictly sequentially.
///
/// The program and its leading arguments are injectable so the runner can be
/// exercised without a Go toolchain; production wiring uses `go test`.
pub struct TestRunner {
    program: String,
    leading_args: Vec<String>,
    /// Start directory -> nearest module root. Append-only for the process
    /// lifetime; watched paths are assumed stable while we run.
    root_memo: HashMap<PathBuf, Option<PathBuf>>,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    pub fn new() -> Self {
        Self::with_command("go", &["test"])
    }

    pub fn with_command(program: &str, leading_args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            leading_args: leading_args.iter().map(|s| s.to_string()).collect(),
            root_memo: HashMap::new(),
        }
    }

    /// Run one scope. `origins` are the changed directories behind this
    /// scope; whole-tree runs use them to locate the module root to run
    /// from. Directory scopes run in place, no recovery.
    pub fn run(
        &mut self,
        scope: &Scope,
        origins: &[PathBuf],
        options: &RunOptions,
    ) -> Result<RunOutcome, RunnerError> {
        match scope {
            Scope::Dir(_) => {
                let raw = self.invoke(&scope.as_arg(), options)?;
                Ok(classify(raw))
            }
            Scope::Tree => self.run_tree(origins, options),
        }
    }

    /// Whole-tree run with the recovery state machine.
    ///
    /// Preemptive step: resolve each origin's module root (memoized), pick
    /// the deepest, and switch into it when it differs from the current
    /// directory. If no root was found, the run is eligible for redirect
    /// recovery: a known failure signature names the directory the tool
    /// expected, and we retry from there once. The bounded loop with the
    /// `redirected` flag makes termination structural: at most one redirect
    /// per logical run.
    fn run_tree(
        &mut self,
        origins: &[PathBuf],
        options: &RunOptions,
    ) -> Result<RunOutcome, RunnerError> {
        let guard = CwdGuard::capture()?;

        let mut redirected = false;
        if let Some(root) = self.deepest_module_root(origins) {
            if root != *guard.original() {
                env::set_current_dir(&root)?;
            }
            redirected = true;
        }

        loop {
            let raw = self.invoke(crate::resolver::TREE_SENTINEL, options)?;
            if redirected {
                return Ok(classify(raw));
            }
            let Some(candidate) = extract_redirect(&raw) else {
                return Ok(classify(raw));
            };
            if chdir_to_candidate(guard.original(), &candidate) {
                redirected = true;
                continue;
            }
            return Err(RunnerError::RecoveryExhausted {
                candidate,
                output: raw,
            });
        }
        // guard drops here, restoring the original working directory on
        // every path out of this function.
    }

    fn invoke(&self, scope_arg: &str, options: &RunOptions) -> std::io::Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args);
        if options.verbose {
            cmd.arg("-v");
        }
        if options.failfast {
            cmd.arg("-failfast");
        }
        cmd.args(&options.extra_args);
        cmd.arg(scope_arg);

        let output = cmd.output()?;
        let mut raw = String::from_utf8_lossy(&output.stdout).into_owned();
        raw.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(raw)
    }

    /// Nearest ancestor of `start` containing the module marker, memoized.
    pub fn module_root(&mut self, start: &Path) -> Option<PathBuf> {
        if let Some(cached) = self.root_memo.get(start) {
            return cached.clone();
        }
        let found = find_module_root(start);
        self.root_memo.insert(start.to_path_buf(), found.clone());
        found
    }

    /// Deepest module root among the changed directories: the longest
    /// resolved path wins, anchoring `./...` as close to the changes as a
    /// single run allows.
    fn deepest_module_root(&mut self, origins: &[PathBuf]) -> Option<PathBuf> {
        origins
            .iter()
            .filter_map(|dir| self.module_root(dir))
            .max_by_key(|root| root.as_os_str().len())
    }
}

/// Upward probe for the module marker file.
fn find_module_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join(MODULE_MARKER).is_file() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// Known wrong-working-directory signatures, in priority order, each with
/// the capture group naming the path the tool expected. Fragile against the
/// toolchain's message wording, which is why it lives in one table.
fn signature_table() -> Vec<(Regex, usize)> {
    vec![
        (
            Regex::new(r#"cannot import absolute path "?([^"\s]+)"?"#).unwrap(),
            1,
        ),
        (Regex::new(r"package (\S+) is not in GOROOT").unwrap(), 1),
        (
            Regex::new(r"directory (\S+) is outside main module").unwrap(),
            1,
        ),
    ]
}

/// Extract the redirect candidate from failure output, if any signature
/// matches. First match in table order wins.
pub fn extract_redirect(raw: &str) -> Option<String> {
    for (pattern, group) in signature_table() {
        if let Some(caps) = pattern.captures(raw) {
            if let Some(m) = caps.get(group) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}

/// The three directory forms tried for a redirect candidate, in order:
/// verbatim, under the original working directory, under its `vendor`
/// subdirectory.
pub fn candidate_dirs(original_cwd: &Path, candidate: &str) -> [PathBuf; 3] {
    [
        PathBuf::from(candidate),
        original_cwd.join(candidate),
        original_cwd.join("vendor").join(candidate),
    ]
}

/// Try to change into one of the candidate forms. Returns whether any
/// succeeded.
fn chdir_to_candidate(original_cwd: &Path, candidate: &str) -> bool {
    candidate_dirs(original_cwd, candidate)
        .iter()
        .any(|dir| env::set_current_dir(dir).is_ok())
}

/// Scoped ownership of the process working directory: captures it on
/// creation and restores it on drop, covering every exit path including
/// recovery exhaustion.
struct CwdGuard {
    original: PathBuf,
}

impl CwdGuard {
    fn capture() -> std::io::Result<Self> {
        Ok(Self {
            original: env::current_dir()?,
        })
    }

    fn original(&self) -> &PathBuf {
        &self.original
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.original) {
            eprintln!(
                "{}: failed to restore working directory {}: {}",
                "Warning".yellow(),
                self.original.display(),
                e
            );
        }
    }
}
