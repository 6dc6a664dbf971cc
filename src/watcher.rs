//! The dispatch loop: tick, scan, diff, resolve, run, report.

use crate::notifier::Notifier;
use crate::output::{print_rendered, reformat};
use crate::resolver::{resolve_all, ResolvePolicy, Scope};
use crate::runner::{RunOptions, RunnerError, TestRunner};
use crate::snapshot::{self, Snapshot};
use colored::Colorize;
use globset::GlobSet;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{sync_channel, Receiver, TrySendError};
use std::thread;
use std::time::Duration;

/// Everything one dispatcher instance owns. Explicitly constructed and
/// threaded through the loop; there is no process-global watch state.
pub struct Dispatcher {
    root: PathBuf,
    snapshot: Snapshot,
    runner: TestRunner,
    notifier: Box<dyn Notifier>,
    policy: ResolvePolicy,
    options: RunOptions,
    ignore_set: Option<GlobSet>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root: PathBuf,
        snapshot: Snapshot,
        runner: TestRunner,
        notifier: Box<dyn Notifier>,
        policy: ResolvePolicy,
        options: RunOptions,
        ignore_set: Option<GlobSet>,
    ) -> Self {
        Self {
            root,
            snapshot,
            runner,
            notifier,
            policy,
            options,
            ignore_set,
        }
    }

    /// One scan cycle: walk, diff against the persisted snapshot, resolve
    /// scopes, run each scope sequentially, report. Errors are contained
    /// here; nothing escapes into the next cycle.
    pub fn cycle(&mut self) {
        let fresh = match snapshot::walk(&self.root, self.ignore_set.as_ref()) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{}: scan failed: {:#}", "Warning".yellow(), e);
                return;
            }
        };

        let changes = self.snapshot.diff_absorb(fresh);
        if changes.modified.is_empty() {
            return;
        }

        let scopes = resolve_all(&changes.modified, &self.snapshot, &self.policy);
        if scopes.is_empty() {
            return;
        }

        let origins = origin_dirs(&changes.modified);
        for scope in &scopes {
            self.run_scope(scope, &origins);
        }
    }

    fn run_scope(&mut self, scope: &Scope, origins: &[PathBuf]) {
        eprintln!("{}: testing {}", "Info".blue(), scope.as_arg());
        match self.runner.run(scope, origins, &self.options) {
            Ok(outcome) => {
                print_rendered(&reformat(&outcome.raw));
                let summary = outcome.summary();
                if outcome.is_clean() {
                    eprintln!("{}: {}", "Pass".green().bold(), summary);
                } else {
                    eprintln!("{}: {}", "Fail".red().bold(), summary);
                }
                self.notifier.notify(&summary, &scope.label());
            }
            Err(RunnerError::RecoveryExhausted { candidate, output }) => {
                print_rendered(&reformat(&output));
                eprintln!(
                    "{}: could not relocate to '{}'; giving up on {}",
                    "Error".red().bold(),
                    candidate,
                    scope.as_arg()
                );
            }
            Err(RunnerError::Io(e)) => {
                eprintln!("{}: test command failed to start: {}", "Error".red(), e);
            }
        }
    }

    /// Block on the ticker forever. A tick that lands while a cycle is in
    /// flight is dropped, so a slow test run absorbs the backlog and the
    /// next scan starts only after the current cycle completes.
    pub fn run_loop(mut self, interval: Duration) -> ! {
        let ticks = ticker(interval);
        loop {
            match ticks.recv() {
                Ok(()) => self.cycle(),
                // The ticker thread never exits before we do.
                Err(_) => unreachable!("ticker thread disconnected"),
            }
        }
    }
}

/// Distinct parent directories of the changed files, for module-root
/// location on whole-tree runs.
fn origin_dirs(modified: &[PathBuf]) -> Vec<PathBuf> {
    let dirs: BTreeSet<PathBuf> = modified
        .iter()
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();
    dirs.into_iter().collect()
}

/// Fixed-interval tick source with a pending buffer of exactly one.
/// `try_send` drops ticks while the receiver is busy rather than queueing
/// them.
fn ticker(interval: Duration) -> Receiver<()> {
    let (tx, rx) = sync_channel(1);
    thread::spawn(move || loop {
        thread::sleep(interval);
        match tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => break,
        }
    });
    rx
}
