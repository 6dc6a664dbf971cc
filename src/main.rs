//! Tattle CLI: watch a Go tree and re-run tests on change.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tattle::config::{build_ignore_set, load_config, CliOverrides};
use tattle::notifier::platform_notifier;
use tattle::resolver::{FallbackPolicy, ResolvePolicy};
use tattle::runner::{RunOptions, TestRunner};
use tattle::snapshot::initial_walk;
use tattle::watcher::Dispatcher;

/// Tattle: change-triggered test dispatcher for Go projects
#[derive(Parser, Debug)]
#[command(name = "tattle")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root directory to watch (default: current directory)
    path: Option<PathBuf>,

    /// Scan interval in seconds (must be positive)
    #[arg(long, short)]
    interval: Option<u64>,

    /// Always run the whole tree (./...) when anything changes
    #[arg(long)]
    full: bool,

    /// Run the whole tree when a changed file has no test counterpart
    #[arg(long)]
    smart: bool,

    /// Pass -v to go test
    #[arg(long, short)]
    verbose: bool,

    /// Pass -failfast to go test
    #[arg(long)]
    failfast: bool,

    /// Deliver desktop notifications with each result
    #[arg(long, short)]
    notify: bool,

    /// Glob pattern to exclude from watching (repeatable)
    #[arg(long, value_name = "GLOB")]
    ignore: Vec<String>,

    /// Path to config file (default: search .tattlerc.json in the watch
    /// root and parents)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single scan cycle and exit (for scripting)
    #[arg(long)]
    once: bool,

    /// Extra arguments passed through to go test
    #[arg(last = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    let root = match args.path.clone() {
        Some(p) => p,
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    if !root.is_dir() {
        anyhow::bail!("watch root is not a directory: {}", root.display());
    }

    let config = load_config(&root, args.config.as_deref())?.merge_with_cli(CliOverrides {
        interval: args.interval,
        full: args.full,
        smart: args.smart,
        verbose: args.verbose,
        failfast: args.failfast,
        notify: args.notify,
        ignore: args.ignore.clone(),
        args: args.args.clone(),
    });

    let interval_secs = config.interval_secs();
    if interval_secs == 0 {
        anyhow::bail!("scan interval must be positive");
    }

    let ignore_set = if config.ignore.is_empty() {
        None
    } else {
        Some(build_ignore_set(&config.ignore)?)
    };

    // The first walk is the baseline: every file is recorded as seen, none
    // trigger a run. Failure here is fatal, before any watching begins.
    let snapshot = initial_walk(&root, ignore_set.as_ref())?;
    eprintln!(
        "{}: watching {} ({} files, every {}s)",
        "Info".blue(),
        root.display(),
        snapshot.len(),
        interval_secs
    );

    let policy = ResolvePolicy {
        fallback: if config.smart {
            FallbackPolicy::Smart
        } else {
            FallbackPolicy::Skip
        },
        full: config.full,
    };
    let options = RunOptions {
        verbose: config.verbose,
        failfast: config.failfast,
        extra_args: config.args.clone(),
    };

    let mut dispatcher = Dispatcher::new(
        root,
        snapshot,
        TestRunner::new(),
        platform_notifier(config.notify),
        policy,
        options,
        ignore_set,
    );

    if args.once {
        dispatcher.cycle();
        return Ok(ExitCode::SUCCESS);
    }

    dispatcher.run_loop(Duration::from_secs(interval_secs))
}
