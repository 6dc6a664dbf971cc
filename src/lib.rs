//! Tattle: change-triggered test dispatcher for Go projects.
//!
//! Polls a source tree on a fixed interval, diffs modification times
//! against the previous scan, maps changed files to test scopes, runs
//! `go test` per scope, and classifies the output into a pass/fail tally
//! with a readable, color-tagged rendering.

pub mod config;
pub mod notifier;
pub mod output;
pub mod resolver;
pub mod runner;
pub mod snapshot;
pub mod watcher;

pub use output::RunOutcome;
pub use resolver::Scope;
pub use snapshot::Snapshot;
