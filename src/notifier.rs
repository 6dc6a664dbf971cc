//! Desktop notification delivery, selected per platform at startup.

use colored::Colorize;
use std::process::Command;

/// Capability to deliver a test-result notification. Fire-and-forget: a
/// missing backend logs and the dispatcher keeps running.
pub trait Notifier {
    fn notify(&self, summary: &str, label: &str);
}

/// Picks the notifier for the current platform once, at startup.
pub fn platform_notifier(enabled: bool) -> Box<dyn Notifier> {
    if !enabled {
        return Box::new(NullNotifier);
    }
    if cfg!(target_os = "macos") {
        Box::new(MacNotifier)
    } else if cfg!(target_os = "linux") {
        Box::new(LinuxNotifier)
    } else {
        eprintln!(
            "{}: desktop notifications not supported on this platform",
            "Warning".yellow()
        );
        Box::new(NullNotifier)
    }
}

/// Used when notifications are disabled or unsupported.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _summary: &str, _label: &str) {}
}

/// `notify-send` backend.
pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, summary: &str, label: &str) {
        let body = format!("{label}: {summary}");
        if let Err(e) = Command::new("notify-send")
            .args(["-a", "tattle", "tattle", &body])
            .status()
        {
            eprintln!("{}: notify-send unavailable: {}", "Warning".yellow(), e);
        }
    }
}

/// `osascript` backend.
pub struct MacNotifier;

impl Notifier for MacNotifier {
    fn notify(&self, summary: &str, label: &str) {
        let script = format!(
            "display notification \"{summary}\" with title \"tattle\" subtitle \"{label}\""
        );
        if let Err(e) = Command::new("osascript").args(["-e", &script]).status() {
            eprintln!("{}: osascript unavailable: {}", "Warning".yellow(), e);
        }
    }
}
