//! Classifies `go test` output into a pass/fail tally and a readable,
//! color-tagged rendering.

use colored::Colorize;

const PASS_MARKER: &str = "--- PASS";
const FAIL_MARKER: &str = "--- FAIL";

/// Result of one test invocation. Only ever built by [`classify`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Merged stdout+stderr of the test command, verbatim.
    pub raw: String,
    pub passed: usize,
    pub failed: usize,
}

impl RunOutcome {
    /// One-line summary for notifications: "3 passed, 1 failed".
    pub fn summary(&self) -> String {
        format!("{} passed, {} failed", self.passed, self.failed)
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Emphasis tag for a rendered line, driving downstream coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    Pass,
    Fail,
    Neutral,
}

/// A reformatted output line plus its emphasis tag.
#[derive(Debug, Clone)]
pub struct RenderedLine {
    pub text: String,
    pub tag: LineTag,
}

fn tag_of(line: &str) -> LineTag {
    let trimmed = line.trim();
    if trimmed.starts_with(FAIL_MARKER) {
        LineTag::Fail
    } else if trimmed.starts_with(PASS_MARKER) {
        LineTag::Pass
    } else {
        LineTag::Neutral
    }
}

/// Count pass/fail lines. A line counts when its trimmed content starts
/// with the marker; indentation never affects classification.
pub fn classify(raw: String) -> RunOutcome {
    let mut passed = 0;
    let mut failed = 0;
    for line in raw.lines() {
        match tag_of(line) {
            LineTag::Pass => passed += 1,
            LineTag::Fail => failed += 1,
            LineTag::Neutral => {}
        }
    }
    RunOutcome { raw, passed, failed }
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Reformat output for the terminal: nested sub-test indentation is halved
/// past the first indented line's width, so deep hierarchies stay readable
/// without going flat. Cosmetic only; re-running [`classify`] over the
/// rendered text yields the same counts.
pub fn reformat(raw: &str) -> Vec<RenderedLine> {
    let mut baseline: Option<usize> = None;
    let mut rendered = Vec::new();

    for line in raw.lines() {
        let indent = indent_width(line);
        let content = line.trim_start();

        if baseline.is_none() && indent > 0 && !content.is_empty() {
            baseline = Some(indent);
        }

        let width = match baseline {
            Some(base) if indent > base => base + (indent - base) / 2,
            _ => indent,
        };

        rendered.push(RenderedLine {
            text: format!("{}{}", " ".repeat(width), content),
            tag: tag_of(line),
        });
    }

    rendered
}

/// Print reformatted output with color emphasis.
pub fn print_rendered(lines: &[RenderedLine]) {
    for line in lines {
        match line.tag {
            LineTag::Pass => println!("{}", line.text.green()),
            LineTag::Fail => println!("{}", line.text.red()),
            LineTag::Neutral => println!("{}", line.text),
        }
    }
}
