//! Heading cleanup.
//!
//! Removes manual formatting from ATX headings that the renderer already
//! provides: bold markers (`## **Title**`) and hardcoded section numbers
//! (`## 1.2. Title`). Years at the start of a heading (`## 2024 Review`) are
//! kept.

use std::ops::AddAssign;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::lint::{Change, ChangeKind, Linted, Linter, Mode, Tally};

// Only spaces and tabs separate the parts, so a trailing `\r` is never consumed.
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#+[ \t]+").unwrap());

/// Groups: hashes + space, number part, rest of the title
static NUMBERED_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#+[ \t]+)(\d+(?:\.\d+)*\.?)[ \t]+(.*)$").unwrap());

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(19|20)\d{2}\.?$").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HeadingStats {
    pub bold_removed: usize,
    pub numbers_removed: usize,
    /// Reported on [`RunReport`](crate::document::RunReport) in apply mode only
    #[serde(skip_serializing)]
    pub files_changed: usize,
}

impl AddAssign for HeadingStats {
    fn add_assign(&mut self, other: Self) {
        self.bold_removed += other.bold_removed;
        self.numbers_removed += other.numbers_removed;
        self.files_changed += other.files_changed;
    }
}

impl Tally for HeadingStats {
    fn mark_file_changed(&mut self) {
        self.files_changed += 1;
    }

    fn files_changed(&self) -> usize {
        self.files_changed
    }

    fn has_pending_fixes(&self) -> bool {
        self.bold_removed > 0 || self.numbers_removed > 0
    }

    fn summary(&self, mode: Mode) -> Vec<(&'static str, usize)> {
        let mut lines = vec![
            ("Bold Markers Removed", self.bold_removed),
            ("Numbers Removed", self.numbers_removed),
        ];
        if mode.is_apply() {
            lines.push(("Files Modified", self.files_changed));
        }
        lines
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingLinter;

impl Linter for HeadingLinter {
    type Stats = HeadingStats;

    fn name(&self) -> &'static str {
        "headings"
    }

    fn lint(&self, text: &str) -> Linted<HeadingStats> {
        fix_headings(text)
    }
}

/// Applies both heading rules to every line of `text`.
///
/// The buffer is split on `\n` and rejoined the same way, so untouched lines
/// (including any `\r`) come back byte-for-byte.
pub fn fix_headings(text: &str) -> Linted<HeadingStats> {
    let mut stats = HeadingStats::default();
    let mut changes = Vec::new();

    let lines: Vec<String> = text
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            let line_no = i + 1;
            let mut line = line.to_string();

            if let Some(clean) = strip_bold(&line) {
                changes.push(Change {
                    kind: ChangeKind::RemoveBold,
                    original: line.clone(),
                    replacement: Some(clean.clone()),
                    line: line_no,
                });
                stats.bold_removed += 1;
                line = clean;
            }

            if let Some(clean) = strip_number(&line) {
                changes.push(Change {
                    kind: ChangeKind::RemoveNumber,
                    original: line.clone(),
                    replacement: Some(clean.clone()),
                    line: line_no,
                });
                stats.numbers_removed += 1;
                line = clean;
            }

            line
        })
        .collect();

    Linted {
        text: lines.join("\n"),
        changes,
        stats,
    }
}

/// Returns the heading with every `**` removed, or `None` if there is nothing to strip.
fn strip_bold(line: &str) -> Option<String> {
    if HEADING_RE.is_match(line) && line.contains("**") {
        Some(line.replace("**", ""))
    } else {
        None
    }
}

/// Returns the heading without its leading section number, or `None`.
fn strip_number(line: &str) -> Option<String> {
    let cap = NUMBERED_HEADING_RE.captures(line)?;
    if YEAR_RE.is_match(&cap[2]) {
        return None;
    }
    Some(format!("{}{}", &cap[1], &cap[3]))
}
