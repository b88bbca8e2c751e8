//! Types shared by every pass: change records, run modes and the `Linter` seam.
//!
//! A linter is a pure text transformation. It never touches the filesystem;
//! loading and persisting documents is the job of [`crate::document`].

use std::ops::AddAssign;

use serde::Serialize;

/// Whether fixes are only reported or also written back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Report what would change, leave every file untouched.
    #[default]
    Preview,
    /// Persist the rewritten buffer when it differs from the original.
    Apply,
}

impl Mode {
    /// Maps the CLI `--fix` switch to a mode.
    pub fn from_fix_flag(fix: bool) -> Self {
        if fix {
            Mode::Apply
        } else {
            Mode::Preview
        }
    }

    pub fn is_apply(self) -> bool {
        self == Mode::Apply
    }
}

/// What kind of rewrite (or flag) a [`Change`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    /// `\[@key\]` rewritten to `[@key]`.
    UnescapeFix,
    /// Two adjacent citation groups folded into one.
    Merge,
    /// Citation placed directly before a footnote marker. Never auto-fixed.
    FootnoteAdjacency,
    /// `**` markers stripped from a heading line.
    RemoveBold,
    /// Hardcoded section number stripped from a heading line.
    RemoveNumber,
}

impl ChangeKind {
    /// Console tag printed in front of each record.
    pub fn tag(self) -> &'static str {
        match self {
            ChangeKind::UnescapeFix => "[Fix Escape]",
            ChangeKind::Merge => "[Merge]",
            ChangeKind::FootnoteAdjacency => "[Manual]",
            ChangeKind::RemoveBold => "[Remove Bold]",
            ChangeKind::RemoveNumber => "[Remove Number]",
        }
    }

    /// Flags are informational; they never alter the buffer.
    pub fn is_flag(self) -> bool {
        matches!(self, ChangeKind::FootnoteAdjacency)
    }
}

/// A single rewrite or flagged issue found in one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub kind: ChangeKind,
    /// The matched text (truncated for display on flags)
    pub original: String,
    /// What the match was rewritten to; `None` for flags
    pub replacement: Option<String>,
    /// 1-based line of the match start
    pub line: usize,
}

/// Per-run counters. Each linter defines its own and the caller sums them.
pub trait Tally: Default + Clone + AddAssign + Serialize {
    /// Records that a rewritten document was persisted.
    fn mark_file_changed(&mut self);

    /// Number of persisted documents recorded so far.
    fn files_changed(&self) -> usize;

    /// True when the counters include at least one fix that `--fix` would apply.
    fn has_pending_fixes(&self) -> bool;

    /// Labelled counters for the end-of-run summary.
    fn summary(&self, mode: Mode) -> Vec<(&'static str, usize)>;
}

/// Output of one linter over one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Linted<S> {
    pub text: String,
    pub changes: Vec<Change>,
    pub stats: S,
}

/// A text pass run over every document of a corpus.
pub trait Linter {
    type Stats: Tally;

    /// Short command name, used in log output
    fn name(&self) -> &'static str;

    fn lint(&self, text: &str) -> Linted<Self::Stats>;
}

/// 1-based line number of byte `offset` in `text`.
pub fn line_at(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}
