//! Citation normalizer.
//!
//! Rewrites citation markup left behind by the document converter in three
//! passes over the whole buffer:
//!
//! 1. [`unescape_to_fixpoint`] turns `\[@key\]` back into `[@key]`.
//! 2. [`merge_to_fixpoint`] folds adjacent single-key groups such as
//!    `[@a] [@b]` into `[@a; @b]`.
//! 3. [`flag_footnote_adjacency`] reports citations sitting right before a
//!    footnote marker. It never rewrites anything.
//!
//! Pass 3 must see the output of passes 1 and 2.

use std::ops::AddAssign;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::lint::{line_at, Change, ChangeKind, Linted, Linter, Mode, Tally};

/// Maximum number of characters of a flagged match shown in reports.
pub const FLAG_DISPLAY_WIDTH: usize = 60;

/// `\[` + content starting with `@` and free of backslashes + `\]`.
/// The content may span `]`, so one scan can leave a new match behind.
static ESCAPED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\\[(@[^\\]+)\\\]").unwrap());

/// `[@content1]`, optional whitespace, `[@content2]`
static CONSECUTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(@[^\]]+)\](\s*)\[(@[^\]]+)\]").unwrap());

/// A group directly following the one just built, anchored at the slice start.
static FOLLOWING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[(@[^\]]+)\]").unwrap());

/// `[@content]`, optional `.`/`,`/`;`, optional whitespace, `[^footnote]`
static FOOTNOTE_ADJACENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[@[^\]]+\]([.,;]?)\s*\[\^[^\]]+\]").unwrap());

/// Counters for one or more normalized documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CitationStats {
    pub escapes_fixed: usize,
    pub citations_merged: usize,
    pub manual_flags: usize,
    /// Reported on [`RunReport`](crate::document::RunReport) in apply mode only
    #[serde(skip_serializing)]
    pub files_changed: usize,
}

impl AddAssign for CitationStats {
    fn add_assign(&mut self, other: Self) {
        self.escapes_fixed += other.escapes_fixed;
        self.citations_merged += other.citations_merged;
        self.manual_flags += other.manual_flags;
        self.files_changed += other.files_changed;
    }
}

impl Tally for CitationStats {
    fn mark_file_changed(&mut self) {
        self.files_changed += 1;
    }

    fn files_changed(&self) -> usize {
        self.files_changed
    }

    fn has_pending_fixes(&self) -> bool {
        self.escapes_fixed > 0 || self.citations_merged > 0
    }

    fn summary(&self, mode: Mode) -> Vec<(&'static str, usize)> {
        let mut lines = vec![
            ("Escapes Fixed", self.escapes_fixed),
            ("Merges Proposed", self.citations_merged),
            ("Manual Flags", self.manual_flags),
        ];
        if mode.is_apply() {
            lines.push(("Files Modified", self.files_changed));
        }
        lines
    }
}

/// The three-pass normalizer as a [`Linter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CitationNormalizer;

impl Linter for CitationNormalizer {
    type Stats = CitationStats;

    fn name(&self) -> &'static str {
        "citations"
    }

    fn lint(&self, text: &str) -> Linted<CitationStats> {
        normalize(text)
    }
}

/// Runs all three passes over `text`.
///
/// # Examples
///
/// ```
/// use report_lint::citations::normalize;
///
/// let result = normalize("See \\[@doe2020\\] and [@a][@b].");
/// assert_eq!(result.text, "See [@doe2020] and [@a; @b].");
/// assert_eq!(result.stats.escapes_fixed, 1);
/// assert_eq!(result.stats.citations_merged, 1);
/// ```
pub fn normalize(text: &str) -> Linted<CitationStats> {
    let (unescaped, mut changes) = unescape_to_fixpoint(text);
    let escapes_fixed = changes.len();

    let (merged, merges) = merge_to_fixpoint(&unescaped);
    let citations_merged = merges.len();
    changes.extend(merges);

    let flags = flag_footnote_adjacency(&merged);
    let manual_flags = flags.len();
    changes.extend(flags);

    Linted {
        text: merged,
        changes,
        stats: CitationStats {
            escapes_fixed,
            citations_merged,
            manual_flags,
            files_changed: 0,
        },
    }
}

/// Pass 1: strips the backslashes from every `\[@...\]` in one scan.
///
/// Only the backslash before `[` and the one before `]` go away; the bracket
/// content is copied unchanged.
pub fn unescape(text: &str) -> (String, Vec<Change>) {
    let mut out = String::with_capacity(text.len());
    let mut changes = Vec::new();
    let mut copied = 0;

    for cap in ESCAPED_RE.captures_iter(text) {
        let whole = cap.get(0).unwrap();
        let replacement = format!("[{}]", &cap[1]);

        out.push_str(&text[copied..whole.start()]);
        out.push_str(&replacement);
        copied = whole.end();

        changes.push(Change {
            kind: ChangeKind::UnescapeFix,
            original: whole.as_str().to_string(),
            replacement: Some(replacement),
            line: line_at(text, whole.start()),
        });
    }

    out.push_str(&text[copied..]);
    (out, changes)
}

/// Pass 1: repeats [`unescape`] until a scan fixes nothing.
///
/// Removing one pair of backslashes can expose another escaped group, as in
/// `\\[@a\] see \]`. Each scan that fixes something removes two bytes, so
/// the loop is bounded by the buffer length. Records carry the line numbers
/// of the scan that produced them.
pub fn unescape_to_fixpoint(text: &str) -> (String, Vec<Change>) {
    let mut current = text.to_string();
    let mut changes = Vec::new();

    for _ in 0..=text.len() {
        let (next, fixes) = unescape(&current);
        if fixes.is_empty() {
            break;
        }
        changes.extend(fixes);
        current = next;
    }

    (current, changes)
}

/// Pass 2: repeats [`merge_consecutive`] until a scan merges nothing.
///
/// Every scan that merges removes at least one closing bracket, so the loop
/// is bounded by the buffer length.
pub fn merge_to_fixpoint(text: &str) -> (String, Vec<Change>) {
    let mut current = text.to_string();
    let mut changes = Vec::new();

    for _ in 0..=text.len() {
        let (next, merges) = merge_consecutive(&current);
        if merges.is_empty() {
            break;
        }
        changes.extend(merges);
        current = next;
    }

    (current, changes)
}

/// One left-to-right scan of pass 2.
///
/// A pair is merged only when neither side already holds a `;`. Once a pair
/// is merged, directly following single-key groups are folded into the new
/// group in the same scan, one [`Change`] per fold. A rejected pair hands its
/// right group on as the left side of the next candidate.
pub fn merge_consecutive(text: &str) -> (String, Vec<Change>) {
    let mut out = String::with_capacity(text.len());
    let mut changes = Vec::new();
    let mut copied = 0;
    let mut search = 0;

    while let Some(cap) = CONSECUTIVE_RE.captures_at(text, search) {
        let whole = cap.get(0).unwrap();
        let left = cap.get(1).unwrap().as_str();
        let right = cap.get(3).unwrap();

        if left.contains(';') || right.as_str().contains(';') {
            // back up to the `[` of the right group
            search = right.start() - 1;
            continue;
        }

        let start = whole.start();
        let line = line_at(text, start);
        let mut group = format!("[{}; {}]", left, right.as_str());
        changes.push(Change {
            kind: ChangeKind::Merge,
            original: whole.as_str().to_string(),
            replacement: Some(group.clone()),
            line,
        });

        let mut end = whole.end();
        while let Some(next) = FOLLOWING_RE.captures(&text[end..]) {
            let item = next.get(1).unwrap().as_str();
            if item.contains(';') {
                break;
            }
            let next_end = end + next.get(0).unwrap().end();
            let original = format!("{}{}", group, &text[end..next_end]);

            group.pop();
            group.push_str("; ");
            group.push_str(item);
            group.push(']');

            changes.push(Change {
                kind: ChangeKind::Merge,
                original,
                replacement: Some(group.clone()),
                line,
            });
            end = next_end;
        }

        out.push_str(&text[copied..start]);
        out.push_str(&group);
        copied = end;
        search = end;
    }

    out.push_str(&text[copied..]);
    (out, changes)
}

/// Pass 3: reports every citation placed right before a footnote marker.
///
/// Read-only. The reported text is cut to [`FLAG_DISPLAY_WIDTH`] characters.
pub fn flag_footnote_adjacency(text: &str) -> Vec<Change> {
    FOOTNOTE_ADJACENT_RE
        .find_iter(text)
        .map(|m| Change {
            kind: ChangeKind::FootnoteAdjacency,
            original: truncate_for_display(m.as_str(), FLAG_DISPLAY_WIDTH),
            replacement: None,
            line: line_at(text, m.start()),
        })
        .collect()
}

/// Cuts `s` to `width` characters, ending with `...` when shortened.
pub fn truncate_for_display(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}
