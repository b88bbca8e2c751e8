//! Console report rendering.
//!
//! Every function renders into a `String` so that each file's block is
//! written to stdout in one go. Styling comes from `colored` and follows its
//! global override (`--no-color`, `NO_COLOR`).

use std::fmt::Write as _;
use std::path::Path;

use colored::{ColoredString, Colorize};

use crate::attributes::{Bucket, Category, FileBuckets};
use crate::citations::{truncate_for_display, FLAG_DISPLAY_WIDTH};
use crate::document::{FileReport, RunReport};
use crate::footnotes::{Footnote, FootnoteStats};
use crate::keys::{CitationKey, KeyStats};
use crate::lint::{Change, ChangeKind, Mode, Tally};

const RULE_WIDTH: usize = 60;

/// Horizontal separator used around banners and summaries.
pub fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

/// Opening banner for a fixing command.
pub fn render_banner(subject: &str, mode: Mode) -> String {
    let headline = match mode {
        Mode::Apply => format!("FIX MODE: Modifying {}...", subject)
            .as_str()
            .yellow()
            .bold(),
        Mode::Preview => "DRY RUN: Previewing changes (Use --fix to apply)...".normal(),
    };
    format!("{}\n{}\n{}\n", rule(), headline, rule())
}

/// Path shown in reports: relative to `base` when possible.
pub fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn styled_tag(kind: ChangeKind) -> ColoredString {
    let padded = format!("{:<15}", kind.tag());
    let tag = padded.as_str();
    match kind {
        ChangeKind::UnescapeFix => tag.green(),
        ChangeKind::Merge => tag.cyan(),
        ChangeKind::FootnoteAdjacency => tag.yellow(),
        ChangeKind::RemoveBold | ChangeKind::RemoveNumber => tag.cyan(),
    }
}

/// One record as a single report line.
pub fn render_change(change: &Change) -> String {
    let mut line = format!(
        "   Line {:<4} {} {}",
        change.line,
        styled_tag(change.kind),
        change.original
    );
    if let Some(replacement) = &change.replacement {
        let _ = write!(line, "  ->  {}", replacement);
    }
    line
}

/// Header plus one line per record for a single document.
pub fn render_file<S>(report: &FileReport<S>, base: &Path) -> String {
    let mut out = format!("{}\n", display_path(&report.path, base).as_str().bold());
    for change in &report.changes {
        out.push_str(&render_change(change));
        out.push('\n');
    }
    if report.written {
        out.push_str(&format!("   {}\n", "Saved.".green()));
    }
    out
}

/// End-of-run summary with the hint to rerun with `--fix`.
pub fn render_summary<S: Tally>(report: &RunReport<S>) -> String {
    let mut out = format!("{}\nSummary:\n", rule());
    let _ = writeln!(out, "   {:<22}{}", "Files Scanned:", report.files_scanned);
    for (label, count) in report.totals.summary(report.mode) {
        let _ = writeln!(out, "   {:<22}{}", format!("{}:", label), count);
    }
    if report.mode == Mode::Preview && report.totals.has_pending_fixes() {
        let _ = writeln!(out, "\n   Run with {} to apply changes.", "--fix".bold());
    }
    out
}

/// Keys of one document, one per line.
pub fn render_keys(path: &Path, base: &Path, keys: &[CitationKey]) -> String {
    let mut out = format!("{}\n", display_path(path, base).as_str().bold());
    for key in keys {
        let _ = writeln!(out, "   Line {:<4} @{}", key.line, key.key);
    }
    out
}

pub fn render_key_summary(stats: &KeyStats) -> String {
    format!(
        "{}\nSummary:\n   {:<22}{}\n   {:<22}{}\n",
        rule(),
        "Keys Found:",
        stats.keys_found,
        "Distinct Keys:",
        stats.distinct_keys
    )
}

/// Opening banner for the footnote audit.
pub fn render_footnote_banner(all: bool) -> String {
    let headline = if all {
        "AUDIT: Listing all footnote content..."
    } else {
        "AUDIT: Searching for citations inside footnotes..."
    };
    format!("{}\n{}\n{}\n", rule(), headline, rule())
}

/// Notes of one document with the keys each one cites.
pub fn render_footnotes(path: &Path, base: &Path, notes: &[Footnote]) -> String {
    let mut out = format!("{}\n", display_path(path, base).as_str().bold());
    for note in notes {
        let _ = writeln!(
            out,
            "   Line {:<4} {} {}",
            note.line,
            note.marker().as_str().cyan(),
            truncate_for_display(&note.content, FLAG_DISPLAY_WIDTH)
        );
        if note.has_citations() {
            let keys: Vec<String> = note.citations.iter().map(|k| format!("@{}", k.key)).collect();
            let _ = writeln!(out, "             {} {}", "cites".yellow(), keys.join(", "));
        }
    }
    out
}

pub fn render_footnote_summary(stats: &FootnoteStats) -> String {
    let mut out = format!("{}\nSummary:\n", rule());
    let _ = writeln!(out, "   {:<26}{}", "Footnotes Found:", stats.footnotes_found);
    let _ = writeln!(out, "   {:<26}{}", "Footnotes Citing Sources:", stats.citing_footnotes);
    let _ = writeln!(out, "   {:<26}{}", "Citations in Footnotes:", stats.citations_in_footnotes);
    out
}

fn category_icon(category: Category) -> ColoredString {
    match category {
        Category::AltFail | Category::Mark => "!!".red(),
        Category::Style => "~~".yellow(),
        Category::Ref => "##".blue(),
        Category::Other => "--".normal(),
    }
}

/// Attribute audit sections in report order.
pub fn render_buckets(buckets: &[Bucket]) -> String {
    if buckets.is_empty() {
        return "No attributes found.\n".to_string();
    }
    let mut out = String::new();
    for bucket in buckets {
        let _ = writeln!(out, "   {}", bucket.title.underline());
        for record in &bucket.records {
            let _ = writeln!(
                out,
                "   {} [{}] {} {}",
                category_icon(record.category),
                record.element,
                record.attrs,
                format!("\"{}\"", record.content).as_str().dimmed()
            );
        }
    }
    out
}

/// Attribute audit grouped by document.
pub fn render_file_buckets(files: &[FileBuckets]) -> String {
    if files.is_empty() {
        return "No attributes found.\n".to_string();
    }
    let mut out = String::new();
    for file in files {
        let _ = writeln!(out, "{}", file.file.as_str().bold());
        out.push_str(&render_buckets(&file.buckets));
        out.push('\n');
    }
    out
}
