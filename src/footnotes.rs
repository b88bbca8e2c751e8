//! Footnote audit.
//!
//! Finds footnotes in both Pandoc forms: reference notes defined as
//! `[^id]: text` (continued on indented lines) and inline notes written as
//! `^[text]`. Citations inside a note are found with [`extract_keys`], so a
//! note counts as citing when it holds a group such as `[@doe2020]`.

use std::ops::AddAssign;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::keys::{extract_keys, CitationKey};
use crate::lint::line_at;

/// `[^label]:` at the start of a line. Group 2 is the first line of the body.
static DEFINITION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\^([^\]\s]+)\]:[ \t]*(.*)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoteKind {
    /// `[^id]` marker with a `[^id]: ...` definition
    Reference,
    /// `^[...]` written in the running text
    Inline,
}

/// One footnote and the citations it contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Footnote {
    pub kind: NoteKind,
    /// Label of a reference note, `None` for inline notes
    pub label: Option<String>,
    /// Note body with runs of whitespace collapsed to one space
    pub content: String,
    /// 1-based line where the note starts
    pub line: usize,
    /// Keys cited in the body, with their own document lines
    pub citations: Vec<CitationKey>,
}

impl Footnote {
    pub fn has_citations(&self) -> bool {
        !self.citations.is_empty()
    }

    /// How the note is written in the source, e.g. `[^1]` or `^[...]`.
    pub fn marker(&self) -> String {
        match (&self.kind, &self.label) {
            (NoteKind::Reference, Some(label)) => format!("[^{}]", label),
            _ => "^[...]".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FootnoteStats {
    pub footnotes_found: usize,
    pub citing_footnotes: usize,
    pub citations_in_footnotes: usize,
}

impl AddAssign for FootnoteStats {
    fn add_assign(&mut self, other: Self) {
        self.footnotes_found += other.footnotes_found;
        self.citing_footnotes += other.citing_footnotes;
        self.citations_in_footnotes += other.citations_in_footnotes;
    }
}

/// Every footnote of `markdown`, in document order.
///
/// # Examples
///
/// ```
/// use report_lint::footnotes::find_footnotes;
///
/// let notes = find_footnotes("Claim.[^1] Aside.^[See [@doe2020].]\n\n[^1]: Plain note.\n");
/// assert_eq!(notes.len(), 2);
/// assert_eq!(notes[0].marker(), "^[...]");
/// assert_eq!(notes[0].citations[0].key, "doe2020");
/// assert_eq!(notes[1].content, "Plain note.");
/// ```
pub fn find_footnotes(markdown: &str) -> Vec<Footnote> {
    let mut notes = reference_notes(markdown);
    notes.extend(inline_notes(markdown));
    notes.sort_by_key(|(start, _)| *start);
    notes.into_iter().map(|(_, note)| note).collect()
}

/// Counts for the notes of one or more documents.
pub fn footnote_stats(notes: &[Footnote]) -> FootnoteStats {
    FootnoteStats {
        footnotes_found: notes.len(),
        citing_footnotes: notes.iter().filter(|n| n.has_citations()).count(),
        citations_in_footnotes: notes.iter().map(|n| n.citations.len()).sum(),
    }
}

fn is_continuation(line: &str) -> bool {
    line.starts_with("    ") || line.starts_with('\t')
}

/// Reference note definitions, keyed by byte offset.
fn reference_notes(markdown: &str) -> Vec<(usize, Footnote)> {
    let lines: Vec<&str> = markdown.split('\n').collect();
    let mut notes = Vec::new();
    let mut offset = 0;
    let mut i = 0;

    while i < lines.len() {
        let Some(cap) = DEFINITION_RE.captures(lines[i]) else {
            offset += lines[i].len() + 1;
            i += 1;
            continue;
        };

        let start = offset;
        let mut end = i + 1;
        while end < lines.len() {
            let blank_then_indented = lines[end].trim().is_empty()
                && lines.get(end + 1).is_some_and(|next| is_continuation(next));
            if is_continuation(lines[end]) || blank_then_indented {
                end += 1;
            } else {
                break;
            }
        }

        // one body line per source line keeps key lines aligned
        let first = cap.get(2).map_or("", |m| m.as_str());
        let body: Vec<&str> = std::iter::once(first)
            .chain(lines[i + 1..end].iter().map(|l| l.trim_start()))
            .collect();
        let body = body.join("\n");

        notes.push((
            start,
            note(NoteKind::Reference, Some(cap[1].to_string()), &body, i + 1),
        ));

        for line in &lines[i..end] {
            offset += line.len() + 1;
        }
        i = end;
    }

    notes
}

/// Inline `^[...]` notes, keyed by byte offset.
fn inline_notes(markdown: &str) -> Vec<(usize, Footnote)> {
    let bytes = markdown.as_bytes();
    let mut notes = Vec::new();
    let mut search = 0;

    while let Some(found) = markdown[search..].find("^[") {
        let start = search + found;
        if start > 0 && bytes[start - 1] == b'\\' {
            search = start + 2;
            continue;
        }
        match closing_bracket(markdown, start + 1) {
            Some(close) => {
                let body = &markdown[start + 2..close];
                let line = line_at(markdown, start);
                notes.push((start, note(NoteKind::Inline, None, body, line)));
                search = close + 1;
            }
            None => search = start + 2,
        }
    }

    notes
}

/// Byte offset of the `]` closing the `[` at `open`. Escaped bytes are skipped.
fn closing_bracket(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;

    for (i, b) in text.bytes().enumerate().skip(open) {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn note(kind: NoteKind, label: Option<String>, body: &str, line: usize) -> Footnote {
    let citations = extract_keys(body)
        .into_iter()
        .map(|k| CitationKey {
            key: k.key,
            line: line + k.line - 1,
        })
        .collect();

    Footnote {
        kind,
        label,
        content: body.split_whitespace().collect::<Vec<_>>().join(" "),
        line,
        citations,
    }
}
