//! Div/span attribute audit.
//!
//! Classifies the records printed by the converter's attribute audit filter.
//! Each record is one line of the form `TAG|type|attrs|content`, for example
//! `ATTR|Span|{#sec-a .mark}|highlighted text`. A `FILE|path` line names the
//! document whose records follow, so one log can cover a whole report tree.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

const FILE_PREFIX: &str = "FILE|";

static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([\w-]+)").unwrap());

/// Errors that can occur when loading an audit log.
#[derive(Error, Debug)]
pub enum AttributeLogError {
    #[error("Failed to read audit log '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Audit categories, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Category {
    AltFail,
    Mark,
    Style,
    Ref,
    Other,
}

/// One attribute occurrence reported by the filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeRecord {
    /// Element type, e.g. "Span", "Div", "Image (No Alt)"
    pub element: String,
    /// Raw attribute string, e.g. `{#fig-a width=50%}`
    pub attrs: String,
    pub content: String,
    /// First `#id` in `attrs`, empty when there is none
    pub id: String,
    pub category: Category,
}

type Predicate = fn(attrs: &str, element: &str, id: &str) -> bool;

fn missing_alt(_attrs: &str, element: &str, _id: &str) -> bool {
    element == "Image (No Alt)"
}

fn highlight(attrs: &str, element: &str, _id: &str) -> bool {
    attrs.contains(".mark") || element == "Text (Raw)"
}

// "background" alone also shows up in ordinary prose
fn comment(attrs: &str, _element: &str, _id: &str) -> bool {
    attrs.contains("comment") || attrs.contains("annotation") || attrs.contains("background-color")
}

fn styling(attrs: &str, _element: &str, _id: &str) -> bool {
    attrs.contains(".underline")
        || attrs.contains("style=")
        || attrs.contains("width=")
        || attrs.contains("color")
}

fn cross_reference(_attrs: &str, _element: &str, id: &str) -> bool {
    id.starts_with("tbl-") || id.starts_with("fig-")
}

/// Evaluated top to bottom; the first matching predicate wins.
/// `attrs` is already lowercased.
const RULES: [(Predicate, Category); 5] = [
    (missing_alt, Category::AltFail),
    (highlight, Category::Mark),
    (comment, Category::Mark),
    (styling, Category::Style),
    (cross_reference, Category::Ref),
];

/// Assigns a category to one attribute occurrence.
pub fn classify(attrs: &str, element: &str, id: &str) -> Category {
    let attrs = attrs.to_lowercase();
    RULES
        .iter()
        .find(|(matches, _)| matches(&attrs, element, id))
        .map(|(_, category)| *category)
        .unwrap_or(Category::Other)
}

/// Parses one log line. Lines with fewer than four `|` fields yield `None`.
pub fn parse_record(line: &str) -> Option<AttributeRecord> {
    let mut parts = line.splitn(4, '|');
    let _tag = parts.next()?;
    let element = parts.next()?;
    let attrs = parts.next()?;
    let content = parts.next()?;

    let id = ID_RE
        .captures(attrs)
        .map(|c| c[1].to_string())
        .unwrap_or_default();
    let category = classify(attrs, element, &id);

    Some(AttributeRecord {
        element: element.to_string(),
        attrs: attrs.to_string(),
        content: content.to_string(),
        id,
        category,
    })
}

/// Parses every record of a filter log.
pub fn parse_log(log: &str) -> Vec<AttributeRecord> {
    log.lines().filter_map(parse_record).collect()
}

/// Reads a filter log from `path`, or from stdin when `path` is `-`.
pub fn load_log(path: &Path) -> Result<String, AttributeLogError> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| AttributeLogError::Read {
                path: "stdin".to_string(),
                source,
            })?;
        return Ok(buf);
    }
    fs::read_to_string(path).map_err(|source| AttributeLogError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// A titled report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub title: &'static str,
    pub records: Vec<AttributeRecord>,
}

/// Groups records into report sections, dropping empty ones.
///
/// Missing alt text comes first, followed by highlights, then styling,
/// references, and everything else. Records keep their log order within a
/// section.
pub fn bucket(records: &[AttributeRecord]) -> Vec<Bucket> {
    let sections: [(&'static str, &[Category]); 4] = [
        (
            "Highlights, Comments & Missing Alt",
            &[Category::AltFail, Category::Mark],
        ),
        ("Styling (Underlines, Widths)", &[Category::Style]),
        ("Figures & Tables", &[Category::Ref]),
        ("Structure & Other", &[Category::Other]),
    ];

    sections
        .iter()
        .map(|(title, categories)| {
            let records = categories
                .iter()
                .flat_map(|category| records.iter().filter(move |r| r.category == *category))
                .cloned()
                .collect();
            Bucket {
                title: *title,
                records,
            }
        })
        .filter(|b| !b.records.is_empty())
        .collect()
}

/// The report sections of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileBuckets {
    pub file: String,
    pub buckets: Vec<Bucket>,
}

/// Splits a log at its `FILE|path` lines and buckets each document.
///
/// Records before the first `FILE|` line belong to `default_file`. Documents
/// are sorted by name and those without records are left out.
pub fn bucket_by_file(log: &str, default_file: &str) -> Vec<FileBuckets> {
    let mut files: BTreeMap<String, Vec<AttributeRecord>> = BTreeMap::new();
    let mut current = default_file.to_string();

    for line in log.lines() {
        if let Some(file) = line.strip_prefix(FILE_PREFIX) {
            current = file.trim().to_string();
        } else if let Some(record) = parse_record(line) {
            files.entry(current.clone()).or_default().push(record);
        }
    }

    files
        .into_iter()
        .map(|(file, records)| FileBuckets {
            file,
            buckets: bucket(&records),
        })
        .collect()
}
