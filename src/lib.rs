//! report-lint: audit and fix citation and heading markup in Markdown reports.
//!
//! This library provides functionality to:
//! - Normalize citations (unescape, merge adjacent groups, flag footnote clashes)
//! - Strip bold markers and hardcoded numbers from headings
//! - List citation keys used across a report tree
//! - Audit footnotes and the citations placed inside them
//! - Classify div/span attributes reported by the converter's audit filter
//! - Walk a report tree and persist fixes

pub mod attributes;
pub mod citations;
pub mod config;
pub mod document;
pub mod footnotes;
pub mod headings;
pub mod keys;
pub mod lint;
pub mod output;

pub use citations::{normalize, CitationNormalizer, CitationStats};
pub use config::Config;
pub use document::{collect_documents, process_document, run, DocumentError, DocumentFilter};
pub use footnotes::{find_footnotes, Footnote};
pub use headings::{fix_headings, HeadingLinter, HeadingStats};
pub use keys::{extract_keys, CitationKey};
pub use lint::{Change, ChangeKind, Linted, Linter, Mode, Tally};
