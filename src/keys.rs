//! Citation key listing.
//!
//! Finds the keys used in bracketed citation groups such as `[@a]`,
//! `[@a, p. 42]` or `[-@a; @b]`.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::lint::line_at;

/// A bracket group with at least one `@` and no nested brackets
static GROUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\[\]]*@[^\[\]]*)\]").unwrap());

/// `@key` opening a group item. Group 1 is the key.
static KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s;\-])@([\w][\w:.#$%&\-+?<>~/]*)").unwrap());

/// A citation key together with where it was used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CitationKey {
    /// The citation key (e.g., "doe2020" or "pmid:12345")
    pub key: String,
    /// 1-based line of the enclosing group
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyStats {
    pub keys_found: usize,
    pub distinct_keys: usize,
}

/// Extracts every citation key from `markdown`, in document order.
///
/// # Examples
///
/// ```
/// use report_lint::keys::extract_keys;
///
/// let keys = extract_keys("See [@item-1, p. 4; @item-2] and [^1].");
/// let names: Vec<&str> = keys.iter().map(|k| k.key.as_str()).collect();
/// assert_eq!(names, vec!["item-1", "item-2"]);
/// ```
pub fn extract_keys(markdown: &str) -> Vec<CitationKey> {
    let mut keys = Vec::new();

    for group in GROUP_RE.captures_iter(markdown) {
        let whole = group.get(0).unwrap();
        let inner = group.get(1).unwrap().as_str();
        let line = line_at(markdown, whole.start());

        for cap in KEY_RE.captures_iter(inner) {
            let key = trim_key(&cap[1]);
            if !key.is_empty() {
                keys.push(CitationKey {
                    key: key.to_string(),
                    line,
                });
            }
        }
    }

    keys
}

/// Counts for a list of extracted keys.
pub fn key_stats(keys: &[CitationKey]) -> KeyStats {
    let distinct: BTreeSet<&str> = keys.iter().map(|k| k.key.as_str()).collect();
    KeyStats {
        keys_found: keys.len(),
        distinct_keys: distinct.len(),
    }
}

/// Internal punctuation belongs to the key, trailing punctuation does not.
fn trim_key(raw: &str) -> &str {
    raw.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '_')
}
