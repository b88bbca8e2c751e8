//! Document discovery and persistence.
//!
//! Walks a report tree, feeds each document through a [`Linter`] and, in
//! [`Mode::Apply`], writes changed buffers back to the same path.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::lint::{Change, Linter, Mode, Tally};

/// Errors that can occur while reading or writing documents.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Reports directory not found: {0}")]
    MissingRoot(PathBuf),

    #[error("Failed to walk '{root}': {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DocumentError {
    /// True for failures that happened while persisting a fix.
    pub fn is_write(&self) -> bool {
        matches!(self, DocumentError::Write { .. })
    }
}

/// Which files of a tree count as documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFilter {
    /// File extension without the dot, e.g. "qmd"
    pub extension: String,
    pub include_hidden: bool,
}

impl Default for DocumentFilter {
    fn default() -> Self {
        Self {
            extension: "qmd".to_string(),
            include_hidden: false,
        }
    }
}

/// Outcome for a single document.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport<S> {
    pub path: PathBuf,
    pub changes: Vec<Change>,
    pub stats: S,
    /// Whether the rewritten buffer was persisted
    pub written: bool,
}

/// Outcome for a whole run: every file that produced records, plus totals.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<S> {
    pub mode: Mode,
    pub files_scanned: usize,
    pub files: Vec<FileReport<S>>,
    pub totals: S,
    /// Documents rewritten on disk; `None` outside apply mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_changed: Option<usize>,
}

/// Finds every document under `root`, sorted for deterministic output.
pub fn collect_documents(root: &Path, filter: &DocumentFilter) -> Result<Vec<PathBuf>, DocumentError> {
    if !root.is_dir() {
        return Err(DocumentError::MissingRoot(root.to_path_buf()));
    }

    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || filter.include_hidden || !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|source| DocumentError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if entry.file_type().is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy() == filter.extension)
        {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    debug!(root = %root.display(), count = files.len(), "collected documents");

    Ok(files)
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|s| s.starts_with('.'))
}

/// Reads one document as UTF-8 text.
pub fn read_document(path: &Path) -> Result<String, DocumentError> {
    fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads `path`, lints it and persists the result when `mode` allows it.
///
/// The file is only written when the new buffer differs from what was read.
pub fn process_document<L: Linter>(
    linter: &L,
    path: &Path,
    mode: Mode,
) -> Result<FileReport<L::Stats>, DocumentError> {
    let original = read_document(path)?;

    let linted = linter.lint(&original);
    let mut stats = linted.stats;
    let changed = linted.text != original;
    let mut written = false;

    if mode.is_apply() && changed {
        fs::write(path, &linted.text).map_err(|source| DocumentError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        stats.mark_file_changed();
        written = true;
        info!(linter = linter.name(), path = %path.display(), "rewrote document");
    }

    debug!(
        linter = linter.name(),
        path = %path.display(),
        records = linted.changes.len(),
        "processed document"
    );

    Ok(FileReport {
        path: path.to_path_buf(),
        changes: linted.changes,
        stats,
        written,
    })
}

/// Processes every path in order and sums the per-file counters.
///
/// Files without any record are counted as scanned but left out of
/// [`RunReport::files`]. The first read or write failure aborts the run.
pub fn run<L: Linter>(
    linter: &L,
    paths: &[PathBuf],
    mode: Mode,
) -> Result<RunReport<L::Stats>, DocumentError> {
    let mut totals = L::Stats::default();
    let mut files = Vec::new();

    for path in paths {
        let report = process_document(linter, path, mode)?;
        totals += report.stats.clone();
        if !report.changes.is_empty() {
            files.push(report);
        }
    }

    let files_changed = mode.is_apply().then(|| totals.files_changed());

    Ok(RunReport {
        mode,
        files_scanned: paths.len(),
        files,
        totals,
        files_changed,
    })
}
