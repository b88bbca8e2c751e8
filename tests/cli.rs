//! CLI integration tests.
//!
//! Tests the command-line interface by running the binary as a subprocess.

mod common;

use common::{read, run_in, run_with_stdin, stderr, stdout, workspace};

const CITATION_DOC: &str = "# Report\n\nSee \\[@doe2020\\] and [@a][@b][@c].\nClaim [@smith99].[^1]\n\n[^1]: Note.\n";
const CITATION_FIXED: &str = "# Report\n\nSee [@doe2020] and [@a; @b; @c].\nClaim [@smith99].[^1]\n\n[^1]: Note.\n";

// ============================================
// Tests for CLI argument parsing
// ============================================

#[test]
fn test_cli_help() {
    let dir = workspace(&[]);
    let output = run_in(dir.path(), &["--help"]);

    let out = stdout(&output);
    assert!(output.status.success(), "Help should exit with success");
    for command in ["citations", "headings", "keys", "footnotes", "attributes"] {
        assert!(out.contains(command), "Help should list '{}': {}", command, out);
    }
}

#[test]
fn test_cli_citations_help_mentions_fix() {
    let dir = workspace(&[]);
    let output = run_in(dir.path(), &["citations", "--help"]);
    let out = stdout(&output);
    assert!(out.contains("--fix"), "{}", out);
    assert!(out.contains("execute"), "{}", out);
}

// ============================================
// Tests for the citations command
// ============================================

#[test]
fn test_cli_citations_preview_leaves_files() {
    // Given: A report tree under the default root
    let dir = workspace(&[("reports/a/doc.qmd", CITATION_DOC)]);

    // When: We run in preview mode
    let output = run_in(dir.path(), &["citations"]);

    // Then: Changes are listed and the file is untouched
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("DRY RUN"), "{}", out);
    assert!(out.contains("a/doc.qmd"), "{}", out);
    assert!(out.contains("[Fix Escape]"), "{}", out);
    assert!(out.contains("[Merge]"), "{}", out);
    assert!(out.contains("[Manual]"), "{}", out);
    assert!(out.contains("Escapes Fixed:"), "{}", out);
    assert!(out.contains("Run with --fix"), "{}", out);
    assert_eq!(read(dir.path(), "reports/a/doc.qmd"), CITATION_DOC);
}

#[test]
fn test_cli_citations_fix_rewrites_files() {
    let dir = workspace(&[
        ("reports/doc.qmd", CITATION_DOC),
        ("reports/clean.qmd", "Nothing [@x] to do.\n"),
    ]);

    let output = run_in(dir.path(), &["citations", "--fix"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("FIX MODE"), "{}", out);
    assert!(out.contains("Files Modified:"), "{}", out);
    assert!(!out.contains("clean.qmd"), "{}", out);
    assert_eq!(read(dir.path(), "reports/doc.qmd"), CITATION_FIXED);
    assert_eq!(read(dir.path(), "reports/clean.qmd"), "Nothing [@x] to do.\n");
}

#[test]
fn test_cli_citations_execute_aliases() {
    for flag in ["-e", "--execute"] {
        let dir = workspace(&[("reports/doc.qmd", "[@a] [@b]\n")]);
        let output = run_in(dir.path(), &["citations", flag]);
        assert!(output.status.success(), "{}: {}", flag, stderr(&output));
        assert_eq!(read(dir.path(), "reports/doc.qmd"), "[@a; @b]\n", "{}", flag);
    }
}

#[test]
fn test_cli_citations_explicit_root_and_extension_filter() {
    // Given: A custom root with a .qmd and a .md file
    let dir = workspace(&[("docs/x.qmd", "[@a][@b]"), ("docs/y.md", "[@a][@b]")]);

    // When: We fix with an explicit root
    let output = run_in(dir.path(), &["citations", "docs", "--fix"]);

    // Then: Only the .qmd file is rewritten
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(read(dir.path(), "docs/x.qmd"), "[@a; @b]");
    assert_eq!(read(dir.path(), "docs/y.md"), "[@a][@b]");
}

#[test]
fn test_cli_citations_json_report() {
    let dir = workspace(&[("reports/doc.qmd", CITATION_DOC)]);

    let output = run_in(dir.path(), &["citations", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["mode"], "preview");
    assert_eq!(report["files_scanned"], 1);
    assert_eq!(report["totals"]["escapes_fixed"], 1);
    assert_eq!(report["totals"]["citations_merged"], 2);
    assert_eq!(report["totals"]["manual_flags"], 1);
    assert!(report.get("files_changed").is_none());
    assert!(report["totals"].get("files_changed").is_none());
    let changes = report["files"][0]["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 4);
    assert_eq!(changes[0]["kind"], "UnescapeFix");
    assert_eq!(changes[0]["line"], 3);
    assert!(changes[3]["replacement"].is_null());
}

#[test]
fn test_cli_citations_json_report_in_fix_mode() {
    let dir = workspace(&[
        ("reports/doc.qmd", CITATION_DOC),
        ("reports/flagged.qmd", "Claim [@a].[^1]\n"),
    ]);

    let output = run_in(dir.path(), &["citations", "--fix", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["mode"], "apply");
    assert_eq!(report["files_changed"], 1);
    assert_eq!(read(dir.path(), "reports/doc.qmd"), CITATION_FIXED);
}

#[test]
fn test_cli_missing_root_fails_with_input_code() {
    let dir = workspace(&[]);

    let output = run_in(dir.path(), &["citations"]);

    assert_eq!(output.status.code(), Some(11));
    let err = stderr(&output);
    assert!(err.contains("Reports directory not found"), "{}", err);
    assert!(err.contains("hint:"), "{}", err);
}

// ============================================
// Tests for configuration
// ============================================

#[test]
fn test_cli_config_file_sets_root_and_extension() {
    // Given: A config pointing at a custom root and extension
    let dir = workspace(&[
        ("report-lint.toml", "root = \"content\"\nextension = \"md\"\n"),
        ("content/page.md", "## **Bold**\n"),
    ]);

    // When: We fix headings without arguments
    let output = run_in(dir.path(), &["headings", "--fix"]);

    // Then: The configured tree is used
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(read(dir.path(), "content/page.md"), "## Bold\n");
}

#[test]
fn test_cli_invalid_config_fails_with_config_code() {
    let dir = workspace(&[("broken.toml", "root = [")]);

    let output = run_in(dir.path(), &["--config", "broken.toml", "keys"]);

    assert_eq!(output.status.code(), Some(10));
    assert!(stderr(&output).contains("broken.toml"));
}

// ============================================
// Tests for the other commands
// ============================================

#[test]
fn test_cli_headings_preview() {
    let doc = "# 1. Intro\n## 2024 Review\n";
    let dir = workspace(&[("reports/h.qmd", doc)]);

    let output = run_in(dir.path(), &["headings"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("[Remove Number]"), "{}", out);
    assert!(out.contains("# 1. Intro  ->  # Intro"), "{}", out);
    assert!(out.contains("Numbers Removed:"), "{}", out);
    assert_eq!(read(dir.path(), "reports/h.qmd"), doc);
}

#[test]
fn test_cli_keys_lists_keys_per_file() {
    let dir = workspace(&[
        ("reports/a.qmd", "See [@doe2020; @roe2021].\n"),
        ("reports/b.qmd", "Again [@doe2020].\n"),
    ]);

    let output = run_in(dir.path(), &["keys"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("@doe2020"), "{}", out);
    assert!(out.contains("@roe2021"), "{}", out);
    assert!(out.contains("Keys Found:"), "{}", out);

    let json = run_in(dir.path(), &["keys", "--json"]);
    let report: serde_json::Value = serde_json::from_str(&stdout(&json)).unwrap();
    assert_eq!(report["totals"]["keys_found"], 3);
    assert_eq!(report["totals"]["distinct_keys"], 2);
}

// ============================================
// Tests for the footnotes command
// ============================================

const FOOTNOTE_DOC: &str = "# Notes\n\nClaim.[^1] Aside.^[Plain aside.]\n\n[^1]: See [@doe2020; @roe2021].\n[^2]: No sources.\n";

#[test]
fn test_cli_footnotes_lists_citing_notes() {
    // Given: One note citing sources and two plain ones
    let dir = workspace(&[
        ("reports/a.qmd", FOOTNOTE_DOC),
        ("reports/b.qmd", "No notes here [@x].\n"),
    ]);

    // When: We audit footnotes
    let output = run_in(dir.path(), &["footnotes"]);

    // Then: Only the citing note is listed, with its keys
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("citations inside footnotes"), "{}", out);
    assert!(out.contains("a.qmd"), "{}", out);
    assert!(!out.contains("b.qmd"), "{}", out);
    assert!(out.contains("[^1] See [@doe2020; @roe2021]."), "{}", out);
    assert!(out.contains("cites @doe2020, @roe2021"), "{}", out);
    assert!(!out.contains("No sources."), "{}", out);
    assert!(out.contains("Footnotes Found:"), "{}", out);
    assert_eq!(read(dir.path(), "reports/a.qmd"), FOOTNOTE_DOC);
}

#[test]
fn test_cli_footnotes_all_lists_every_note() {
    let dir = workspace(&[("reports/a.qmd", FOOTNOTE_DOC)]);

    let output = run_in(dir.path(), &["footnotes", "--all"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Listing all footnote content"), "{}", out);
    assert!(out.contains("^[...] Plain aside."), "{}", out);
    assert!(out.contains("[^2] No sources."), "{}", out);
}

#[test]
fn test_cli_footnotes_json_report() {
    let dir = workspace(&[("reports/a.qmd", FOOTNOTE_DOC)]);

    let output = run_in(dir.path(), &["footnotes", "--json"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["all"], false);
    assert_eq!(report["totals"]["footnotes_found"], 3);
    assert_eq!(report["totals"]["citing_footnotes"], 1);
    assert_eq!(report["totals"]["citations_in_footnotes"], 2);
    let notes = report["files"][0]["footnotes"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["label"], "1");
    assert_eq!(notes[0]["line"], 5);
    assert_eq!(notes[0]["citations"][1]["key"], "roe2021");
}

// ============================================
// Tests for the attributes command
// ============================================

#[test]
fn test_cli_attributes_from_stdin() {
    // Given: An audit log piped on stdin
    let log = "ATTR|Div|{#fig-map}|A map\nATTR|Span|{.mark}|highlight\nnoise line\n";
    let dir = workspace(&[]);

    // When: We classify it
    let output = run_with_stdin(dir.path(), &["attributes", "-"], log);

    // Then: Sections are printed in report order
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    let highlights = out.find("Highlights, Comments & Missing Alt").unwrap();
    let figures = out.find("Figures & Tables").unwrap();
    assert!(highlights < figures, "{}", out);
    assert!(out.contains("\"A map\""), "{}", out);
}

#[test]
fn test_cli_attributes_grouped_by_file() {
    // Given: A log with records for two documents
    let log = "FILE|reports/b.qmd\nATTR|Span|{.mark}|hi\nFILE|reports/a.qmd\nATTR|Div|{#tbl-x}|t\n";
    let dir = workspace(&[("audit.log", log)]);

    // When: We classify it
    let output = run_in(dir.path(), &["attributes", "audit.log"]);

    // Then: Each document gets its own header, in sorted order
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    let a = out.find("reports/a.qmd").unwrap();
    let b = out.find("reports/b.qmd").unwrap();
    assert!(a < b, "{}", out);
    assert!(out[a..b].contains("Figures & Tables"), "{}", out);
    assert!(out[b..].contains("Highlights, Comments & Missing Alt"), "{}", out);

    let json = run_in(dir.path(), &["attributes", "audit.log", "--json"]);
    let files: serde_json::Value = serde_json::from_str(&stdout(&json)).unwrap();
    assert_eq!(files[0]["file"], "reports/a.qmd");
    assert_eq!(files[1]["buckets"][0]["records"][0]["category"], "Mark");
}

#[test]
fn test_cli_attributes_missing_log() {
    let dir = workspace(&[]);
    let output = run_in(dir.path(), &["attributes", "nope.log"]);
    assert_eq!(output.status.code(), Some(11));
    assert!(stderr(&output).contains("nope.log"));
}
