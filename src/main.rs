//! CLI for report-lint - Audit and fix markup in Markdown report trees.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use report_lint::{
    attributes::{self, AttributeLogError},
    collect_documents,
    config::ConfigError,
    document::{read_document, RunReport},
    extract_keys, find_footnotes,
    footnotes::{footnote_stats, FootnoteStats},
    keys::{key_stats, KeyStats},
    output, run, CitationKey, CitationNormalizer, Config, DocumentError, DocumentFilter, Footnote,
    HeadingLinter, Linter, Mode,
};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Audit and fix citation, heading and attribute markup in Markdown reports
#[derive(Parser)]
#[command(name = "report-lint")]
#[command(version)]
#[command(after_help = "\
Examples:
  report-lint citations
  report-lint citations reports/ --fix
  report-lint headings -e
  report-lint keys --json
  report-lint footnotes --all
  quarto pandoc doc.qmd --lua-filter audit.lua --to native 2> audit.log
  report-lint attributes audit.log")]
struct Cli {
    /// Config file (default: ./report-lint.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print the report as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Log debug diagnostics to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FixArgs {
    /// Reports directory (default: `root` from the config, else "reports")
    root: Option<PathBuf>,

    /// Apply changes to the files instead of previewing them
    #[arg(long, short = 'e', visible_alias = "execute")]
    fix: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Unescape citations, merge adjacent ones and flag citations before footnotes
    #[command(after_help = "\
Fixes:
  \\[@key\\]        -> [@key]
  [@a] [@b] [@c]  -> [@a; @b; @c]
Flags (never changed):
  [@key].[^1]")]
    Citations(FixArgs),

    /// Remove bold markers and hardcoded section numbers from headings
    #[command(after_help = "\
Fixes:
  ## **Title**   -> ## Title
  ## 1.2. Title  -> ## Title
Years such as '## 2024 Review' are kept.")]
    Headings(FixArgs),

    /// List the citation keys used in each document
    Keys {
        /// Reports directory (default: `root` from the config, else "reports")
        root: Option<PathBuf>,
    },

    /// Audit citations placed inside footnotes
    Footnotes {
        /// Reports directory (default: `root` from the config, else "reports")
        root: Option<PathBuf>,

        /// List every footnote, not only those that cite sources
        #[arg(long)]
        all: bool,
    },

    /// Classify div/span attributes from a converter audit log
    #[command(after_help = "\
Log lines:
  ATTR|Span|{.mark}|highlighted text
  FILE|reports/a.qmd   (records that follow belong to this document)")]
    Attributes {
        /// Audit log with `TAG|type|attrs|content` lines (use '-' for stdin)
        log: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// AppError: semantic exit codes
// ---------------------------------------------------------------------------

enum AppError {
    /// Exit 10: config file unreadable / invalid
    Config(String),
    /// Exit 11: reports directory or document unreadable
    Input(String),
    /// Exit 12: cannot write a fixed document
    Write(String),
    /// Exit 13: cannot serialize or print the report
    Report(String),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 10,
            AppError::Input(_) => 11,
            AppError::Write(_) => 12,
            AppError::Report(_) => 13,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => {
                write!(
                    f,
                    "{}\n  hint: valid keys are `root`, `extension` and `include_hidden`",
                    msg
                )
            }
            AppError::Input(msg) => {
                write!(f, "{}\n  hint: verify the path is correct", msg)
            }
            AppError::Write(msg) => {
                write!(
                    f,
                    "{}\n  hint: check that the file is writable; files before it were already saved",
                    msg
                )
            }
            AppError::Report(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<DocumentError> for AppError {
    fn from(e: DocumentError) -> Self {
        if e.is_write() {
            AppError::Write(e.to_string())
        } else {
            AppError::Input(e.to_string())
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<AttributeLogError> for AppError {
    fn from(e: AttributeLogError) -> Self {
        AppError::Input(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    if let Err(e) = run_cli(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "report_lint=debug"
    } else {
        "report_lint=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run_cli(cli: Cli) -> Result<(), AppError> {
    let config = Config::load(cli.config.as_deref())?;
    debug!(?config, "loaded configuration");
    let filter = config.filter();

    match cli.command {
        Commands::Citations(args) => {
            let root = args.root.unwrap_or_else(|| config.root.clone());
            fix_command(
                &CitationNormalizer,
                "citations",
                &root,
                &filter,
                Mode::from_fix_flag(args.fix),
                cli.json,
            )
        }
        Commands::Headings(args) => {
            let root = args.root.unwrap_or_else(|| config.root.clone());
            fix_command(
                &HeadingLinter,
                "headings",
                &root,
                &filter,
                Mode::from_fix_flag(args.fix),
                cli.json,
            )
        }
        Commands::Keys { root } => {
            let root = root.unwrap_or_else(|| config.root.clone());
            keys_command(&root, &filter, cli.json)
        }
        Commands::Footnotes { root, all } => {
            let root = root.unwrap_or_else(|| config.root.clone());
            footnotes_command(&root, &filter, all, cli.json)
        }
        Commands::Attributes { log } => attributes_command(&log, cli.json),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Run a fixing linter over every document under `root`.
fn fix_command<L: Linter>(
    linter: &L,
    subject: &str,
    root: &Path,
    filter: &DocumentFilter,
    mode: Mode,
    json: bool,
) -> Result<(), AppError> {
    let paths = collect_documents(root, filter)?;
    let report: RunReport<L::Stats> = run(linter, &paths, mode)?;

    if json {
        return print_json(&report);
    }

    let mut blocks = vec![output::render_banner(subject, mode)];
    for file in &report.files {
        blocks.push(format!("{}\n", output::render_file(file, root)));
    }
    blocks.push(output::render_summary(&report));
    print_blocks(&blocks)
}

#[derive(Serialize)]
struct FileKeys<'a> {
    path: &'a Path,
    keys: Vec<CitationKey>,
}

#[derive(Serialize)]
struct KeyReport<'a> {
    files: Vec<FileKeys<'a>>,
    totals: KeyStats,
}

/// List citation keys per document.
fn keys_command(root: &Path, filter: &DocumentFilter, json: bool) -> Result<(), AppError> {
    let paths = collect_documents(root, filter)?;

    let mut files = Vec::new();
    let mut all_keys = Vec::new();
    for path in &paths {
        let keys = extract_keys(&read_document(path)?);
        if !keys.is_empty() {
            all_keys.extend(keys.iter().cloned());
            files.push(FileKeys { path, keys });
        }
    }
    let report = KeyReport {
        files,
        totals: key_stats(&all_keys),
    };

    if json {
        return print_json(&report);
    }

    let mut blocks: Vec<String> = report
        .files
        .iter()
        .map(|f| format!("{}\n", output::render_keys(f.path, root, &f.keys)))
        .collect();
    blocks.push(output::render_key_summary(&report.totals));
    print_blocks(&blocks)
}

#[derive(Serialize)]
struct FileNotes<'a> {
    path: &'a Path,
    footnotes: Vec<Footnote>,
}

#[derive(Serialize)]
struct FootnoteReport<'a> {
    all: bool,
    files: Vec<FileNotes<'a>>,
    totals: FootnoteStats,
}

/// List footnotes per document; only those citing sources unless `all`.
fn footnotes_command(
    root: &Path,
    filter: &DocumentFilter,
    all: bool,
    json: bool,
) -> Result<(), AppError> {
    let paths = collect_documents(root, filter)?;

    let mut files = Vec::new();
    let mut totals = FootnoteStats::default();
    for path in &paths {
        let notes = find_footnotes(&read_document(path)?);
        totals += footnote_stats(&notes);
        let shown: Vec<Footnote> = notes
            .into_iter()
            .filter(|note| all || note.has_citations())
            .collect();
        if !shown.is_empty() {
            files.push(FileNotes {
                path,
                footnotes: shown,
            });
        }
    }
    let report = FootnoteReport { all, files, totals };

    if json {
        return print_json(&report);
    }

    let mut blocks = vec![output::render_footnote_banner(all)];
    for file in &report.files {
        blocks.push(format!(
            "{}\n",
            output::render_footnotes(file.path, root, &file.footnotes)
        ));
    }
    blocks.push(output::render_footnote_summary(&report.totals));
    print_blocks(&blocks)
}

/// Classify the records of a converter audit log, per document.
fn attributes_command(log: &Path, json: bool) -> Result<(), AppError> {
    let content = attributes::load_log(log)?;
    let default_file = if log == Path::new("-") {
        "stdin".to_string()
    } else {
        log.display().to_string()
    };
    let files = attributes::bucket_by_file(&content, &default_file);

    if json {
        return print_json(&files);
    }
    print_blocks(&[output::render_file_buckets(&files)])
}

// ---------------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------------

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Report(format!("failed to serialize report: {}", e)))?;
    print_blocks(&[format!("{}\n", json)])
}

/// Writes each block with a single call so per-file output never interleaves.
fn print_blocks(blocks: &[String]) -> Result<(), AppError> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for block in blocks {
        handle
            .write_all(block.as_bytes())
            .map_err(|e| AppError::Report(format!("stdout: {}", e)))?;
    }
    handle
        .flush()
        .map_err(|e| AppError::Report(format!("stdout: {}", e)))
}
