//! CLI binary for docmd.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use docmd::{
    convert_bytes, inspect, write_atomic, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, DocumentFormat, PageSelection, PageSeparator, PdfEngine,
    ProgressCallback, ReplaceStrategy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Per-page progress for a single PDF. DOCX conversions only show the
/// spinner, since they have no pages.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        if total_pages == 0 {
            self.bar.set_prefix("Converting");
            return;
        }
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_prefix("Converting");
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, _page_num: usize, _total: usize, _markdown_len: usize) {
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, markdown_len: usize) {
        self.bar.finish_and_clear();
        let pages = if total_pages > 0 {
            format!("{} pages, ", bold(&total_pages.to_string()))
        } else {
            String::new()
        };
        eprintln!("{} {}{}", green("✔"), pages, dim(&format!("{markdown_len} bytes")));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (stdout)
  docmd report.pdf

  # Convert to file
  docmd contract.docx -o contract.md

  # Several files into a directory
  docmd *.pdf *.docx --out-dir markdown/

  # Specific pages with page markers
  docmd --pages 1-5 --separator comment paper.pdf -o paper.md

  # Extra replacement rules on top of the defaults
  docmd --strategy rules.json notes.docx

  # Inspect metadata only
  docmd --inspect-only report.pdf

  # JSON output with metadata
  docmd --json --metadata report.pdf > output.json

STRATEGY FILES:
  A JSON array of rules, applied in order after the built-in ones:
    [{"pattern": "\n\n\n", "replacement": "\n\n"},
     {"pattern": "(c)", "replacement": "©"}]

ENVIRONMENT VARIABLES:
  DOCMD_*           Every flag, e.g. DOCMD_PAGES=1-3, DOCMD_ENGINE=pdf-extract
  PDFIUM_LIB_PATH   Path to libpdfium; otherwise the working directory and
                    the system library path are searched
  RUST_LOG          Overrides the log filter (e.g. docmd=debug)
"#;

/// Convert PDF and DOCX files to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "docmd",
    version,
    about = "Convert PDF and DOCX files to normalised Markdown",
    long_about = "Convert PDF and DOCX documents to clean Markdown. PDF headings are inferred \
from font sizes (via pdfium); DOCX structure comes from paragraph styles, numbering and tables. \
The result is normalised by an ordered set of find-and-replace rules.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF or DOCX files to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write Markdown to this file instead of stdout (single input only).
    #[arg(short, long, env = "DOCMD_OUTPUT", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Write one `<name>.md` per input into this directory.
    #[arg(long, env = "DOCMD_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Input format; `auto` sniffs content, then the extension.
    #[arg(long, env = "DOCMD_FORMAT", value_enum, default_value = "auto")]
    format: FormatArg,

    /// Page selection for PDFs: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "DOCMD_PAGES", default_value = "all")]
    pages: String,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, env = "DOCMD_SEPARATOR", default_value = "none")]
    separator: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "DOCMD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// PDF engine: auto, pdfium, pdf-extract.
    #[arg(long, env = "DOCMD_ENGINE", default_value = "auto")]
    engine: PdfEngine,

    /// JSON file with extra replacement rules, applied after the defaults.
    #[arg(long, env = "DOCMD_STRATEGY")]
    strategy: Option<PathBuf>,

    /// Do not apply the built-in replacement rules.
    #[arg(long, env = "DOCMD_NO_DEFAULT_STRATEGY")]
    no_default_strategy: bool,

    /// Deepest heading level to emit (1–6).
    #[arg(long, env = "DOCMD_MAX_HEADING_LEVELS", default_value_t = 6,
          value_parser = clap::value_parser!(u8).range(1..=6))]
    max_heading_levels: u8,

    /// Prepend YAML front-matter with document metadata.
    #[arg(long, env = "DOCMD_METADATA")]
    metadata: bool,

    /// Output structured JSON (ConversionOutput) instead of Markdown.
    #[arg(long, env = "DOCMD_JSON")]
    json: bool,

    /// Disable progress bars.
    #[arg(long, env = "DOCMD_NO_PROGRESS")]
    no_progress: bool,

    /// Print document metadata only, no conversion.
    #[arg(long, env = "DOCMD_INSPECT_ONLY")]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCMD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCMD_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Auto,
    Pdf,
    Docx,
}

impl FormatArg {
    fn forced(self) -> Option<DocumentFormat> {
        match self {
            FormatArg::Auto => None,
            FormatArg::Pdf => Some(DocumentFormat::Pdf),
            FormatArg::Docx => Some(DocumentFormat::Docx),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are hidden while a progress bar is drawn.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.output.is_some() && cli.inputs.len() > 1 {
        anyhow::bail!("--output takes a single input; use --out-dir for several files");
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        return run_inspect(&cli);
    }

    // ── Run conversion ───────────────────────────────────────────────────
    if cli.inputs.len() == 1 {
        let progress: Option<ProgressCallback> = if show_progress {
            Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
        } else {
            None
        };
        let config = build_config(&cli, progress)?;
        let input = &cli.inputs[0];
        let output = convert_one(input, cli.format, &config)
            .with_context(|| format!("Conversion of {} failed", input.display()))?;

        match target_path(&cli, input) {
            Some(path) => {
                write_atomic(&path, &render(&cli, &output)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                if !cli.quiet {
                    eprintln!(
                        "{}  {}ms  →  {}",
                        green("✔"),
                        output.stats.total_duration_ms,
                        bold(&path.display().to_string()),
                    );
                }
            }
            None => {
                let rendered = render(&cli, &output)?;
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(rendered.as_bytes())
                    .context("Failed to write to stdout")?;
                if !rendered.is_empty() && !rendered.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }
        }
        return Ok(());
    }

    run_batch(&cli, show_progress)
}

/// Convert several inputs, each to its own file, with one bar over all files.
fn run_batch(cli: &Cli, show_progress: bool) -> Result<()> {
    let config = build_config(cli, None)?;

    let bar = if show_progress {
        let bar = ProgressBar::new(cli.inputs.len() as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} files  {wide_msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut failed = 0usize;
    for input in &cli.inputs {
        bar.set_message(input.display().to_string());
        let result = convert_one(input, cli.format, &config).and_then(|output| {
            let path = batch_target(cli, input);
            write_atomic(&path, &render(cli, &output)?)?;
            Ok(path)
        });

        match result {
            Ok(path) => {
                if !cli.quiet {
                    bar.println(format!(
                        "  {} {}  →  {}",
                        green("✓"),
                        input.display(),
                        dim(&path.display().to_string())
                    ));
                }
            }
            Err(e) => {
                failed += 1;
                bar.println(format!("  {} {}  {}", red("✗"), input.display(), red(&format!("{e:#}"))));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    let total = cli.inputs.len();
    if failed > 0 {
        anyhow::bail!("{}/{} files failed to convert", failed, total);
    }
    if !cli.quiet {
        eprintln!("{} {} files converted", green("✔"), bold(&total.to_string()));
    }
    Ok(())
}

fn run_inspect(cli: &Cli) -> Result<()> {
    let mut all = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let meta = inspect(input).with_context(|| format!("Failed to inspect {}", input.display()))?;
        all.push((input, meta));
    }

    if cli.json {
        let metas: Vec<_> = all.iter().map(|(_, m)| m).collect();
        let json = if metas.len() == 1 {
            serde_json::to_string_pretty(metas[0])
        } else {
            serde_json::to_string_pretty(&metas)
        };
        println!("{}", json.context("Failed to serialize metadata")?);
        return Ok(());
    }

    for (i, (input, meta)) in all.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("File:         {}", input.display());
        if let Some(format) = meta.format {
            println!("Format:       {}", format);
        }
        let fields = [
            ("Title:       ", &meta.title),
            ("Author:      ", &meta.author),
            ("Subject:     ", &meta.subject),
            ("Creator:     ", &meta.creator),
            ("Producer:    ", &meta.producer),
            ("Created:     ", &meta.creation_date),
            ("Modified:    ", &meta.modification_date),
        ];
        for (label, value) in fields {
            if let Some(v) = value {
                println!("{} {}", label, v);
            }
        }
        println!("Pages:        {}", meta.page_count);
    }
    Ok(())
}

/// Read and convert one input, honouring `--format`.
fn convert_one(input: &Path, format: FormatArg, config: &ConversionConfig) -> Result<ConversionOutput> {
    let bytes = docmd::pipeline::input::read_input(input)?;
    let format = match format.forced() {
        Some(f) => f,
        None => docmd::pipeline::input::detect_format(input, &bytes)?,
    };
    Ok(convert_bytes(&bytes, format, config)?)
}

/// Where the output for `input` goes; `None` means stdout.
fn target_path(cli: &Cli, input: &Path) -> Option<PathBuf> {
    if let Some(ref out) = cli.output {
        return Some(out.clone());
    }
    let dir = cli.out_dir.as_ref()?;
    Some(dir.join(output_file_name(input, cli.json)))
}

/// Batch output path: the `--out-dir` target, else a sibling of `input`.
fn batch_target(cli: &Cli, input: &Path) -> PathBuf {
    target_path(cli, input).unwrap_or_else(|| input.with_file_name(output_file_name(input, cli.json)))
}

/// `<stem>.md` or `<stem>.json`; dots inside the stem are kept.
fn output_file_name(input: &Path, json: bool) -> OsString {
    let mut name = input.file_stem().unwrap_or_else(|| input.as_os_str()).to_os_string();
    name.push(if json { ".json" } else { ".md" });
    name
}

fn render(cli: &Cli, output: &ConversionOutput) -> Result<String> {
    if cli.json {
        serde_json::to_string_pretty(output).context("Failed to serialise output")
    } else {
        Ok(output.markdown.clone())
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut strategy = if cli.no_default_strategy {
        ReplaceStrategy::empty()
    } else {
        ReplaceStrategy::default_strategy()
    };
    if let Some(ref path) = cli.strategy {
        let extra = ReplaceStrategy::from_json_file(path)
            .with_context(|| format!("Failed to load strategy from {}", path.display()))?;
        strategy
            .extend(extra.iter().map(|r| (r.pattern.clone(), r.replacement.clone())))
            .context("Invalid strategy")?;
    }

    let mut builder = ConversionConfig::builder()
        .strategy(strategy)
        .pdf_engine(cli.engine)
        .max_heading_levels(cli.max_heading_levels as usize)
        .pages(parse_pages(&cli.pages)?)
        .page_separator(parse_separator(&cli.separator))
        .include_metadata(cli.metadata);

    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}
