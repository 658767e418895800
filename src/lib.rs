//! # docmd
//!
//! Convert PDF and DOCX documents to normalised Markdown.
//!
//! Extraction is delegated to established libraries (pdfium or pdf-extract
//! for PDFs, zip + quick-xml for DOCX). The output is then passed through a
//! formatting pass and an ordered, saturating find-and-replace
//! [`ReplaceStrategy`] that removes spacing artifacts such as runs of blank
//! lines.
//!
//! ## Pipeline Overview
//!
//! ```text
//! bytes
//!  │
//!  ├─ 1. Input     sniff PDF / DOCX from magic bytes or extension
//!  ├─ 2. Extract   pdfium glyphs → layout inference  |  OOXML → Markdown
//!  ├─ 3. Format    line endings, invisible chars, heading spacing
//!  ├─ 4. Replace   ordered rules, each applied to a fixpoint
//!  └─ 5. Output    Markdown + metadata + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docmd::{convert_file, ConversionConfig};
//!
//! let output = convert_file("report.pdf", &ConversionConfig::default())?;
//! println!("{}", output.markdown);
//! eprintln!("{} pages via {}", output.stats.converted_pages, output.stats.engine);
//! # Ok::<(), docmd::DocMdError>(())
//! ```
//!
//! The byte-level shortcuts use the default configuration:
//!
//! ```rust
//! use docmd::{apply_strategy_replace, ReplaceStrategy};
//!
//! let strategy = ReplaceStrategy::new([("\n\n\n", "\n\n")]).unwrap();
//! assert_eq!(apply_strategy_replace("hello\n\n\n\nworld", &strategy), "hello\n\nworld");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docmd` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docmd = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! pdfium is loaded from `PDFIUM_LIB_PATH`, the working directory or the
//! system library path. Without it, [`PdfEngine::Auto`] falls back to
//! pdf-extract, which still infers headings from font sizes but cannot see
//! bold fonts.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod strategy;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageSelection, PageSeparator, PdfEngine};
pub use convert::{
    convert_bytes, convert_file, convert_to_file, docx_to_md, inspect, pdf_to_md, write_atomic,
};
pub use error::DocMdError;
pub use output::{ConversionOutput, ConversionStats, DocumentFormat, DocumentMetadata};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use strategy::{apply_strategy_replace, ReplaceStrategy, Replacement, DEFAULT_RULES, MAX_PASSES};
