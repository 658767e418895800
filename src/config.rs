//! Configuration types for document-to-Markdown conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The defaults reproduce the plain
//! `pdf_to_md` / `docx_to_md` behaviour: every page, the built-in replacement
//! strategy, automatic PDF engine selection.

use crate::error::DocMdError;
use crate::progress::ProgressCallback;
use crate::strategy::ReplaceStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for a conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use docmd::{ConversionConfig, PageSelection, ReplaceStrategy};
///
/// let config = ConversionConfig::builder()
///     .pages(PageSelection::Range(1, 3))
///     .strategy(ReplaceStrategy::new([("\n\n\n", "\n\n")]).unwrap())
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Replacement rules applied after formatting. Default: [`ReplaceStrategy::default_strategy`].
    pub strategy: ReplaceStrategy,

    /// Backend used to pull text out of PDFs. Default: [`PdfEngine::Auto`].
    pub pdf_engine: PdfEngine,

    /// Deepest heading level emitted (1–6). Default: 6.
    ///
    /// For PDFs, font sizes above body text are ranked largest first and sizes
    /// ranked below this level render as body text. DOCX headings deeper than
    /// this become plain paragraphs.
    pub max_heading_levels: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection (PDF only). Default: All pages.
    pub pages: PageSelection,

    /// Page separator in assembled PDF output. Default: None.
    pub page_separator: PageSeparator,

    /// Include YAML front-matter with document metadata. Default: false.
    pub include_metadata: bool,

    /// Optional per-page progress events during PDF extraction.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            strategy: ReplaceStrategy::default_strategy(),
            pdf_engine: PdfEngine::default(),
            max_heading_levels: 6,
            password: None,
            pages: PageSelection::default(),
            page_separator: PageSeparator::default(),
            include_metadata: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("strategy_rules", &self.strategy.len())
            .field("pdf_engine", &self.pdf_engine)
            .field("max_heading_levels", &self.max_heading_levels)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("page_separator", &self.page_separator)
            .field("include_metadata", &self.include_metadata)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn strategy(mut self, strategy: ReplaceStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Skip the replacement pass entirely.
    pub fn no_strategy(mut self) -> Self {
        self.config.strategy = ReplaceStrategy::empty();
        self
    }

    pub fn pdf_engine(mut self, engine: PdfEngine) -> Self {
        self.config.pdf_engine = engine;
        self
    }

    pub fn max_heading_levels(mut self, n: usize) -> Self {
        self.config.max_heading_levels = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, DocMdError> {
        let c = &self.config;
        if !(1..=6).contains(&c.max_heading_levels) {
            return Err(DocMdError::InvalidConfig(format!(
                "max heading levels must be 1–6, got {}",
                c.max_heading_levels
            )));
        }
        match &c.pages {
            PageSelection::Single(0) => {
                return Err(DocMdError::InvalidConfig(
                    "pages are 1-indexed; page 0 does not exist".into(),
                ))
            }
            PageSelection::Range(start, end) if start > end || *start == 0 => {
                return Err(DocMdError::InvalidConfig(format!(
                    "invalid page range {start}-{end}"
                )))
            }
            PageSelection::Set(pages) if pages.is_empty() || pages.contains(&0) => {
                return Err(DocMdError::InvalidConfig(
                    "page set must be non-empty and 1-indexed".into(),
                ))
            }
            _ => {}
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which library extracts text from PDFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PdfEngine {
    /// Use pdfium when it can be bound, otherwise fall back to pdf-extract. (default)
    #[default]
    Auto,
    /// pdfium only; fails if the library cannot be bound. Infers headings.
    Pdfium,
    /// Pure-Rust pdf-extract. Infers headings; never detects bold.
    PdfExtract,
}

impl fmt::Display for PdfEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PdfEngine::Auto => "auto",
            PdfEngine::Pdfium => "pdfium",
            PdfEngine::PdfExtract => "pdf-extract",
        })
    }
}

impl std::str::FromStr for PdfEngine {
    type Err = DocMdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(PdfEngine::Auto),
            "pdfium" => Ok(PdfEngine::Pdfium),
            "pdf-extract" | "pdf_extract" | "pdfextract" => Ok(PdfEngine::PdfExtract),
            other => Err(DocMdError::InvalidConfig(format!(
                "unknown PDF engine '{}' (expected auto, pdfium or pdf-extract)",
                other
            ))),
        }
    }
}

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// First requested page number, used when reporting an empty selection.
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(1),
        }
    }
}

/// How to separate pages in the assembled Markdown output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// No separator; pages joined with "\n\n". (default)
    #[default]
    None,
    /// Horizontal rule: "\n\n---\n\n"
    HorizontalRule,
    /// HTML comment with page number: "<!-- page N -->"
    Comment,
    /// Custom string inserted between pages.
    Custom(String),
}

impl PageSeparator {
    /// Render the separator string for the given page number (1-indexed).
    pub fn render(&self, page_num: usize) -> String {
        match self {
            PageSeparator::None => "\n\n".to_string(),
            PageSeparator::HorizontalRule => "\n\n---\n\n".to_string(),
            PageSeparator::Comment => format!("\n\n<!-- page {} -->\n\n", page_num),
            PageSeparator::Custom(s) => format!("\n\n{}\n\n", s),
        }
    }
}
