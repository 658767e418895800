//! Conversion entry points.
//!
//! Every path ends in [`convert_bytes`]: extract raw Markdown with the
//! format's extractor, run the formatting pass, then the configured
//! replacement strategy. [`pdf_to_md`] and [`docx_to_md`] are the plain
//! default-config shortcuts.

use crate::config::ConversionConfig;
use crate::error::DocMdError;
use crate::output::{ConversionOutput, ConversionStats, DocumentFormat, DocumentMetadata};
use crate::pipeline::layout::{render_page, HeadingMap};
use crate::pipeline::{docx, input, pdf, postprocess};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert PDF bytes to Markdown with the default configuration.
///
/// # Errors
/// Empty or non-PDF bytes fail with a decode error
/// (see [`DocMdError::is_decode_error`]).
pub fn pdf_to_md(bytes: &[u8]) -> Result<String, DocMdError> {
    convert_bytes(bytes, DocumentFormat::Pdf, &ConversionConfig::default()).map(|o| o.markdown)
}

/// Convert DOCX bytes to Markdown with the default configuration.
///
/// Runs of three or more newlines in the result are collapsed to two by the
/// default replacement strategy.
pub fn docx_to_md(bytes: &[u8]) -> Result<String, DocMdError> {
    convert_bytes(bytes, DocumentFormat::Docx, &ConversionConfig::default()).map(|o| o.markdown)
}

/// Convert in-memory document bytes of a known format.
///
/// # Example
/// ```rust,no_run
/// use docmd::{convert_bytes, ConversionConfig, DocumentFormat};
///
/// let bytes = std::fs::read("report.docx")?;
/// let output = convert_bytes(&bytes, DocumentFormat::Docx, &ConversionConfig::default())?;
/// println!("{}", output.markdown);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn convert_bytes(
    bytes: &[u8],
    format: DocumentFormat,
    config: &ConversionConfig,
) -> Result<ConversionOutput, DocMdError> {
    let total_start = Instant::now();
    info!("Starting {} conversion ({} bytes)", format, bytes.len());

    let extracted = match format {
        DocumentFormat::Pdf => extract_pdf_markdown(bytes, config)?,
        DocumentFormat::Docx => extract_docx_markdown(bytes, config)?,
    };

    let formatted = postprocess::format_markdown(&extracted.raw);
    let cleaned = config.strategy.apply(&formatted);
    debug!(
        "Normalised Markdown: {} → {} bytes ({} strategy rules)",
        extracted.raw.len(),
        cleaned.len(),
        config.strategy.len()
    );

    let markdown = if config.include_metadata {
        format!("{}{}", format_yaml_front_matter(&extracted.metadata), cleaned)
    } else {
        cleaned
    };

    let stats = ConversionStats {
        total_pages: extracted.metadata.page_count,
        converted_pages: extracted.converted_pages,
        engine: extracted.engine,
        markdown_bytes: markdown.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} pages via {}, {} bytes, {}ms",
        stats.converted_pages, stats.engine, stats.markdown_bytes, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(extracted.converted_pages, markdown.len());
    }

    Ok(ConversionOutput {
        markdown,
        metadata: extracted.metadata,
        stats,
    })
}

/// Convert a local file, detecting its format from content, then extension.
pub fn convert_file(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, DocMdError> {
    let path = path.as_ref();
    let bytes = input::read_input(path)?;
    let format = input::detect_format(path, &bytes)?;
    info!("Converting {} as {}", path.display(), format);
    convert_bytes(&bytes, format, config)
}

/// Convert a file and write the Markdown to `output_path`.
///
/// The Markdown is written to a temp file in the destination directory and
/// then renamed over `output_path`, so readers never observe a partial file.
pub fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, DocMdError> {
    let output = convert_file(input_path, config)?;
    write_atomic(output_path, &output.markdown)?;
    Ok(output.stats)
}

/// Write `contents` to `path` through a temp file in the same directory.
///
/// Missing parent directories are created.
pub fn write_atomic(path: impl AsRef<Path>, contents: &str) -> Result<(), DocMdError> {
    let path = path.as_ref();
    let write_err = |source: std::io::Error| DocMdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}

/// Read document metadata without converting content.
pub fn inspect(path: impl AsRef<Path>) -> Result<DocumentMetadata, DocMdError> {
    let path = path.as_ref();
    let bytes = input::read_input(path)?;
    match input::detect_format(path, &bytes)? {
        DocumentFormat::Pdf => pdf::pdf_metadata(&bytes, None),
        DocumentFormat::Docx => docx::docx_metadata(&bytes),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

struct RawMarkdown {
    raw: String,
    metadata: DocumentMetadata,
    converted_pages: usize,
    engine: String,
}

fn extract_pdf_markdown(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<RawMarkdown, DocMdError> {
    let extracted = pdf::extract_pdf(bytes, config)?;
    let selected = extracted.pages.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(selected);
    }

    let headings = HeadingMap::from_pages(&extracted.pages, config.max_heading_levels);
    debug!(
        "Body font size {:?}, heading sizes {:?}",
        headings.body_size(),
        headings.heading_sizes()
    );

    let mut raw = String::new();
    for (i, page) in extracted.pages.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_page_start(page.page_num, selected);
        }

        let page_md = render_page(page, &headings);
        if i > 0 {
            raw.push_str(&config.page_separator.render(page.page_num));
        }
        raw.push_str(&page_md);

        if let Some(ref cb) = config.progress_callback {
            cb.on_page_complete(page.page_num, selected, page_md.len());
        }
    }

    Ok(RawMarkdown {
        raw,
        metadata: extracted.metadata,
        converted_pages: selected,
        engine: extracted.engine.to_string(),
    })
}

fn extract_docx_markdown(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<RawMarkdown, DocMdError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(0);
    }
    let extracted = docx::extract_docx(bytes, config.max_heading_levels)?;
    Ok(RawMarkdown {
        raw: extracted.markdown,
        metadata: extracted.metadata,
        converted_pages: 0,
        engine: "docx".to_string(),
    })
}

/// Format document metadata as YAML front matter.
///
/// Values are written as JSON strings, which YAML accepts as double-quoted
/// scalars with the same escaping.
fn format_yaml_front_matter(meta: &DocumentMetadata) -> String {
    let mut yaml = String::from("---\n");

    let fields = [
        ("title", &meta.title),
        ("author", &meta.author),
        ("subject", &meta.subject),
        ("creator", &meta.creator),
        ("producer", &meta.producer),
        ("created", &meta.creation_date),
        ("modified", &meta.modification_date),
    ];
    for (key, value) in fields {
        if let Some(v) = value {
            let quoted = serde_json::to_string(v).unwrap_or_else(|_| format!("\"{}\"", v));
            yaml.push_str(&format!("{}: {}\n", key, quoted));
        }
    }
    if let Some(format) = meta.format {
        yaml.push_str(&format!("format: {}\n", format.to_string().to_lowercase()));
    }
    if meta.page_count > 0 {
        yaml.push_str(&format!("pages: {}\n", meta.page_count));
    }

    yaml.push_str("---\n\n");
    yaml
}
