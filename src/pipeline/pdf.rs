//! PDF text extraction via pdfium, with a pure-Rust pdf-extract fallback.
//!
//! ## Engines
//!
//! * **pdfium** (`pdfium-render`) exposes every glyph with its position, font
//!   size and font name. Glyphs are grouped into [`TextLine`]s so the layout
//!   stage can infer headings from font sizes.
//! * **pdf-extract** needs no native library. Its glyphs carry a text matrix
//!   and font size but no font name, so headings are inferred the same way
//!   while bold runs are not detected.
//!
//! With [`PdfEngine::Auto`] pdfium is tried first and pdf-extract is used only
//! when the pdfium library cannot be bound. A PDF that pdfium rejects is
//! reported as-is; the fallback would fail on it too.
//!
//! ## Binding
//!
//! pdfium is loaded from `PDFIUM_LIB_PATH` when set, otherwise from the
//! working directory, otherwise from the system library path.

use crate::config::{ConversionConfig, PdfEngine};
use crate::error::DocMdError;
use crate::output::{DocumentFormat, DocumentMetadata};
use crate::pipeline::input::validate_pdf;
use crate::pipeline::layout::{PageText, TextLine};
use pdf_extract::encryption::DecryptionError;
use pdf_extract::{
    decode_text_string, output_doc_page, Document, Error as LopdfError, MediaBox, OutputDev,
    OutputError, Transform,
};
use pdfium_render::prelude::*;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Text pulled out of a PDF, before layout inference.
#[derive(Debug, Clone)]
pub struct ExtractedPdf {
    /// Selected pages in document order.
    pub pages: Vec<PageText>,
    pub metadata: DocumentMetadata,
    /// Engine that actually produced `pages`.
    pub engine: PdfEngine,
}

/// Extract the pages selected by `config` from PDF `bytes`.
pub fn extract_pdf(bytes: &[u8], config: &ConversionConfig) -> Result<ExtractedPdf, DocMdError> {
    validate_pdf(bytes)?;

    match config.pdf_engine {
        PdfEngine::Pdfium => extract_with_pdfium(&bind_pdfium()?, bytes, config),
        PdfEngine::PdfExtract => extract_with_pdf_extract(bytes, config),
        PdfEngine::Auto => match bind_pdfium() {
            Ok(pdfium) => extract_with_pdfium(&pdfium, bytes, config),
            Err(e) => {
                warn!("pdfium unavailable, falling back to pdf-extract: {}", e);
                extract_with_pdf_extract(bytes, config)
            }
        },
    }
}

/// Read document metadata without extracting page text.
pub fn pdf_metadata(bytes: &[u8], password: Option<&str>) -> Result<DocumentMetadata, DocMdError> {
    validate_pdf(bytes)?;
    match bind_pdfium() {
        Ok(pdfium) => {
            let document = load_document(&pdfium, bytes, password)?;
            Ok(document_metadata(&document))
        }
        Err(e) => {
            warn!("pdfium unavailable, reading metadata with lopdf: {}", e);
            guarded(|| load_lopdf(bytes, password).map(|doc| lopdf_metadata(&doc)))
        }
    }
}

/// Bind to a pdfium shared library.
pub fn bind_pdfium() -> Result<Pdfium, DocMdError> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(path);
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| DocMdError::PdfiumBindingFailed(format!("{}: {:?}", path.display(), e)));
    }

    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map(Pdfium::new)
        .map_err(|e| DocMdError::PdfiumBindingFailed(format!("{:?}", e)))
}

// ── pdfium engine ────────────────────────────────────────────────────────────

fn load_document<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, DocMdError> {
    pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                DocMdError::WrongPassword
            } else {
                DocMdError::PasswordRequired
            }
        } else {
            DocMdError::CorruptPdf { detail: err_str }
        }
    })
}

fn extract_with_pdfium(
    pdfium: &Pdfium,
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ExtractedPdf, DocMdError> {
    let document = load_document(pdfium, bytes, config.password.as_deref())?;
    let metadata = document_metadata(&document);
    let total_pages = metadata.page_count;
    info!("PDF loaded: {} pages", total_pages);

    let selected = select_pages(config, total_pages)?;
    let mut pages = Vec::with_capacity(selected.len());

    for (idx, page) in document.pages().iter().enumerate() {
        if selected.binary_search(&idx).is_err() {
            continue;
        }
        let text = page.text().map_err(|e| DocMdError::CorruptPdf {
            detail: format!("page {}: {:?}", idx + 1, e),
        })?;
        let lines = group_lines(&text);
        debug!("Page {}: {} lines", idx + 1, lines.len());
        pages.push(PageText {
            page_num: idx + 1,
            lines,
        });
    }

    Ok(ExtractedPdf {
        pages,
        metadata,
        engine: PdfEngine::Pdfium,
    })
}

#[derive(Default)]
struct LineBuilder {
    text: String,
    sizes: BTreeMap<u32, usize>,
    glyphs: usize,
    bold_glyphs: usize,
    y: Option<f32>,
}

impl LineBuilder {
    fn push(&mut self, ch: char, size: f32, bold: bool, y: f32) {
        self.text.push(ch);
        if ch.is_whitespace() {
            return;
        }
        // Tenths of a point; the layout stage does its own rounding.
        *self.sizes.entry((size * 10.0).round() as u32).or_default() += 1;
        self.glyphs += 1;
        if bold {
            self.bold_glyphs += 1;
        }
        self.y.get_or_insert(y);
    }

    fn finish(&mut self, lines: &mut Vec<TextLine>) {
        let built = std::mem::take(self);
        let text = built.text.trim();
        if text.is_empty() || built.glyphs == 0 {
            return;
        }
        let font_size = built
            .sizes
            .iter()
            .max_by_key(|(_, &count)| count)
            .map(|(&size, _)| size as f32 / 10.0)
            .unwrap_or_default();
        lines.push(TextLine {
            text: text.to_string(),
            font_size,
            bold: built.bold_glyphs == built.glyphs,
            y: built.y.unwrap_or_default(),
        });
    }
}

fn is_bold_font(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|w| lower.contains(w))
}

/// Group a page's glyphs into visual lines.
///
/// A line ends at a pdfium-generated line break or when the baseline moves
/// by more than half the current font size.
fn group_lines(text: &PdfPageText) -> Vec<TextLine> {
    let mut lines = Vec::new();
    let mut current = LineBuilder::default();

    for ch in text.chars().iter() {
        let Some(c) = ch.unicode_char() else {
            continue;
        };
        if c == '\n' || c == '\r' {
            current.finish(&mut lines);
            continue;
        }

        let size = ch.scaled_font_size().value;
        let y = ch.origin_y().map(|p| p.value).unwrap_or_default();
        if let Some(line_y) = current.y {
            if (line_y - y).abs() > size.max(1.0) * 0.5 {
                current.finish(&mut lines);
            }
        }
        let bold = !c.is_whitespace() && is_bold_font(&ch.font_name());
        current.push(c, size, bold, y);
    }
    current.finish(&mut lines);
    lines
}

fn document_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        format: Some(DocumentFormat::Pdf),
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count: document.pages().len() as usize,
    }
}

// ── pdf-extract engine ───────────────────────────────────────────────────────

/// Receives positioned glyphs from pdf-extract and groups them into lines.
///
/// pdf-extract reports no font names, so lines from this engine are never
/// bold.
#[derive(Default)]
struct LineCollector {
    pages: Vec<PageText>,
    page_num: usize,
    lines: Vec<TextLine>,
    current: LineBuilder,
    word_start: bool,
    last_end: f64,
}

impl OutputDev for LineCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.page_num = page_num as usize;
        self.lines.clear();
        self.current = LineBuilder::default();
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.current.finish(&mut self.lines);
        self.pages.push(PageText {
            page_num: self.page_num,
            lines: std::mem::take(&mut self.lines),
        });
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        text: &str,
    ) -> Result<(), OutputError> {
        // Side of the square with the same area as the transformed em box.
        let scale = ((trm.m11 + trm.m21) * (trm.m12 + trm.m22)).abs().sqrt();
        let size = font_size * scale;
        let (x, y) = (trm.m31, trm.m32 as f32);

        let size_pt = size as f32;
        if let Some(line_y) = self.current.y {
            if (line_y - y).abs() > size_pt.max(1.0) * 0.5 {
                self.current.finish(&mut self.lines);
            }
        }
        let gap = self.word_start
            && self.current.y.is_some()
            && x > self.last_end + size * 0.1
            && !self.current.text.ends_with(char::is_whitespace);
        if gap {
            self.current.push(' ', size_pt, false, y);
        }

        for ch in text.chars() {
            self.current.push(ch, size_pt, false, y);
        }
        self.word_start = false;
        self.last_end = x + width * size;
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        self.word_start = true;
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

// pdf-extract and lopdf panic on some malformed inputs instead of returning an error.
fn guarded<T>(f: impl FnOnce() -> Result<T, DocMdError>) -> Result<T, DocMdError> {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        Err(DocMdError::CorruptPdf {
            detail: "pdf-extract aborted while parsing the document".into(),
        })
    })
}

fn load_lopdf(bytes: &[u8], password: Option<&str>) -> Result<Document, DocMdError> {
    let mut doc = Document::load_mem(bytes).map_err(|e| DocMdError::CorruptPdf {
        detail: e.to_string(),
    })?;
    if !doc.is_encrypted() {
        return Ok(doc);
    }

    // Documents with an empty user password open without one.
    doc.decrypt(password.unwrap_or("")).map_err(|e| match e {
        LopdfError::Decryption(DecryptionError::IncorrectPassword) if password.is_some() => {
            DocMdError::WrongPassword
        }
        LopdfError::Decryption(DecryptionError::IncorrectPassword) => DocMdError::PasswordRequired,
        other => DocMdError::CorruptPdf {
            detail: other.to_string(),
        },
    })?;
    Ok(doc)
}

fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info = doc.trailer.get_deref(b"Info", doc).ok()?.as_dict().ok()?;
    let value = decode_text_string(info.get_deref(key, doc).ok()?).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn lopdf_metadata(doc: &Document) -> DocumentMetadata {
    DocumentMetadata {
        format: Some(DocumentFormat::Pdf),
        title: info_string(doc, b"Title"),
        author: info_string(doc, b"Author"),
        subject: info_string(doc, b"Subject"),
        creator: info_string(doc, b"Creator"),
        producer: info_string(doc, b"Producer"),
        creation_date: info_string(doc, b"CreationDate"),
        modification_date: info_string(doc, b"ModDate"),
        page_count: doc.get_pages().len(),
    }
}

fn extract_with_pdf_extract(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ExtractedPdf, DocMdError> {
    guarded(|| {
        let doc = load_lopdf(bytes, config.password.as_deref())?;
        let metadata = lopdf_metadata(&doc);
        info!("PDF loaded with pdf-extract: {} pages", metadata.page_count);

        let selected = select_pages(config, metadata.page_count)?;
        let mut collector = LineCollector::default();
        for idx in selected {
            output_doc_page(&doc, &mut collector, idx as u32 + 1).map_err(|e| {
                DocMdError::CorruptPdf {
                    detail: format!("page {}: {}", idx + 1, e),
                }
            })?;
        }
        for page in &collector.pages {
            debug!("Page {}: {} lines", page.page_num, page.lines.len());
        }

        Ok(ExtractedPdf {
            pages: collector.pages,
            metadata,
            engine: PdfEngine::PdfExtract,
        })
    })
}

fn select_pages(config: &ConversionConfig, total_pages: usize) -> Result<Vec<usize>, DocMdError> {
    let selected = config.pages.to_indices(total_pages);
    if selected.is_empty() {
        return Err(DocMdError::PageOutOfRange {
            page: config.pages.first_requested(),
            total: total_pages,
        });
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageSelection;

    #[test]
    fn bold_font_names() {
        assert!(is_bold_font("Helvetica-Bold"));
        assert!(is_bold_font("ABCDEE+Calibri,Bold"));
        assert!(is_bold_font("Inter-SemiBold"));
        assert!(!is_bold_font("Times-Roman"));
    }

    #[test]
    fn line_builder_picks_dominant_size() {
        let mut lines = Vec::new();
        let mut b = LineBuilder::default();
        for c in "Hello".chars() {
            b.push(c, 12.0, true, 700.0);
        }
        b.push(' ', 12.0, false, 700.0);
        b.push('x', 8.0, true, 700.0);
        b.finish(&mut lines);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hello x");
        assert_eq!(lines[0].font_size, 12.0);
        assert!(lines[0].bold);
        assert_eq!(lines[0].y, 700.0);
    }

    #[test]
    fn line_builder_skips_blank_lines() {
        let mut lines = Vec::new();
        let mut b = LineBuilder::default();
        b.push(' ', 12.0, false, 0.0);
        b.finish(&mut lines);
        assert!(lines.is_empty());
    }

    #[test]
    fn collector_groups_glyphs_by_baseline() {
        let at = |x: f64, y: f64| Transform::row_major(1.0, 0.0, 0.0, 1.0, x, y);
        let media_box = MediaBox {
            llx: 0.0,
            lly: 0.0,
            urx: 612.0,
            ury: 792.0,
        };
        let mut c = LineCollector::default();
        c.begin_page(3, &media_box, None).unwrap();

        c.begin_word().unwrap();
        c.output_character(&at(72.0, 700.0), 0.5, 0.0, 20.0, "H").unwrap();
        c.output_character(&at(82.0, 700.0), 0.25, 0.0, 20.0, "i").unwrap();
        // A separate show-text op further right on the same baseline.
        c.begin_word().unwrap();
        c.output_character(&at(120.0, 700.0), 0.5, 0.0, 20.0, "there").unwrap();
        c.begin_word().unwrap();
        c.output_character(&at(72.0, 670.0), 0.5, 0.0, 10.0, "body").unwrap();
        c.end_page().unwrap();

        assert_eq!(c.pages.len(), 1);
        let page = &c.pages[0];
        assert_eq!(page.page_num, 3);
        let lines: Vec<_> = page
            .lines
            .iter()
            .map(|l| (l.text.as_str(), l.font_size, l.y))
            .collect();
        assert_eq!(lines, vec![("Hi there", 20.0, 700.0), ("body", 10.0, 670.0)]);
        assert!(page.lines.iter().all(|l| !l.bold));
    }

    #[test]
    fn empty_selection_is_out_of_range() {
        let config = ConversionConfig::builder()
            .pages(PageSelection::Single(4))
            .build()
            .unwrap();
        let err = select_pages(&config, 2).unwrap_err();
        assert!(matches!(err, DocMdError::PageOutOfRange { page: 4, total: 2 }));
    }

    #[test]
    fn empty_bytes_fail_before_any_engine() {
        let err = extract_pdf(b"", &ConversionConfig::default()).unwrap_err();
        assert!(err.is_decode_error());
        assert!(matches!(err, DocMdError::EmptyInput { .. }));
    }

    #[test]
    fn garbage_after_header_is_corrupt_with_pdf_extract() {
        let config = ConversionConfig::builder()
            .pdf_engine(PdfEngine::PdfExtract)
            .build()
            .unwrap();
        let err = extract_pdf(b"%PDF-1.4\nthis is not a pdf body", &config).unwrap_err();
        assert!(err.is_decode_error(), "got: {err:?}");
    }
}
