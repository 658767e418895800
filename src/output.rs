//! Result types returned by the conversion entry points.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Document container formats the crate can convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Identify the format from the leading bytes of a document.
    ///
    /// A zip package only counts as DOCX when it contains a
    /// `word/document.xml` entry name; the local-file headers are scanned
    /// without inflating anything.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            return Some(DocumentFormat::Pdf);
        }
        if bytes.starts_with(b"PK\x03\x04") && contains(bytes, b"word/document.xml") {
            return Some(DocumentFormat::Docx);
        }
        None
    }

    /// Identify the format from a file extension (case-insensitive).
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" | "docm" | "dotx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => f.write_str("PDF"),
            DocumentFormat::Docx => f.write_str("DOCX"),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Descriptive metadata read from the document without converting content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub format: Option<DocumentFormat>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    /// Number of pages (PDF only; 0 for DOCX, which has no fixed pagination).
    pub page_count: usize,
}

/// Statistics for a single conversion.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document (PDF only).
    pub total_pages: usize,
    /// Pages that were selected and converted (PDF only).
    pub converted_pages: usize,
    /// Extraction backend that produced the raw text.
    pub engine: String,
    /// Byte length of the final Markdown.
    pub markdown_bytes: usize,
    pub total_duration_ms: u64,
}

/// Output of a full conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub markdown: String,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sniff_pdf_header() {
        assert_eq!(DocumentFormat::sniff(b"%PDF-1.7\n..."), Some(DocumentFormat::Pdf));
    }

    #[test]
    fn sniff_plain_zip_is_not_docx() {
        assert_eq!(DocumentFormat::sniff(b"PK\x03\x04\x14\x00content.xml"), None);
    }

    #[test]
    fn sniff_docx_entry_name() {
        let bytes = b"PK\x03\x04\x14\x00\x00\x00word/document.xml<w:document/>";
        assert_eq!(DocumentFormat::sniff(bytes), Some(DocumentFormat::Docx));
    }

    #[test]
    fn sniff_empty_is_none() {
        assert_eq!(DocumentFormat::sniff(b""), None);
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_extension(&PathBuf::from("Report.DOCX")),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_extension(&PathBuf::from("a.pdf")),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(DocumentFormat::from_extension(&PathBuf::from("notes.txt")), None);
        assert_eq!(DocumentFormat::from_extension(&PathBuf::from("README")), None);
    }

    #[test]
    fn output_serialises_to_json() {
        let out = ConversionOutput {
            markdown: "# Hi\n".into(),
            metadata: DocumentMetadata {
                format: Some(DocumentFormat::Pdf),
                page_count: 1,
                ..Default::default()
            },
            stats: ConversionStats::default(),
        };
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"format\":\"pdf\""), "got: {json}");
    }
}
