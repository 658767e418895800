//! Error types for the docmd library.
//!
//! Every fallible library function returns [`DocMdError`]. The variants fall
//! into four groups:
//!
//! * **Input** - the file could not be read or its format not recognised.
//! * **Decode** - the bytes are not a valid PDF/DOCX, or the extraction
//!   library refused them. [`DocMdError::is_decode_error`] identifies these.
//! * **Strategy** - a replacement strategy entry is invalid (empty pattern).
//! * **Output / config** - writing the result or validating options failed.
//!
//! Messages from the underlying extraction libraries are carried unchanged in
//! the `detail` fields.

use crate::output::DocumentFormat;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docmd library.
#[derive(Debug, Error)]
pub enum DocMdError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the input file failed for another I/O reason.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither the content nor the file extension identify a supported format.
    #[error("Unsupported document format for '{path}'\nFirst bytes: {magic:?}")]
    UnsupportedFormat { path: PathBuf, magic: Vec<u8> },

    // ── Decode errors ─────────────────────────────────────────────────────
    /// Zero-length input; there is nothing to decode.
    #[error("Cannot decode empty input as {format}")]
    EmptyInput { format: DocumentFormat },

    /// The bytes do not start with the `%PDF` header.
    #[error("Input is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The bytes are not a zip package containing `word/document.xml`.
    #[error("Input is not a valid DOCX: {detail}")]
    NotADocx { detail: String },

    /// The package is a DOCX but its XML could not be parsed.
    #[error("DOCX is corrupt: {detail}")]
    CorruptDocx { detail: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library in the working\n\
directory, or use --engine pdf-extract for the pure-Rust extractor.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Strategy errors ───────────────────────────────────────────────────
    /// A replacement rule has an empty pattern.
    #[error("Replacement rule #{index} has an empty pattern")]
    EmptyPattern { index: usize },

    /// A strategy file could not be read or parsed.
    #[error("Invalid replacement strategy: {0}")]
    InvalidStrategy(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the output Markdown file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocMdError {
    /// Whether the error means the input bytes could not be decoded as the
    /// requested document format.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            DocMdError::EmptyInput { .. }
                | DocMdError::NotAPdf { .. }
                | DocMdError::CorruptPdf { .. }
                | DocMdError::PasswordRequired
                | DocMdError::WrongPassword
                | DocMdError::NotADocx { .. }
                | DocMdError::CorruptDocx { .. }
        )
    }
}
