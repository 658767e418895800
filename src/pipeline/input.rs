//! Input resolution: read a user-supplied path and identify its format.
//!
//! Content sniffing wins over the file extension so a mis-named file still
//! converts. The extension is only consulted when the bytes are not
//! recognised, in which case the selected decoder reports why they are
//! invalid (e.g. a truncated `.pdf`).

use crate::error::DocMdError;
use crate::output::DocumentFormat;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read a local file, mapping I/O failures to [`DocMdError`] variants.
pub fn read_input(path: &Path) -> Result<Vec<u8>, DocMdError> {
    match std::fs::read(path) {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DocMdError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(DocMdError::PermissionDenied {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(DocMdError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Decide which converter handles `bytes` read from `path`.
pub fn detect_format(path: &Path, bytes: &[u8]) -> Result<DocumentFormat, DocMdError> {
    if let Some(format) = DocumentFormat::sniff(bytes) {
        return Ok(format);
    }
    if let Some(format) = DocumentFormat::from_extension(path) {
        debug!("Content not recognised; using extension of {}", path.display());
        return Ok(format);
    }
    Err(DocMdError::UnsupportedFormat {
        path: PathBuf::from(path),
        magic: bytes.iter().take(4).copied().collect(),
    })
}

/// Reject empty input and check the `%PDF` header.
pub fn validate_pdf(bytes: &[u8]) -> Result<(), DocMdError> {
    if bytes.is_empty() {
        return Err(DocMdError::EmptyInput {
            format: DocumentFormat::Pdf,
        });
    }
    if !bytes.starts_with(b"%PDF") {
        return Err(DocMdError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Reject empty input and check the zip local-file header.
pub fn validate_docx(bytes: &[u8]) -> Result<(), DocMdError> {
    if bytes.is_empty() {
        return Err(DocMdError::EmptyInput {
            format: DocumentFormat::Docx,
        });
    }
    if !bytes.starts_with(b"PK") {
        return Err(DocMdError::NotADocx {
            detail: format!(
                "missing zip signature (first bytes: {:?})",
                bytes.iter().take(4).collect::<Vec<_>>()
            ),
        });
    }
    Ok(())
}
