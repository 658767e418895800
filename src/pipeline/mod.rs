//! Pipeline stages for document-to-Markdown conversion.
//!
//! Each submodule implements one transformation step and is tested on its
//! own.
//!
//! ## Data Flow
//!
//! ```text
//!           ┌─▶ pdf ──▶ layout ─┐
//! input ────┤                   ├──▶ postprocess ──▶ strategy
//! (bytes)   └─▶ docx ───────────┘    (formatting)    (replacements)
//! ```
//!
//! 1. [`input`]  - read the file and identify PDF vs. DOCX
//! 2. [`pdf`]    - pull positioned text lines out of a PDF (pdfium or
//!    pdf-extract)
//! 3. [`layout`] - infer headings, paragraphs and lists from font sizes and
//!    line gaps
//! 4. [`docx`]   - stream the OOXML body straight into Markdown
//! 5. [`postprocess`] - deterministic formatting of the extracted Markdown
//!
//! The replacement strategy itself lives in [`crate::strategy`] because it is
//! public API in its own right.

pub mod docx;
pub mod input;
pub mod layout;
pub mod pdf;
pub mod postprocess;
