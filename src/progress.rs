//! Progress-callback trait for per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events while PDF pages are extracted. DOCX conversion has no pages and
//! only reports start and completion.
//!
//! # Example
//!
//! ```rust
//! use docmd::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} done ({} bytes)", page_num, total_pages, markdown_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: AtomicUsize::new(0),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it renders each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Conversion is synchronous, so events arrive in page
/// order on the calling thread.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once the selected pages have been extracted, before any of them
    /// is rendered.
    ///
    /// # Arguments
    /// * `total_pages` - number of pages that will be processed (0 for DOCX)
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is rendered to Markdown.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page is successfully converted.
    ///
    /// # Arguments
    /// * `page_num`     - 1-indexed page number
    /// * `total_pages`  - pages selected for conversion
    /// * `markdown_len` - byte length of the page's Markdown
    fn on_page_complete(&self, page_num: usize, total_pages: usize, markdown_len: usize) {
        let _ = (page_num, total_pages, markdown_len);
    }

    /// Called once after the document has been converted.
    fn on_conversion_complete(&self, total_pages: usize, markdown_len: usize) {
        let _ = (total_pages, markdown_len);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
