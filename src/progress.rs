//! Progress-callback trait for per-line conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events while the classifier walks the source lines.
//!
//! # Example
//!
//! ```rust
//! use md2docx::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter {
//!     failed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for FailureCounter {
//!     fn on_image_failed(&self, line_num: usize, reason: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("line {line_num}: {reason}");
//!     }
//! }
//!
//! let counter = Arc::new(FailureCounter { failed: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes each line.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` several
/// lines are in flight at once and events for different lines may arrive
/// out of source order. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any line is classified.
    fn on_conversion_start(&self, total_lines: usize) {
        let _ = total_lines;
    }

    /// Called after a line has been turned into a block.
    ///
    /// # Arguments
    /// * `line_num` — 1-indexed source line number
    /// * `kind`     — the block kind (see [`crate::model::Block::kind`])
    fn on_line_complete(&self, line_num: usize, total_lines: usize, kind: &str) {
        let _ = (line_num, total_lines, kind);
    }

    /// Called when an image line was embedded.
    fn on_image_resolved(&self, line_num: usize, width: u32, height: u32) {
        let _ = (line_num, width, height);
    }

    /// Called when an image line fell back to a placeholder paragraph.
    fn on_image_failed(&self, line_num: usize, reason: &str) {
        let _ = (line_num, reason);
    }

    /// Called once after every line has been classified.
    fn on_conversion_complete(&self, total_blocks: usize, image_failures: usize) {
        let _ = (total_blocks, image_failures);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
