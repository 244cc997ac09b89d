//! Progress-callback trait for per-file conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as a batch moves through its files.
//!
//! # Example
//!
//! ```rust
//! use docshift::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, index: usize, total: usize, name: &str, output_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {name} ({output_len} bytes)", index + 1, total);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     completed: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch driver as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Files are processed one after another, so events
/// for a batch arrive in order, but the callback may be invoked from a
/// different thread than the one that started the batch.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first file is attempted.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file is converted.
    ///
    /// # Arguments
    /// * `index`: 0-indexed position in the batch
    /// * `total`: files in the batch
    /// * `name` : the input file name
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a file converts successfully.
    ///
    /// `output_len` is the byte length of the produced payload.
    fn on_file_complete(&self, index: usize, total: usize, name: &str, output_len: usize) {
        let _ = (index, total, name, output_len);
    }

    /// Called when a file fails or is skipped.
    fn on_file_error(&self, index: usize, total: usize, name: &str, error: String) {
        let _ = (index, total, name, error);
    }

    /// Called once after every file has been attempted or skipped.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
