//! Streaming batch API: emit each file's outcome as soon as it is ready.
//!
//! ## Why stream?
//!
//! A batch of large PDFs or spreadsheets can take a while. A stream lets
//! callers show or save each result immediately instead of waiting for
//! [`crate::convert::convert_batch`] to return the whole report.
//!
//! Files are still converted one after another, so items arrive in input
//! order with the same isolation and fail-fast rules as the eager batch.

use crate::config::ConversionConfig;
use crate::convert::{convert_item, skipped_item};
use crate::format::Format;
use crate::output::BatchItem;
use crate::source::SourceFile;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of per-file batch outcomes.
pub type BatchStream = Pin<Box<dyn Stream<Item = BatchItem> + Send>>;

/// Convert `files` to `target`, yielding one [`BatchItem`] per file in input
/// order.
///
/// # Example
/// ```rust,no_run
/// use docshift::{convert_stream, ConversionConfig, Format, SourceFile};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let files = vec![SourceFile::new("notes.md", "# Notes\n")];
/// let mut stream = convert_stream(files, Format::Html, &ConversionConfig::default()).await;
/// while let Some(item) = stream.next().await {
///     match (item.output, item.error) {
///         (Some(out), _) => println!("{} → {}", item.name, out.file_name),
///         (_, Some(e)) => eprintln!("{e}"),
///         _ => {}
///     }
/// }
/// # }
/// ```
pub async fn convert_stream(
    files: Vec<SourceFile>,
    target: Format,
    config: &ConversionConfig,
) -> BatchStream {
    let total = files.len();
    info!("Starting streaming batch: {} files → {}", total, target);
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let aborted = Arc::new(AtomicBool::new(false));
    let succeeded = Arc::new(AtomicUsize::new(0));
    let config_clone = config.clone();

    let s = stream::iter(files.into_iter().enumerate()).then(move |(index, file)| {
        let cfg = config_clone.clone();
        let aborted = Arc::clone(&aborted);
        let succeeded = Arc::clone(&succeeded);
        async move {
            let item = if aborted.load(Ordering::SeqCst) {
                skipped_item(index, total, &file, &cfg)
            } else {
                let item = convert_item(index, total, &file, target, &cfg).await;
                if item.is_success() {
                    succeeded.fetch_add(1, Ordering::SeqCst);
                } else if cfg.fail_fast {
                    warn!("Stopping streaming batch after {} failed", file.name());
                    aborted.store(true, Ordering::SeqCst);
                }
                item
            };

            if index + 1 == total {
                let ok = succeeded.load(Ordering::SeqCst);
                info!("Streaming batch complete: {}/{} converted", ok, total);
                if let Some(ref cb) = cfg.progress_callback {
                    cb.on_batch_complete(total, ok);
                }
            }
            item
        }
    });

    Box::pin(s)
}
