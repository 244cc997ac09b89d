//! Conversion entry points.
//!
//! Every entry point funnels into [`convert`], which resolves the route from
//! the registry before touching any content and then runs the CPU-bound
//! adapters on the tokio blocking pool.
//!
//! ## Batches
//!
//! [`convert_batch`] runs files strictly one after another and isolates
//! them: a failed file is recorded in its [`BatchItem`] and the next file
//! still runs. With [`ConversionConfig::fail_fast`] the first failure stops
//! the batch and the remaining files are reported as skipped. Use
//! [`crate::stream::convert_stream`] instead when you want each outcome as
//! soon as it is ready.

use crate::config::ConversionConfig;
use crate::error::{ConvertError, FileError};
use crate::format::{extension_of, Format};
use crate::output::{BatchItem, BatchReport, ConversionOutput, Payload};
use crate::pipeline::raster;
use crate::registry::{self, Route};
use crate::source::SourceFile;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert one source file to `target`.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// * [`ConvertError::UnsupportedConversion`] if the pair is not in the
///   registry (checked before any decoding).
/// * [`ConvertError::Read`], [`ConvertError::Decode`] or
///   [`ConvertError::Encode`] if the content cannot be converted.
pub async fn convert(
    source: &SourceFile,
    target: Format,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let start = Instant::now();
    info!("Starting conversion: {} → {}", source.name(), target);

    // ── Step 1: Resolve route ────────────────────────────────────────────
    let (from, route) = resolve(source.name(), target)?;
    debug!("{} ({} bytes): {:?}", source.name(), source.size(), route);

    // ── Step 2: Run adapters on the blocking pool ────────────────────────
    let payload = {
        let source = source.clone();
        let config = config.clone();
        tokio::task::spawn_blocking(move || run_route(route, &source, from, target, &config))
            .await
            .map_err(|e| ConvertError::Internal(format!("Conversion task failed: {}", e)))??
    };

    info!(
        "Conversion complete: {} → {} ({} bytes, {}ms)",
        source.name(),
        target,
        payload.len(),
        start.elapsed().as_millis()
    );

    Ok(ConversionOutput::new(payload, source, target, config.naming))
}

/// Convert in-memory bytes named `name`.
pub async fn convert_bytes(
    name: impl Into<String>,
    bytes: impl Into<Vec<u8>>,
    target: Format,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    convert(&SourceFile::new(name, bytes), target, config).await
}

/// Read a file from disk and convert it.
///
/// The route is checked against the file name first, so an unsupported pair
/// fails without reading the file.
pub async fn convert_path(
    path: impl AsRef<Path>,
    target: Format,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let path = path.as_ref();
    resolve(&path.to_string_lossy(), target)?;
    let source = SourceFile::from_path(path).await?;
    convert(&source, target, config).await
}

/// Convert a file and write the result into `out_dir`.
///
/// The output is named per [`ConversionConfig::naming`] and written
/// atomically. Returns the written path.
pub async fn convert_to_file(
    path: impl AsRef<Path>,
    target: Format,
    out_dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<PathBuf, ConvertError> {
    let output = convert_path(path, target, config).await?;
    let dest = out_dir.as_ref().join(&output.file_name);
    output.write_to(&dest).await?;
    info!("Wrote {}", dest.display());
    Ok(dest)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    source: &SourceFile,
    target: Format,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(source, target, config))
}

/// Convert every file to `target`, one at a time, in input order.
pub async fn convert_batch(
    files: &[SourceFile],
    target: Format,
    config: &ConversionConfig,
) -> BatchReport {
    let total = files.len();
    info!("Starting batch: {} files → {}", total, target);
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut items = Vec::with_capacity(total);
    let mut aborted = false;
    for (index, file) in files.iter().enumerate() {
        if aborted {
            items.push(skipped_item(index, total, file, config));
            continue;
        }
        let item = convert_item(index, total, file, target, config).await;
        if config.fail_fast && !item.is_success() {
            warn!(
                "Stopping batch after {} failed; skipping {} remaining file(s)",
                file.name(),
                total - index - 1
            );
            aborted = true;
        }
        items.push(item);
    }

    let report = BatchReport { target, items };
    let stats = report.stats();
    info!(
        "Batch complete: {}/{} converted, {} failed, {} skipped",
        stats.succeeded, stats.total, stats.failed, stats.skipped
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.succeeded);
    }
    report
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Look up the route for a file name and target, naming both extensions in
/// the error when the pair is unsupported.
fn resolve(name: &str, target: Format) -> Result<(Format, Route), ConvertError> {
    let unsupported = || ConvertError::unsupported(extension_of(name), target.extension());
    let from = Format::from_file_name(name).ok_or_else(unsupported)?;
    let route = registry::route(from, target).ok_or_else(unsupported)?;
    Ok((from, route))
}

fn run_route(
    route: Route,
    source: &SourceFile,
    from: Format,
    target: Format,
    config: &ConversionConfig,
) -> Result<Payload, ConvertError> {
    match route {
        Route::Document(pipeline) => pipeline.execute(source, target, config),
        Route::Raster => {
            raster::transcode(source.bytes(), from, target, config.jpeg_quality)
                .map(Payload::Binary)
        }
    }
}

/// Convert one batch member, firing progress events and capturing the error.
pub(crate) async fn convert_item(
    index: usize,
    total: usize,
    file: &SourceFile,
    target: Format,
    config: &ConversionConfig,
) -> BatchItem {
    let name = file.name().to_string();
    if let Some(ref cb) = config.progress_callback {
        cb.on_file_start(index, total, &name);
    }

    match convert(file, target, config).await {
        Ok(output) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_complete(index, total, &name, output.payload.len());
            }
            BatchItem {
                index,
                name,
                output: Some(output),
                error: None,
            }
        }
        Err(e) => {
            warn!("Failed to convert {}: {}", name, e);
            let message = e.to_string();
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_error(index, total, &name, message.clone());
            }
            BatchItem {
                index,
                error: Some(FileError::Failed {
                    name: name.clone(),
                    message,
                }),
                name,
                output: None,
            }
        }
    }
}

/// A batch member never attempted because fail-fast stopped the batch.
pub(crate) fn skipped_item(
    index: usize,
    total: usize,
    file: &SourceFile,
    config: &ConversionConfig,
) -> BatchItem {
    let error = FileError::Skipped {
        name: file.name().to_string(),
    };
    if let Some(ref cb) = config.progress_callback {
        cb.on_file_error(index, total, file.name(), error.to_string());
    }
    BatchItem {
        index,
        name: file.name().to_string(),
        output: None,
        error: Some(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputNaming;

    #[tokio::test]
    async fn unsupported_pair_fails_before_reading() {
        let err = convert_path("/no/such/dir/image.gif", Format::Docx, &ConversionConfig::default())
            .await
            .unwrap_err();
        match err {
            ConvertError::UnsupportedConversion { from, to } => {
                assert_eq!(from, "GIF");
                assert_eq!(to, "DOCX");
            }
            other => panic!("expected UnsupportedConversion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_extension_is_unsupported() {
        let err = convert_bytes("notes.rtf", "x", Format::Txt, &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("RTF"), "got: {err}");
    }

    #[tokio::test]
    async fn txt_to_html() {
        let out = convert_bytes("a.txt", "one\ntwo", Format::Html, &ConversionConfig::default())
            .await
            .unwrap();
        assert_eq!(out.payload.as_text(), Some("<p>one</p>\n<p>two</p>"));
        assert_eq!(out.file_name, "converted.html");
        assert_eq!(out.mime_type(), "text/html");
    }

    #[tokio::test]
    async fn stem_naming() {
        let config = ConversionConfig::builder()
            .naming(OutputNaming::SourceStem)
            .build()
            .unwrap();
        let out = convert_bytes("minutes.md", "# Hi\n", Format::Txt, &config)
            .await
            .unwrap();
        assert_eq!(out.file_name, "minutes.txt");
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let err = convert_path("/no/such/dir/notes.txt", Format::Html, &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Read { .. }));
    }

    #[test]
    fn sync_wrapper() {
        let src = SourceFile::new("t.csv", "a,b\n1,2\n");
        let out = convert_sync(&src, Format::Md, &ConversionConfig::default()).unwrap();
        assert_eq!(out.payload.as_text(), Some("| a | b |\n| --- | --- |\n| 1 | 2 |\n"));
    }

    #[tokio::test]
    async fn batch_continues_after_failure() {
        let files = vec![
            SourceFile::new("a.txt", "x"),
            SourceFile::new("b.gif", "x"),
            SourceFile::new("c.txt", "y"),
        ];
        let report = convert_batch(&files, Format::Html, &ConversionConfig::default()).await;
        let stats = report.stats();
        assert_eq!((stats.succeeded, stats.failed, stats.skipped), (2, 1, 0));
        assert_eq!(report.items[1].name, "b.gif");
    }

    #[tokio::test]
    async fn fail_fast_skips_rest() {
        let config = ConversionConfig::builder().fail_fast(true).build().unwrap();
        let files = vec![
            SourceFile::new("a.txt", "x"),
            SourceFile::new("b.gif", "x"),
            SourceFile::new("c.txt", "y"),
        ];
        let report = convert_batch(&files, Format::Html, &config).await;
        let stats = report.stats();
        assert_eq!((stats.succeeded, stats.failed, stats.skipped), (1, 1, 1));
        assert!(report.items[2].is_skipped());
    }
}
