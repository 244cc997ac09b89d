//! # docshift
//!
//! Convert documents between everyday office formats entirely in memory:
//! plain text, HTML, CSV, Markdown, PDF, Word (`.doc`/`.docx`), spreadsheets
//! (`.xls`/`.xlsx`) and raster images (JPEG, PNG, GIF).
//!
//! ## Pipeline Overview
//!
//! ```text
//! SourceFile (name + bytes)
//!  │
//!  ├─ 1. Route    registry lookup on (input ext, target); unsupported pairs stop here
//!  ├─ 2. Read     UTF-8 text, CSV table, PDF text, Word text or first worksheet
//!  ├─ 3. Steps    pure transcoders: text ⇄ HTML ⇄ Markdown, tables → CSV/HTML/MD/JSON
//!  ├─ 4. Write    text payload, laid-out PDF, or DOCX package
//!  └─ 5. Output   ConversionOutput { payload, file_name, format }
//! ```
//!
//! Images skip steps 2–4 and are decoded and re-encoded by
//! [`pipeline::raster`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docshift::{convert_path, ConversionConfig, Format};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert_path("notes.md", Format::Html, &config).await?;
//!     println!("{}", output.payload.as_text().unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Conversions
//!
//! | From | To |
//! |------|----|
//! | txt, html, csv, md | each other, pdf, doc, docx |
//! | pdf | txt, html, csv, md, doc, docx |
//! | doc, docx | txt, html, csv, md, pdf |
//! | xls, xlsx | txt, html, csv, pdf |
//! | jpg, png, gif | each other |
//!
//! [`registry::route`] is authoritative; [`registry::supported_pairs`] lists
//! every pair.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docshift` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! docshift = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod source;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, OutputNaming, PageSelection, PdfLayout,
};
pub use convert::{
    convert, convert_batch, convert_bytes, convert_path, convert_sync, convert_to_file,
};
pub use error::{ConvertError, FileError};
pub use format::{Format, ParseFormatError};
pub use output::{BatchItem, BatchReport, BatchStats, ConversionOutput, Payload};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use registry::{is_supported, supported_pairs, targets_for};
pub use source::SourceFile;
pub use stream::{convert_stream, BatchStream};
