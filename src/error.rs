//! Error types for the docshift library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`]: **Fatal** for one file. The pair is not in the
//!   registry, the input cannot be read or decoded, or the output cannot be
//!   encoded. Returned as `Err(ConvertError)` from the `convert*` functions.
//!
//! * [`FileError`]: **Non-fatal** for a batch. One file failed (or was
//!   skipped) but the others are unaffected. Stored inside
//!   [`crate::output::BatchItem`] so callers can inspect partial success.

use crate::format::Format;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docshift library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Routing errors ────────────────────────────────────────────────────
    /// The (input, output) pair is absent from the registry.
    #[error("Conversion from {from} to {to} is not supported")]
    UnsupportedConversion { from: String, to: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The input could not be read as bytes or as UTF-8 text.
    #[error("Failed to read '{name}': {detail}")]
    Read { name: String, detail: String },

    /// The input bytes are not a valid instance of their declared format.
    #[error("Failed to decode {format} input: {detail}")]
    Decode { format: Format, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The output document could not be produced.
    #[error("Failed to encode {format} output: {detail}")]
    Encode { format: Format, detail: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// At least one file of a batch failed.
    ///
    /// Returned by [`crate::output::BatchReport::into_result`] when the
    /// caller wants to treat any per-file failure as an error.
    #[error("{failed}/{total} files failed during conversion")]
    BatchFailed { failed: usize, total: usize },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Build an [`ConvertError::UnsupportedConversion`] naming both formats
    /// in upper case, e.g. `GIF` → `DOCX`.
    pub fn unsupported(from: impl AsRef<str>, to: impl AsRef<str>) -> Self {
        let label = |s: &str| {
            if s.is_empty() {
                "(no extension)".to_string()
            } else {
                s.to_uppercase()
            }
        };
        ConvertError::UnsupportedConversion {
            from: label(from.as_ref()),
            to: label(to.as_ref()),
        }
    }

    pub(crate) fn decode(format: Format, detail: impl ToString) -> Self {
        ConvertError::Decode {
            format,
            detail: detail.to_string(),
        }
    }

    pub(crate) fn encode(format: Format, detail: impl ToString) -> Self {
        ConvertError::Encode {
            format,
            detail: detail.to_string(),
        }
    }
}

/// A non-fatal error for a single file of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The file was attempted and failed.
    #[error("{name}: {message}")]
    Failed { name: String, message: String },

    /// The file was never attempted because an earlier file failed in
    /// fail-fast mode.
    #[error("{name}: skipped after an earlier failure")]
    Skipped { name: String },
}

impl FileError {
    pub fn name(&self) -> &str {
        match self {
            FileError::Failed { name, .. } | FileError::Skipped { name } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_names_both_formats() {
        let e = ConvertError::unsupported("gif", "docx");
        let msg = e.to_string();
        assert!(msg.contains("GIF"), "got: {msg}");
        assert!(msg.contains("DOCX"), "got: {msg}");
    }

    #[test]
    fn unsupported_without_extension() {
        let msg = ConvertError::unsupported("", "pdf").to_string();
        assert!(msg.contains("(no extension)"), "got: {msg}");
    }

    #[test]
    fn decode_display() {
        let e = ConvertError::decode(Format::Pdf, "bad xref");
        assert_eq!(e.to_string(), "Failed to decode pdf input: bad xref");
    }

    #[test]
    fn batch_failed_display() {
        let e = ConvertError::BatchFailed {
            failed: 1,
            total: 4,
        };
        assert!(e.to_string().contains("1/4"));
    }

    #[test]
    fn file_error_name() {
        let e = FileError::Skipped {
            name: "b.txt".into(),
        };
        assert_eq!(e.name(), "b.txt");
        assert!(e.to_string().contains("skipped"));
    }
}
