//! Output types for conversion results.

use crate::config::OutputNaming;
use crate::error::{ConvertError, FileError};
use crate::format::Format;
use crate::source::SourceFile;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use std::path::Path;

/// The converted content: text for textual targets, bytes for binary ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Binary(b) => b,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            Payload::Binary(_) => None,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Payload::Text(s) => s.into_bytes(),
            Payload::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The result of converting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub payload: Payload,
    /// Suggested download name, `converted.<ext>` by default.
    pub file_name: String,
    pub format: Format,
}

impl ConversionOutput {
    pub(crate) fn new(
        payload: Payload,
        source: &SourceFile,
        format: Format,
        naming: OutputNaming,
    ) -> Self {
        Self {
            payload,
            file_name: output_file_name(source, format, naming),
            format,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// A `data:` URL carrying the payload, for handing straight to a browser.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            STANDARD.encode(self.payload.as_bytes())
        )
    }

    /// Write the payload to `path`.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ConvertError> {
        let path = path.as_ref();
        let failed = |source| ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        tokio::fs::write(&tmp_name, self.payload.as_bytes())
            .await
            .map_err(failed)?;
        tokio::fs::rename(&tmp_name, path).await.map_err(failed)?;
        Ok(())
    }
}

/// Name an output file after the naming policy.
pub fn output_file_name(source: &SourceFile, format: Format, naming: OutputNaming) -> String {
    match naming {
        OutputNaming::Converted => format!("converted.{}", format.extension()),
        OutputNaming::SourceStem => format!("{}.{}", source.stem(), format.extension()),
    }
}

// ── Batches ──────────────────────────────────────────────────────────────

/// Outcome for one file of a batch: exactly one of `output` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// 0-indexed position in the batch.
    pub index: usize,
    pub name: String,
    pub output: Option<ConversionOutput>,
    pub error: Option<FileError>,
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        self.output.is_some()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.error, Some(FileError::Skipped { .. }))
    }
}

/// All outcomes of a batch, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub target: Format,
    pub items: Vec<BatchItem>,
}

/// Aggregate counts for a batch, suitable for logs and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn stats(&self) -> BatchStats {
        let skipped = self.items.iter().filter(|i| i.is_skipped()).count();
        let succeeded = self.items.iter().filter(|i| i.is_success()).count();
        BatchStats {
            total: self.items.len(),
            succeeded,
            failed: self.items.len() - succeeded - skipped,
            skipped,
        }
    }

    pub fn outputs(&self) -> impl Iterator<Item = &ConversionOutput> {
        self.items.iter().filter_map(|i| i.output.as_ref())
    }

    pub fn errors(&self) -> impl Iterator<Item = &FileError> {
        self.items.iter().filter_map(|i| i.error.as_ref())
    }

    pub fn is_complete_success(&self) -> bool {
        self.items.iter().all(BatchItem::is_success)
    }

    /// `Ok` with every output when all files converted, otherwise
    /// [`ConvertError::BatchFailed`].
    pub fn into_result(self) -> Result<Vec<ConversionOutput>, ConvertError> {
        if self.is_complete_success() {
            Ok(self.items.into_iter().filter_map(|i| i.output).collect())
        } else {
            let stats = self.stats();
            Err(ConvertError::BatchFailed {
                failed: stats.total - stats.succeeded,
                total: stats.total,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_item(index: usize) -> BatchItem {
        BatchItem {
            index,
            name: format!("f{index}.txt"),
            output: Some(ConversionOutput {
                payload: Payload::Text("x".into()),
                file_name: "converted.html".into(),
                format: Format::Html,
            }),
            error: None,
        }
    }

    fn err_item(index: usize, error: FileError) -> BatchItem {
        BatchItem {
            index,
            name: error.name().to_string(),
            output: None,
            error: Some(error),
        }
    }

    #[test]
    fn default_name_is_converted() {
        let src = SourceFile::new("report.pdf", Vec::<u8>::new());
        assert_eq!(
            output_file_name(&src, Format::Md, OutputNaming::Converted),
            "converted.md"
        );
        assert_eq!(
            output_file_name(&src, Format::Md, OutputNaming::SourceStem),
            "report.md"
        );
    }

    #[test]
    fn data_url_encodes_payload() {
        let out = ConversionOutput {
            payload: Payload::Text("hi".into()),
            file_name: "converted.txt".into(),
            format: Format::Txt,
        };
        assert_eq!(out.to_data_url(), "data:text/plain;base64,aGk=");
    }

    #[tokio::test]
    async fn write_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/converted.csv");
        let out = ConversionOutput {
            payload: Payload::Text("a,b\n".into()),
            file_name: "converted.csv".into(),
            format: Format::Csv,
        };
        out.write_to(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
        assert!(!dir.path().join("nested/out/converted.csv.tmp").exists());
    }

    #[test]
    fn payload_lengths() {
        assert_eq!(Payload::Text("abc".into()).len(), 3);
        assert!(Payload::Binary(vec![]).is_empty());
        assert_eq!(Payload::Binary(vec![1, 2]).into_bytes(), vec![1, 2]);
    }

    #[test]
    fn stats_partition_items() {
        let report = BatchReport {
            target: Format::Html,
            items: vec![
                ok_item(0),
                err_item(
                    1,
                    FileError::Failed {
                        name: "b.gif".into(),
                        message: "unsupported".into(),
                    },
                ),
                err_item(2, FileError::Skipped { name: "c.txt".into() }),
            ],
        };
        let stats = report.stats();
        assert_eq!(
            stats,
            BatchStats {
                total: 3,
                succeeded: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert_eq!(report.outputs().count(), 1);
        assert_eq!(report.errors().count(), 2);
        assert!(!report.is_complete_success());
        assert!(matches!(
            report.into_result(),
            Err(ConvertError::BatchFailed { failed: 2, total: 3 })
        ));
    }

    #[test]
    fn into_result_all_ok() {
        let report = BatchReport {
            target: Format::Html,
            items: vec![ok_item(0), ok_item(1)],
        };
        assert_eq!(report.into_result().unwrap().len(), 2);
    }
}
