//! Source documents: raw bytes plus the name that declares their format.

use crate::error::ConvertError;
use crate::format::{extension_of, Format};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// An input file, immutable once read.
///
/// The bytes are shared behind an `Arc`, so cloning a `SourceFile` to move it
/// into a blocking task is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Read a file from disk; the file name (not the full path) becomes the
    /// source name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let bytes = tokio::fs::read(path).await.map_err(|e| ConvertError::Read {
            name: path.display().to_string(),
            detail: e.to_string(),
        })?;
        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lower-cased trailing extension of the name, or `""`.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }

    /// The declared format, if the extension is a known one.
    pub fn format(&self) -> Option<Format> {
        Format::from_file_name(&self.name)
    }

    /// The content as UTF-8 text, without a leading byte-order mark.
    pub fn text(&self) -> Result<&str, ConvertError> {
        let text = std::str::from_utf8(&self.bytes).map_err(|e| ConvertError::Read {
            name: self.name.clone(),
            detail: format!("not valid UTF-8 text: {e}"),
        })?;
        Ok(text.strip_prefix('\u{FEFF}').unwrap_or(text))
    }

    /// The stem used when outputs are named after their source.
    pub fn stem(&self) -> &str {
        let base = self.name.rsplit(['/', '\\']).next().unwrap_or(&self.name);
        match base.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => base,
        }
    }
}
