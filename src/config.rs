//! Configuration types for document conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The defaults reproduce the classic
//! browser converter: JPEG quality 0.92, A4 portrait pages, output files named
//! `converted.<ext>`, and batches that keep going after a failed file.

use crate::error::ConvertError;
use crate::progress::ConversionProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a conversion or a batch of conversions.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use docshift::{ConversionConfig, OutputNaming};
///
/// let config = ConversionConfig::builder()
///     .jpeg_quality(80)
///     .naming(OutputNaming::SourceStem)
///     .fail_fast(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// JPEG encoder quality, 1–100. Default: 92.
    pub jpeg_quality: u8,

    /// Geometry of generated PDF pages.
    pub pdf_layout: PdfLayout,

    /// Which pages of a PDF input to extract. Default: all pages.
    pub pages: PageSelection,

    /// How output files are named. Default: `converted.<ext>`.
    pub naming: OutputNaming,

    /// Stop a batch at the first failed file and mark the rest as skipped.
    /// Default: false (each file succeeds or fails on its own).
    pub fail_fast: bool,

    /// Optional per-file progress events.
    pub progress_callback: Option<Arc<dyn ConversionProgressCallback>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 92,
            pdf_layout: PdfLayout::default(),
            pages: PageSelection::default(),
            naming: OutputNaming::default(),
            fail_fast: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("jpeg_quality", &self.jpeg_quality)
            .field("pdf_layout", &self.pdf_layout)
            .field("pages", &self.pages)
            .field("naming", &self.naming)
            .field("fail_fast", &self.fail_fast)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    pub fn pdf_layout(mut self, layout: PdfLayout) -> Self {
        self.config.pdf_layout = layout;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn naming(mut self, naming: OutputNaming) -> Self {
        self.config.naming = naming;
        self
    }

    pub fn fail_fast(mut self, v: bool) -> Self {
        self.config.fail_fast = v;
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ConversionProgressCallback>) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(ConvertError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        c.pdf_layout.validate()?;
        Ok(self.config)
    }
}

// ── PDF layout ───────────────────────────────────────────────────────────

/// Page geometry for generated PDFs, in PostScript points (1/72 inch).
///
/// Text is set in Courier, whose glyphs are all `0.6 × font_size` wide, so
/// the number of characters that fit on a line follows directly from the
/// printable width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfLayout {
    pub page_width: u32,
    pub page_height: u32,
    pub margin: u32,
    pub font_size: u32,
    /// Baseline-to-baseline distance for running text.
    pub line_height: u32,
    /// Horizontal step between table columns.
    pub column_width: u32,
    /// Vertical step between table rows.
    pub row_height: u32,
}

impl Default for PdfLayout {
    /// A4 portrait with roughly 10 mm margins.
    fn default() -> Self {
        Self {
            page_width: 595,
            page_height: 842,
            margin: 28,
            font_size: 10,
            line_height: 14,
            column_width: 113,
            row_height: 28,
        }
    }
}

impl PdfLayout {
    /// Characters per line of running text (at least 1).
    pub fn chars_per_line(&self) -> usize {
        let printable = self.page_width.saturating_sub(2 * self.margin) * 10;
        let glyph = (self.font_size * 6).max(1);
        ((printable / glyph) as usize).max(1)
    }

    /// Text lines per page (at least 1).
    pub fn lines_per_page(&self) -> usize {
        let printable = self.page_height.saturating_sub(2 * self.margin);
        ((printable / self.line_height.max(1)) as usize).max(1)
    }

    /// Characters that fit in one table column, leaving one blank as gutter.
    pub fn chars_per_column(&self) -> usize {
        let glyph = (self.font_size * 6).max(1);
        (((self.column_width * 10) / glyph) as usize)
            .saturating_sub(1)
            .max(1)
    }

    fn validate(&self) -> Result<(), ConvertError> {
        if self.font_size == 0 || self.line_height == 0 {
            return Err(ConvertError::InvalidConfig(
                "PDF font size and line height must be ≥ 1".into(),
            ));
        }
        if self.column_width == 0 || self.row_height == 0 {
            return Err(ConvertError::InvalidConfig(
                "PDF column width and row height must be ≥ 1".into(),
            ));
        }
        if 2 * self.margin + self.font_size >= self.page_width.min(self.page_height) {
            return Err(ConvertError::InvalidConfig(format!(
                "PDF margin {} leaves no printable area on a {}×{} page",
                self.margin, self.page_width, self.page_height
            )));
        }
        Ok(())
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a successful conversion names its output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputNaming {
    /// `converted.<ext>` for every file. (default)
    #[default]
    Converted,
    /// The input's name with its extension replaced, e.g. `report.pdf` → `report.md`.
    SourceStem,
}

/// Specifies which pages of a PDF input to extract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Whether 1-indexed `page` is selected.
    pub fn contains(&self, page: usize) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Single(p) => *p == page,
            PageSelection::Range(start, end) => page >= *start && page <= *end,
            PageSelection::Set(pages) => pages.contains(&page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_browser_converter() {
        let c = ConversionConfig::default();
        assert_eq!(c.jpeg_quality, 92);
        assert_eq!(c.naming, OutputNaming::Converted);
        assert!(!c.fail_fast);
        assert!(c.progress_callback.is_none());
    }

    #[test]
    fn builder_rejects_zero_quality() {
        let err = ConversionConfig::builder().jpeg_quality(0).build().unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_oversized_margin() {
        let layout = PdfLayout {
            margin: 400,
            ..PdfLayout::default()
        };
        assert!(ConversionConfig::builder().pdf_layout(layout).build().is_err());
    }

    #[test]
    fn a4_layout_capacity() {
        let l = PdfLayout::default();
        // (595 - 56) / 6 = 89 Courier glyphs at 10 pt
        assert_eq!(l.chars_per_line(), 89);
        // (842 - 56) / 14 = 56 lines
        assert_eq!(l.lines_per_page(), 56);
        assert_eq!(l.chars_per_column(), 17);
    }

    #[test]
    fn page_selection_contains() {
        assert!(PageSelection::All.contains(7));
        assert!(PageSelection::Single(2).contains(2));
        assert!(!PageSelection::Single(2).contains(3));
        assert!(PageSelection::Range(2, 4).contains(4));
        assert!(!PageSelection::Range(2, 4).contains(5));
        assert!(PageSelection::Set(vec![1, 5]).contains(5));
    }

    #[test]
    fn debug_hides_callback() {
        let cfg = ConversionConfig::builder()
            .progress_callback(Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{cfg:?}");
        assert!(dbg.contains("<dyn ConversionProgressCallback>"));
    }
}
