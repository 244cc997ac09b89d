//! Pipeline stages for document conversion.
//!
//! Every document conversion is a [`Pipeline`]: one input adapter, zero or
//! more pure transcoding steps, and one output adapter. The routing table in
//! [`crate::registry`] picks the stages; this module runs them.
//!
//! ## Data Flow
//!
//! ```text
//! bytes ──▶ Read ──▶ Step* ──▶ Write ──▶ Payload
//!        (decode)  (transcode) (encode)
//! ```
//!
//! Between stages data travels as an [`Intermediate`]: either a string or a
//! [`table::Table`]. Raster images bypass this entirely and go through
//! [`raster`].
//!
//! 1. [`text`], [`html`], [`markdown`], [`table`]: pure transcoders
//! 2. [`pdf`], [`word`], [`sheet`]: binary format adapters
//! 3. [`raster`]: image decode/re-encode
//! 4. [`postprocess`]: cleanup rules for text pulled out of binary formats

pub mod html;
pub mod markdown;
pub mod pdf;
pub mod postprocess;
pub mod raster;
pub mod sheet;
pub mod table;
pub mod text;
pub mod word;

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::format::Format;
use crate::output::Payload;
use crate::source::SourceFile;
use table::Table;
use tracing::debug;

/// How the input bytes become the first [`Intermediate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Read {
    /// Decode the bytes as UTF-8 text.
    Utf8,
    /// Decode as UTF-8, then parse as CSV.
    Csv,
    /// Extract page text from a PDF.
    PdfText,
    /// Extract raw text from a Word document.
    WordText,
    /// Read the first worksheet of a workbook.
    Workbook,
}

/// A pure transformation between intermediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    TextToHtml,
    TextToCsv,
    TextToMarkdown,
    HtmlToText,
    HtmlToCsv,
    HtmlToMarkdown,
    MarkdownToHtml,
    TableToCsv,
    /// JSON record dump of the data rows.
    TableToText,
    TableToHtml,
    TableToMarkdown,
}

/// How the last [`Intermediate`] becomes output bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
    /// The text itself, UTF-8 encoded.
    Text,
    /// A laid-out PDF (running text, or a grid for tables).
    Pdf,
    /// A DOCX package holding the text as one paragraph.
    Docx,
}

/// A complete document conversion plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    pub read: Read,
    pub steps: &'static [Step],
    pub write: Write,
}

/// Data passed between pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intermediate {
    Text(String),
    Table(Table),
}

impl Intermediate {
    fn shape(&self) -> &'static str {
        match self {
            Intermediate::Text(_) => "text",
            Intermediate::Table(_) => "table",
        }
    }
}

impl Pipeline {
    /// Run every stage against `source`, producing the output payload for
    /// `target`.
    pub fn execute(
        &self,
        source: &SourceFile,
        target: Format,
        config: &ConversionConfig,
    ) -> Result<Payload, ConvertError> {
        let mut data = self.read.apply(source, config)?;
        for step in self.steps {
            debug!("{}: {:?} ({} in)", source.name(), step, data.shape());
            data = step.apply(data)?;
        }
        self.write.apply(data, target, config)
    }
}

impl Read {
    pub fn apply(
        self,
        source: &SourceFile,
        config: &ConversionConfig,
    ) -> Result<Intermediate, ConvertError> {
        let declared = source.format().unwrap_or(Format::Txt);
        match self {
            Read::Utf8 => Ok(Intermediate::Text(source.text()?.to_string())),
            Read::Csv => Ok(Intermediate::Table(table::parse_csv(source.text()?)?)),
            Read::PdfText => Ok(Intermediate::Text(pdf::extract_text(
                source.bytes(),
                &config.pages,
            )?)),
            Read::WordText => Ok(Intermediate::Text(word::extract_text(
                source.bytes(),
                declared,
            )?)),
            Read::Workbook => Ok(Intermediate::Table(sheet::read_first_sheet(
                source.bytes(),
                declared,
            )?)),
        }
    }
}

impl Step {
    pub fn apply(self, input: Intermediate) -> Result<Intermediate, ConvertError> {
        use Intermediate::{Table as T, Text};
        Ok(match (self, input) {
            (Step::TextToHtml, Text(s)) => Text(text::to_html(&s)),
            (Step::TextToCsv, Text(s)) => Text(text::to_csv(&s)?),
            (Step::TextToMarkdown, Text(s)) => Text(text::to_markdown(&s)),
            (Step::HtmlToText, Text(s)) => Text(html::to_text(&s)),
            (Step::HtmlToCsv, Text(s)) => Text(html::to_csv(&s)?),
            (Step::HtmlToMarkdown, Text(s)) => Text(html::to_markdown(&s)),
            (Step::MarkdownToHtml, Text(s)) => Text(markdown::to_html(&s)),
            (Step::TableToCsv, T(t)) => Text(table::to_csv(&t)?),
            (Step::TableToText, T(t)) => Text(table::to_json_text(&t)?),
            (Step::TableToHtml, T(t)) => Text(table::to_html(&t)),
            (Step::TableToMarkdown, T(t)) => Text(table::to_markdown(&t)),
            (step, other) => {
                return Err(ConvertError::Internal(format!(
                    "{step:?} cannot consume {} input",
                    other.shape()
                )))
            }
        })
    }
}

impl Write {
    pub fn apply(
        self,
        input: Intermediate,
        target: Format,
        config: &ConversionConfig,
    ) -> Result<Payload, ConvertError> {
        match (self, input) {
            (Write::Text, Intermediate::Text(s)) => Ok(Payload::Text(s)),
            (Write::Pdf, Intermediate::Text(s)) => {
                Ok(Payload::Binary(pdf::render_text(&s, &config.pdf_layout)?))
            }
            (Write::Pdf, Intermediate::Table(t)) => {
                Ok(Payload::Binary(pdf::render_table(&t, &config.pdf_layout)?))
            }
            (Write::Docx, Intermediate::Text(s)) => Ok(Payload::Binary(word::write_docx(&s)?)),
            (write, other) => Err(ConvertError::Internal(format!(
                "{write:?} writer for {target} cannot consume {} input",
                other.shape()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_rejects_wrong_shape() {
        let err = Step::TableToCsv
            .apply(Intermediate::Text("a".into()))
            .unwrap_err();
        assert!(matches!(err, ConvertError::Internal(_)));
    }

    #[test]
    fn text_writer_rejects_table() {
        let err = Write::Text
            .apply(
                Intermediate::Table(Table::default()),
                Format::Txt,
                &ConversionConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(err, ConvertError::Internal(_)));
    }

    #[test]
    fn csv_to_html_pipeline() {
        let p = Pipeline {
            read: Read::Csv,
            steps: &[Step::TableToHtml],
            write: Write::Text,
        };
        let src = SourceFile::new("t.csv", "a,b\n1,2");
        let out = p
            .execute(&src, Format::Html, &ConversionConfig::default())
            .unwrap();
        assert!(out.as_text().unwrap().contains("<td>1</td><td>2</td>"));
    }
}
