//! The conversion registry: which (input, output) pairs exist, and how each
//! one is carried out.
//!
//! [`route`] is the single source of truth. [`is_supported`] and
//! [`targets_for`] are derived from it, so the advertised pairs and the
//! implemented pairs cannot disagree.

use crate::format::Format;
use crate::pipeline::{Pipeline, Read, Step, Write};

/// How a supported conversion is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Decode → transcode → encode through the document pipeline.
    Document(Pipeline),
    /// Decode and re-encode a raster image.
    Raster,
}

const fn doc(read: Read, steps: &'static [Step], write: Write) -> Option<Route> {
    Some(Route::Document(Pipeline { read, steps, write }))
}

/// Look up the route for a pair, or `None` if the pair is unsupported.
pub fn route(source: Format, target: Format) -> Option<Route> {
    use Format::*;
    match (source, target) {
        // ── Plain text ──────────────────────────────────────────────────────
        (Txt, Html) => doc(Read::Utf8, &[Step::TextToHtml], Write::Text),
        (Txt, Csv) => doc(Read::Utf8, &[Step::TextToCsv], Write::Text),
        (Txt, Md) => doc(Read::Utf8, &[Step::TextToMarkdown], Write::Text),
        (Txt, Pdf) => doc(Read::Utf8, &[], Write::Pdf),
        (Txt, Doc | Docx) => doc(Read::Utf8, &[], Write::Docx),

        // ── HTML ────────────────────────────────────────────────────────────
        (Html, Txt) => doc(Read::Utf8, &[Step::HtmlToText], Write::Text),
        (Html, Csv) => doc(Read::Utf8, &[Step::HtmlToCsv], Write::Text),
        (Html, Md) => doc(Read::Utf8, &[Step::HtmlToMarkdown], Write::Text),
        (Html, Pdf) => doc(Read::Utf8, &[Step::HtmlToText], Write::Pdf),
        (Html, Doc | Docx) => doc(Read::Utf8, &[Step::HtmlToText], Write::Docx),

        // ── CSV ─────────────────────────────────────────────────────────────
        (Csv, Txt) => doc(Read::Csv, &[Step::TableToText], Write::Text),
        (Csv, Html) => doc(Read::Csv, &[Step::TableToHtml], Write::Text),
        (Csv, Md) => doc(Read::Csv, &[Step::TableToMarkdown], Write::Text),
        (Csv, Pdf) => doc(Read::Csv, &[], Write::Pdf),
        (Csv, Doc | Docx) => doc(Read::Csv, &[Step::TableToText], Write::Docx),

        // ── Markdown ────────────────────────────────────────────────────────
        (Md, Txt) => doc(
            Read::Utf8,
            &[Step::MarkdownToHtml, Step::HtmlToText],
            Write::Text,
        ),
        (Md, Html) => doc(Read::Utf8, &[Step::MarkdownToHtml], Write::Text),
        (Md, Csv) => doc(
            Read::Utf8,
            &[Step::MarkdownToHtml, Step::HtmlToCsv],
            Write::Text,
        ),
        (Md, Pdf) => doc(
            Read::Utf8,
            &[Step::MarkdownToHtml, Step::HtmlToText],
            Write::Pdf,
        ),
        (Md, Doc | Docx) => doc(
            Read::Utf8,
            &[Step::MarkdownToHtml, Step::HtmlToText],
            Write::Docx,
        ),

        // ── PDF ─────────────────────────────────────────────────────────────
        (Pdf, Txt) => doc(Read::PdfText, &[], Write::Text),
        (Pdf, Html) => doc(Read::PdfText, &[Step::TextToHtml], Write::Text),
        (Pdf, Csv) => doc(Read::PdfText, &[Step::TextToCsv], Write::Text),
        (Pdf, Md) => doc(Read::PdfText, &[Step::TextToMarkdown], Write::Text),
        (Pdf, Doc | Docx) => doc(Read::PdfText, &[], Write::Docx),

        // ── Word ────────────────────────────────────────────────────────────
        (Doc | Docx, Txt) => doc(Read::WordText, &[], Write::Text),
        (Doc | Docx, Html) => doc(Read::WordText, &[Step::TextToHtml], Write::Text),
        (Doc | Docx, Csv) => doc(Read::WordText, &[Step::TextToCsv], Write::Text),
        (Doc | Docx, Md) => doc(Read::WordText, &[Step::TextToMarkdown], Write::Text),
        (Doc | Docx, Pdf) => doc(Read::WordText, &[], Write::Pdf),

        // ── Spreadsheets ────────────────────────────────────────────────────
        (Xls | Xlsx, Txt) => doc(Read::Workbook, &[Step::TableToText], Write::Text),
        (Xls | Xlsx, Html) => doc(Read::Workbook, &[Step::TableToHtml], Write::Text),
        (Xls | Xlsx, Csv) => doc(Read::Workbook, &[Step::TableToCsv], Write::Text),
        (Xls | Xlsx, Pdf) => doc(Read::Workbook, &[Step::TableToText], Write::Pdf),

        // ── Images ──────────────────────────────────────────────────────────
        _ if source.is_image() && target.is_image() && source != target => Some(Route::Raster),

        _ => None,
    }
}

/// Whether `source` → `target` is a supported conversion.
pub fn is_supported(source: Format, target: Format) -> bool {
    route(source, target).is_some()
}

/// [`is_supported`] over raw extensions. Unknown extensions are unsupported.
pub fn is_supported_ext(source: &str, target: &str) -> bool {
    match (Format::from_extension(source), Format::from_extension(target)) {
        (Some(s), Some(t)) => is_supported(s, t),
        _ => false,
    }
}

/// Every format `source` converts to, in registry order.
pub fn targets_for(source: Format) -> Vec<Format> {
    Format::ALL
        .into_iter()
        .filter(|&t| is_supported(source, t))
        .collect()
}

/// Every supported (input, output) pair.
pub fn supported_pairs() -> Vec<(Format, Format)> {
    Format::ALL
        .into_iter()
        .flat_map(|s| targets_for(s).into_iter().map(move |t| (s, t)))
        .collect()
}
