//! PDF adapter: text extraction and text/table layout, both on `lopdf`.
//!
//! ## Extraction
//!
//! Each selected page's text items are joined with single spaces into one
//! line, and pages are joined with `\n`. Text that is not stored as text
//! (scanned pages) comes back empty; there is no OCR.
//!
//! ## Layout
//!
//! Output uses the standard Courier font with WinAnsi encoding, so no font
//! program is embedded and every glyph is `0.6 × font_size` wide. Characters
//! outside Latin-1 cannot be encoded and are written as `?`.

use crate::config::{PageSelection, PdfLayout};
use crate::error::ConvertError;
use crate::format::Format;
use crate::pipeline::postprocess::collapse_spaces;
use crate::pipeline::table::Table;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

// ── Extraction ───────────────────────────────────────────────────────────────

/// Extract the text of the selected pages, one line per page.
pub fn extract_text(bytes: &[u8], pages: &PageSelection) -> Result<String, ConvertError> {
    let doc = Document::load_mem(bytes).map_err(|e| ConvertError::decode(Format::Pdf, e))?;
    let page_map = doc.get_pages();
    debug!("PDF has {} pages", page_map.len());

    let mut out = Vec::with_capacity(page_map.len());
    for &num in page_map.keys() {
        if !pages.contains(num as usize) {
            continue;
        }
        match doc.extract_text(&[num]) {
            Ok(text) => out.push(join_items(&text)),
            Err(e) => {
                warn!("Page {}: text extraction failed: {}", num, e);
                out.push(String::new());
            }
        }
    }
    Ok(out.join("\n"))
}

fn join_items(page_text: &str) -> String {
    let items: Vec<&str> = page_text
        .split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    collapse_spaces(&items.join(" "))
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Lay text out top-to-bottom, word-wrapped to the printable width, starting
/// a new page whenever the current one is full.
pub fn render_text(text: &str, layout: &PdfLayout) -> Result<Vec<u8>, ConvertError> {
    let width = layout.chars_per_line();
    let lines: Vec<String> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .flat_map(|l| wrap_line(&l.replace('\t', "    "), width))
        .collect();

    let per_page = layout.lines_per_page();
    let mut pages = Vec::new();
    for chunk in lines.chunks(per_page) {
        let mut ops = Vec::new();
        for (i, line) in chunk.iter().enumerate() {
            let y = top_baseline(layout) - (i as i64) * layout.line_height as i64;
            show_text(&mut ops, layout, layout.margin as i64, y, line);
        }
        pages.push(ops);
    }
    assemble(pages, layout)
}

/// Lay a table out as a grid: the header row first, one row per step of
/// `row_height`, one column per step of `column_width`. Cells are clipped to
/// their column and columns past the right margin are dropped.
pub fn render_table(table: &Table, layout: &PdfLayout) -> Result<Vec<u8>, ConvertError> {
    let col_chars = layout.chars_per_column();
    let max_x = (layout.page_width - layout.margin) as i64;
    let mut pages = Vec::new();
    let mut ops = Vec::new();
    let mut y = top_baseline(layout);

    let records = std::iter::once(&table.headers)
        .filter(|h| !h.is_empty())
        .chain(table.rows.iter());
    for row in records {
        if y < layout.margin as i64 {
            pages.push(std::mem::take(&mut ops));
            y = top_baseline(layout);
        }
        for (c, cell) in row.iter().enumerate() {
            let x = layout.margin as i64 + (c as i64) * layout.column_width as i64;
            if x >= max_x {
                break;
            }
            let clipped: String = cell.replace('\n', " ").chars().take(col_chars).collect();
            show_text(&mut ops, layout, x, y, &clipped);
        }
        y -= layout.row_height as i64;
    }
    pages.push(ops);
    assemble(pages, layout)
}

fn top_baseline(layout: &PdfLayout) -> i64 {
    (layout.page_height - layout.margin - layout.font_size) as i64
}

/// Greedy word wrap; words longer than the line are split hard.
fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let line = line.trim_end();
    if line.chars().count() <= width {
        return vec![line.to_string()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split(' ') {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            out.push(word.drain(..width).collect());
        }
        let word: String = word.into_iter().collect();
        let needed =
            current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > width && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    out.push(current);
    out
}

/// One self-contained text object per string, so extraction sees each line
/// as its own item.
fn show_text(ops: &mut Vec<Operation>, layout: &PdfLayout, x: i64, y: i64, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(b"F1".to_vec()), Object::Integer(layout.font_size as i64)],
    ));
    ops.push(Operation::new(
        "Td",
        vec![Object::Integer(x), Object::Integer(y)],
    ));
    ops.push(Operation::new(
        "Tj",
        vec![Object::string_literal(win_ansi(text))],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Build the document tree: catalog → pages → page (+ content stream), with
/// one shared Courier font resource.
fn assemble(pages: Vec<Vec<Operation>>, layout: &PdfLayout) -> Result<Vec<u8>, ConvertError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });
    let media_box = vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(layout.page_width as i64),
        Object::Integer(layout.page_height as i64),
    ];

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len().max(1));
    let page_ops = if pages.is_empty() { vec![Vec::new()] } else { pages };
    for operations in page_ops {
        let content = Content { operations };
        let encoded = content
            .encode()
            .map_err(|e| ConvertError::encode(Format::Pdf, e))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| ConvertError::encode(Format::Pdf, e))?;
    debug!("Wrote PDF: {} pages, {} bytes", count, buf.len());
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_short_line_untouched() {
        assert_eq!(wrap_line("hello world", 20), vec!["hello world"]);
    }

    #[test]
    fn wrap_breaks_on_words() {
        assert_eq!(
            wrap_line("aaa bbb ccc ddd", 7),
            vec!["aaa bbb", "ccc ddd"]
        );
    }

    #[test]
    fn wrap_splits_long_words() {
        assert_eq!(wrap_line("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn win_ansi_replaces_unencodable() {
        assert_eq!(win_ansi("é€a"), vec![0xE9, b'?', b'a']);
    }

    #[test]
    fn rendered_text_is_a_pdf() {
        let bytes = render_text("hello", &PdfLayout::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
    }

    #[test]
    fn text_round_trips_through_extraction() {
        let bytes = render_text("first line\nsecond line", &PdfLayout::default()).unwrap();
        let text = extract_text(&bytes, &PageSelection::All).unwrap();
        assert!(text.contains("first line"), "got: {text:?}");
        assert!(text.contains("second line"), "got: {text:?}");
    }

    #[test]
    fn long_text_spans_pages() {
        let body = (0..200).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let bytes = render_text(&body, &PdfLayout::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        // 56 lines per A4 page → 4 pages for 200 lines
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[test]
    fn page_selection_limits_extraction() {
        let body = (0..100).map(|i| format!("row{i}")).collect::<Vec<_>>().join("\n");
        let bytes = render_text(&body, &PdfLayout::default()).unwrap();
        let text = extract_text(&bytes, &PageSelection::Single(2)).unwrap();
        assert!(text.contains("row56"), "got: {text:?}");
        assert!(!text.contains("row0 "), "got: {text:?}");
    }

    #[test]
    fn table_layout_paginates() {
        let rows = (0..60).map(|i| vec![i.to_string(), "x".into()]).collect();
        let table = Table {
            headers: vec!["n".into(), "v".into()],
            rows,
            ..Table::default()
        };
        let bytes = render_table(&table, &PdfLayout::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 2);
    }

    #[test]
    fn empty_text_gives_one_blank_page() {
        let bytes = render_text("", &PdfLayout::default()).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = extract_text(b"not a pdf", &PageSelection::All).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { format: Format::Pdf, .. }));
    }
}
