//! HTML transcoders: HTML → text, CSV and Markdown.
//!
//! All three parse the input with `scraper` (html5ever), so malformed markup
//! is repaired the way a browser would repair it instead of being rejected.
//! Content of `<head>`, `<script>`, `<style>` and `<template>` never reaches
//! the output.

use crate::error::ConvertError;
use crate::format::Format;
use crate::pipeline::postprocess::normalise_line_endings;
use crate::pipeline::text;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SEL_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());

const HIDDEN: &[&str] = &["head", "script", "style", "template", "noscript", "title"];

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "div", "dl",
    "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "section", "summary", "table", "tbody",
    "tfoot", "thead", "tr", "ul",
];

pub(crate) fn is_hidden(name: &str) -> bool {
    HIDDEN.contains(&name)
}

pub(crate) fn is_block(name: &str) -> bool {
    BLOCKS.contains(&name) || name == "pre"
}

pub(crate) fn collapse_ws(s: &str) -> String {
    RE_WS.replace_all(s, " ").into_owned()
}

/// Escape the five characters with meaning in HTML text and attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── HTML → text ──────────────────────────────────────────────────────────────

/// Visible text with one line per block element.
///
/// Every block (`<p>`, `<div>`, `<li>`, headings, table rows…) starts a new
/// line; an empty block still produces an empty line so that text → HTML →
/// text is lossless. `<br>` breaks the line, table cells are separated by a
/// tab, and whitespace inside a line collapses to single spaces.
pub fn to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut collector = LineCollector::default();
    collector.walk(doc.root_element());
    collector.finish().join("\n")
}

#[derive(Default)]
struct LineCollector {
    lines: Vec<String>,
    current: String,
    /// Cells already opened in the current table row.
    row_cells: usize,
}

impl LineCollector {
    fn flush(&mut self) {
        let line = self.current.trim_end().to_string();
        self.current.clear();
        self.lines.push(line);
    }

    fn push_text(&mut self, raw: &str) {
        let collapsed = collapse_ws(raw);
        if self.current.is_empty() || self.current.ends_with([' ', '\t']) {
            self.current.push_str(collapsed.trim_start());
        } else {
            self.current.push_str(&collapsed);
        }
    }

    fn walk(&mut self, el: ElementRef<'_>) {
        for child in el.children() {
            match child.value() {
                Node::Text(t) => self.push_text(t),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.element(child_el);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, el: ElementRef<'_>) {
        let name = el.value().name();
        if is_hidden(name) {
            return;
        }
        match name {
            "br" => self.flush(),
            "td" | "th" => {
                if self.row_cells > 0 {
                    let trimmed = self.current.trim_end_matches(' ').len();
                    self.current.truncate(trimmed);
                    self.current.push('\t');
                }
                self.row_cells += 1;
                self.walk(el);
            }
            "pre" => {
                if !self.current.trim().is_empty() {
                    self.flush();
                }
                self.current.clear();
                let raw = normalise_line_endings(&el.text().collect::<String>());
                let body = raw.strip_suffix('\n').unwrap_or(&raw);
                for line in body.split('\n') {
                    self.lines.push(line.trim_end().to_string());
                }
            }
            _ if is_block(name) => {
                if !self.current.trim().is_empty() {
                    self.flush();
                }
                self.current.clear();
                if name == "tr" {
                    self.row_cells = 0;
                }
                let before = self.lines.len();
                self.walk(el);
                if !self.current.trim().is_empty() {
                    self.flush();
                } else {
                    self.current.clear();
                    if self.lines.len() == before {
                        self.lines.push(String::new());
                    }
                }
            }
            _ => self.walk(el),
        }
    }

    fn finish(mut self) -> Vec<String> {
        if !self.current.trim().is_empty() {
            self.flush();
        }
        // A document with no body content yields nothing rather than one
        // empty line.
        if self.lines.iter().all(|l| l.is_empty()) && self.lines.len() <= 1 {
            return Vec::new();
        }
        self.lines
    }
}

// ── HTML → CSV ───────────────────────────────────────────────────────────────

/// Table rows as CSV records; documents without a table fall back to
/// text → CSV over the visible text.
pub fn to_csv(html: &str) -> Result<String, ConvertError> {
    let doc = Html::parse_document(html);
    let rows: Vec<Vec<String>> = doc
        .select(&SEL_ROW)
        .map(|row| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .map(cell_text)
                .collect()
        })
        .collect();
    if rows.is_empty() {
        return text::to_csv(&to_text(html));
    }
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in &rows {
        writer
            .write_record(row)
            .map_err(|e| ConvertError::encode(Format::Csv, e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ConvertError::encode(Format::Csv, e))?;
    String::from_utf8(bytes).map_err(|e| ConvertError::encode(Format::Csv, e))
}

pub(crate) fn cell_text(cell: ElementRef<'_>) -> String {
    collapse_ws(&cell.text().collect::<String>()).trim().to_string()
}

// ── HTML → Markdown ──────────────────────────────────────────────────────────

/// CommonMark rendering of the document tree.
///
/// Headings, paragraphs, emphasis, inline code, links, images, lists, block
/// quotes, code blocks, rules and tables are mapped to their Markdown forms.
/// Blocks are separated by one blank line and the output ends with a newline.
pub fn to_markdown(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut blocks = Vec::new();
    crate::pipeline::markdown::render_blocks(doc.root_element(), &mut blocks);
    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}
