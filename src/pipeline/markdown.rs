//! Markdown transcoders: Markdown → HTML, and the tree walk behind HTML → Markdown.
//!
//! ## Line breaks
//!
//! A single newline inside a paragraph is rendered as `<br />` rather than
//! folded into a space, and `<br>` is written back as a plain newline. Line
//! structure therefore survives Markdown → HTML → Markdown unchanged, which
//! matters for addresses, poems and the output of text → Markdown.

use crate::pipeline::html::{collapse_ws, is_block, is_hidden};
use once_cell::sync::Lazy;
use pulldown_cmark::{html as cmark_html, Event, Options, Parser};
use regex::Regex;
use scraper::{ElementRef, Node, Selector};

static SEL_ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static RE_ORDERED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)([.)])").unwrap());
static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap());

/// Render CommonMark (plus GFM tables and strikethrough) to an HTML fragment.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    cmark_html::push_html(&mut out, parser);
    out
}

// ── Escaping ─────────────────────────────────────────────────────────────────

/// Backslash-escape the characters of a text run that Markdown would read
/// as markup.
///
/// Characters are escaped only where they could act as syntax, so ordinary
/// text such as `snake_case`, `2*3`, `a < b` or `C:\dir` is written as is:
///
/// * `_` unless it sits between two alphanumerics (intraword `_` never
///   opens or closes emphasis);
/// * `*` unless it is intraword and the only `*` in the run;
/// * `` ` `` when the run holds another backtick that could close a span;
/// * `~` next to another `~` (strikethrough);
/// * `[` and `]` when the run holds both, and then `!` before `[`;
/// * `<` before a letter, `/`, `!` or `?` (raw HTML and autolinks);
/// * `&` starting an entity reference;
/// * `\` before punctuation or at the end of the run.
pub(crate) fn escape_inline(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let count = |target: char| chars.iter().filter(|&&c| c == target).count();
    let stars = count('*');
    let ticks = count('`');
    let brackets = chars.contains(&'[') && chars.contains(&']');
    let is_word = |c: Option<char>| c.is_some_and(char::is_alphanumeric);

    let mut out = String::with_capacity(text.len() + 8);
    let mut offset = 0;
    for (i, &c) in chars.iter().enumerate() {
        let prev = i.checked_sub(1).map(|j| chars[j]);
        let next = chars.get(i + 1).copied();
        let escape = match c {
            '_' => !(is_word(prev) && is_word(next)),
            '*' => stars > 1 || !(is_word(prev) && is_word(next)),
            '`' => ticks > 1,
            '~' => prev == Some('~') || next == Some('~'),
            '[' | ']' => brackets,
            '!' => brackets && next == Some('['),
            '<' => next.is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?')),
            '&' => RE_ENTITY.is_match(&text[offset..]),
            '\\' => next.map_or(true, |n| n.is_ascii_punctuation()),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(c);
        offset += c.len_utf8();
    }
    out
}

/// Escape a line-leading marker that would turn a paragraph line into a
/// heading, quote, list item or ordered list item.
fn escape_line_start(line: &str) -> String {
    if line.starts_with(['#', '>', '-', '+']) {
        return format!("\\{line}");
    }
    if let Some(caps) = RE_ORDERED_MARKER.captures(line) {
        let digits = &caps[1];
        return format!("{digits}\\{}", &line[digits.len()..]);
    }
    line.to_string()
}

/// Escape one line of plain text so Markdown renders it literally.
pub(crate) fn escape_markdown_line(line: &str) -> String {
    escape_line_start(&escape_inline(line))
}

// ── HTML tree → Markdown blocks ──────────────────────────────────────────────

/// Append the Markdown blocks for every child of `el` to `out`.
///
/// Loose inline content between block children is gathered into its own
/// paragraph.
pub(crate) fn render_blocks(el: ElementRef<'_>, out: &mut Vec<String>) {
    let mut inline = String::new();
    for child in el.children() {
        match child.value() {
            Node::Text(t) => inline.push_str(&escape_inline(&collapse_ws(t))),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child_el.value().name();
                if is_hidden(name) {
                    continue;
                }
                if is_block(name) {
                    push_paragraph(&mut inline, out);
                    render_block(child_el, out);
                } else {
                    render_inline(child_el, &mut inline);
                }
            }
            _ => {}
        }
    }
    push_paragraph(&mut inline, out);
}

fn push_paragraph(inline: &mut String, out: &mut Vec<String>) {
    let para = tidy(inline);
    if !para.is_empty() {
        out.push(para);
    }
    inline.clear();
}

/// Trim each line, drop empty ones, and escape line-leading markers.
fn tidy(inline: &str) -> String {
    inline
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(escape_line_start)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_block(el: ElementRef<'_>, out: &mut Vec<String>) {
    let name = el.value().name();
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let text = single_line(&inline_of(el));
            if !text.is_empty() {
                out.push(format!("{} {text}", "#".repeat(level)));
            }
        }
        "p" => {
            let para = tidy(&inline_of(el));
            if !para.is_empty() {
                out.push(para);
            }
        }
        "pre" => out.push(code_block(el)),
        "ul" | "ol" => {
            let lines = render_list(el, name == "ol", "");
            if !lines.is_empty() {
                out.push(lines.join("\n"));
            }
        }
        "blockquote" => {
            let mut inner = Vec::new();
            render_blocks(el, &mut inner);
            if !inner.is_empty() {
                let quoted = inner
                    .join("\n\n")
                    .split('\n')
                    .map(|l| if l.is_empty() { ">".to_string() } else { format!("> {l}") })
                    .collect::<Vec<_>>()
                    .join("\n");
                out.push(quoted);
            }
        }
        "hr" => out.push("---".to_string()),
        "table" => {
            if let Some(table) = render_table(el) {
                out.push(table);
            }
        }
        _ => render_blocks(el, out),
    }
}

fn code_block(el: ElementRef<'_>) -> String {
    let lang = el
        .children()
        .filter_map(ElementRef::wrap)
        .find(|c| c.value().name() == "code")
        .and_then(|code| code.value().attr("class"))
        .and_then(|class| {
            class
                .split_whitespace()
                .find_map(|c| c.strip_prefix("language-"))
        })
        .unwrap_or("");
    let raw = el.text().collect::<String>();
    let body = raw.strip_suffix('\n').unwrap_or(&raw);
    format!("```{lang}\n{body}\n```")
}

fn render_list(el: ElementRef<'_>, ordered: bool, indent: &str) -> Vec<String> {
    let mut n = el
        .value()
        .attr("start")
        .and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(1);
    let mut lines = Vec::new();
    for li in el
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == "li")
    {
        let marker = if ordered { format!("{n}.") } else { "-".to_string() };
        let child_indent = format!("{indent}{}", " ".repeat(marker.len() + 1));
        let mut text = String::new();
        let mut nested = Vec::new();
        for child in li.children() {
            match child.value() {
                Node::Text(t) => text.push_str(&escape_inline(&collapse_ws(t))),
                Node::Element(_) => {
                    let Some(child_el) = ElementRef::wrap(child) else {
                        continue;
                    };
                    match child_el.value().name() {
                        "ul" => nested.extend(render_list(child_el, false, &child_indent)),
                        "ol" => nested.extend(render_list(child_el, true, &child_indent)),
                        name if is_hidden(name) => {}
                        name if is_block(name) => {
                            text.push(' ');
                            text.push_str(&inline_of(child_el));
                            text.push(' ');
                        }
                        _ => render_inline(child_el, &mut text),
                    }
                }
                _ => {}
            }
        }
        lines.push(format!("{indent}{marker} {}", single_line(&text)).trim_end().to_string());
        lines.extend(nested);
        n += 1;
    }
    lines
}

fn render_table(el: ElementRef<'_>) -> Option<String> {
    let rows: Vec<Vec<String>> = el
        .select(&SEL_ROW)
        .map(|row| {
            row.children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .map(|cell| single_line(&inline_of(cell)).replace('|', "\\|"))
                .collect()
        })
        .collect();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return None;
    }
    let line = |cells: &[String]| {
        let mut padded: Vec<&str> = cells.iter().map(String::as_str).collect();
        padded.resize(width, "");
        format!("| {} |", padded.join(" | "))
    };
    let mut lines = vec![line(&rows[0]), format!("|{}", " --- |".repeat(width))];
    lines.extend(rows[1..].iter().map(|r| line(r)));
    Some(lines.join("\n"))
}

// ── Inline rendering ─────────────────────────────────────────────────────────

fn inline_of(el: ElementRef<'_>) -> String {
    let mut buf = String::new();
    for child in el.children() {
        match child.value() {
            Node::Text(t) => buf.push_str(&escape_inline(&collapse_ws(t))),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    render_inline(child_el, &mut buf);
                }
            }
            _ => {}
        }
    }
    buf
}

fn single_line(inline: &str) -> String {
    inline
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_inline(el: ElementRef<'_>, buf: &mut String) {
    let name = el.value().name();
    match name {
        _ if is_hidden(name) => {}
        "br" => buf.push('\n'),
        "strong" | "b" => wrap(buf, "**", &inline_of(el)),
        "em" | "i" => wrap(buf, "*", &inline_of(el)),
        "del" | "s" | "strike" => wrap(buf, "~~", &inline_of(el)),
        "code" => {
            let raw = el.text().collect::<String>();
            let fence = if raw.contains('`') { "``" } else { "`" };
            buf.push_str(&format!("{fence}{raw}{fence}"));
        }
        "a" => {
            let label = single_line(&inline_of(el));
            match el.value().attr("href") {
                Some(href) => buf.push_str(&format!("[{label}]({href})")),
                None => buf.push_str(&label),
            }
        }
        "img" => {
            let alt = el.value().attr("alt").unwrap_or("");
            let src = el.value().attr("src").unwrap_or("");
            buf.push_str(&format!("![{}]({src})", escape_inline(alt)));
        }
        _ => buf.push_str(&inline_of(el)),
    }
}

/// Surround `inner` with `marker`, keeping outer whitespace outside the
/// markers so `<b> x </b>` does not become the invalid `** x **`.
fn wrap(buf: &mut String, marker: &str, inner: &str) {
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        buf.push_str(inner);
        return;
    }
    let lead = &inner[..inner.len() - inner.trim_start().len()];
    let trail = &inner[inner.trim_end().len()..];
    buf.push_str(lead);
    buf.push_str(marker);
    buf.push_str(trimmed);
    buf.push_str(marker);
    buf.push_str(trail);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::html;

    #[test]
    fn md_to_html_basic() {
        let out = to_html("# Title\n\nSome **bold** text");
        assert!(out.contains("<h1>Title</h1>"), "got: {out}");
        assert!(out.contains("<strong>bold</strong>"), "got: {out}");
    }

    #[test]
    fn md_to_html_soft_break_is_kept() {
        let out = to_html("one\ntwo");
        assert!(out.contains("one<br />"), "got: {out}");
    }

    #[test]
    fn md_to_html_gfm_table() {
        let out = to_html("| a | b |\n| --- | --- |\n| 1 | 2 |\n");
        assert!(out.contains("<th>a</th>"), "got: {out}");
        assert!(out.contains("<td>2</td>"), "got: {out}");
    }

    #[test]
    fn markdown_round_trip_is_exact() {
        let md = "# Title\n\n## Section\n\nSome **bold** and *italic* text\nsecond line\n\n\
                  - one\n- two\n\n1. first\n2. second\n\n> quoted\n\n\
                  ```rust\nlet x = 1;\n```\n\n[link](https://example.com) and `code`\n";
        assert_eq!(html::to_markdown(&to_html(md)), md);
    }

    #[test]
    fn table_round_trip() {
        let md = "| name | age |\n| --- | --- |\n| Ada | 36 |\n";
        assert_eq!(html::to_markdown(&to_html(md)), md);
    }

    #[test]
    fn nested_list_indentation() {
        let html = "<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>";
        assert_eq!(html::to_markdown(html), "- a\n  - b\n- c\n");
    }

    #[test]
    fn escapes_literal_markers() {
        assert_eq!(
            html::to_markdown("<p># not a heading with *stars*</p>"),
            "\\# not a heading with \\*stars\\*\n"
        );
        assert_eq!(escape_markdown_line("1. first"), "1\\. first");
    }

    #[test]
    fn intraword_markers_round_trip() {
        let md = "Use snake_case names\n\nCompute 2*3 now\n";
        assert_eq!(html::to_markdown(&to_html(md)), md);
    }

    #[test]
    fn escapes_only_where_markup_could_start() {
        assert_eq!(escape_inline("snake_case and _x_"), "snake_case and \\_x\\_");
        assert_eq!(escape_inline("2*3*4"), "2\\*3\\*4");
        assert_eq!(escape_inline("a < b & c, it`s"), "a < b & c, it`s");
        assert_eq!(escape_inline("<b> &amp; [x](y)"), "\\<b> \\&amp; \\[x\\](y)");
        assert_eq!(escape_inline(r"C:\dir\*"), r"C:\dir\\\*");
        assert_eq!(escape_inline("~~gone~~ `a` ~"), "\\~\\~gone\\~\\~ \\`a\\` ~");
    }

    #[test]
    fn wrap_keeps_whitespace_outside() {
        assert_eq!(html::to_markdown("<p>a<b> x </b>b</p>"), "a **x** b\n");
    }

    #[test]
    fn empty_html_yields_empty_markdown() {
        assert_eq!(html::to_markdown(""), "");
    }
}
