//! Plain-text transcoders: text → HTML, CSV and Markdown.
//!
//! Lines are split on `\n` only, with a trailing `\r` dropped from each line,
//! so a CRLF file and an LF file produce identical output.

use crate::error::ConvertError;
use crate::format::Format;
use crate::pipeline::html::escape_html;
use crate::pipeline::markdown::escape_markdown_line;

fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l))
}

/// One `<p>` per line, escaped. An empty input yields an empty string; empty
/// lines become empty paragraphs so they survive a trip back to text.
pub fn to_html(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    lines(text)
        .map(|line| format!("<p>{}</p>", escape_html(line)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// One CSV record per non-blank line, fields split on runs of whitespace.
///
/// Fields containing commas or quotes are quoted by the CSV writer, so the
/// output always re-parses to the same words.
pub fn to_csv(text: &str) -> Result<String, ConvertError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for line in lines(text) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        writer
            .write_record(&fields)
            .map_err(|e| ConvertError::encode(Format::Csv, e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ConvertError::encode(Format::Csv, e))?;
    String::from_utf8(bytes).map_err(|e| ConvertError::encode(Format::Csv, e))
}

/// First non-blank line becomes a level-1 heading, every other non-blank
/// line its own paragraph.
pub fn to_markdown(text: &str) -> String {
    let mut blocks = Vec::new();
    for line in lines(text) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let escaped = escape_markdown_line(line);
        if blocks.is_empty() {
            blocks.push(format!("# {escaped}"));
        } else {
            blocks.push(escaped);
        }
    }
    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::markdown;

    #[test]
    fn html_one_paragraph_per_line() {
        assert_eq!(to_html("a\n\nb"), "<p>a</p>\n<p></p>\n<p>b</p>");
    }

    #[test]
    fn html_escapes_markup() {
        assert_eq!(
            to_html("<b>&\"</b>"),
            "<p>&lt;b&gt;&amp;&quot;&lt;/b&gt;</p>"
        );
    }

    #[test]
    fn html_crlf_equals_lf() {
        assert_eq!(to_html("x\r\ny"), to_html("x\ny"));
    }

    #[test]
    fn html_empty() {
        assert_eq!(to_html(""), "");
    }

    #[test]
    fn csv_splits_words() {
        assert_eq!(
            to_csv("alpha beta\n\ngamma   delta epsilon\n").unwrap(),
            "alpha,beta\ngamma,delta,epsilon\n"
        );
    }

    #[test]
    fn csv_quotes_embedded_commas() {
        assert_eq!(to_csv("a,b c").unwrap(), "\"a,b\",c\n");
    }

    #[test]
    fn markdown_heading_then_paragraphs() {
        assert_eq!(
            to_markdown("Title\nfirst\n\nsecond\n"),
            "# Title\n\nfirst\n\nsecond\n"
        );
    }

    #[test]
    fn markdown_escapes_emphasis() {
        assert_eq!(to_markdown("a *b*"), "# a \\*b\\*\n");
    }

    #[test]
    fn markdown_keeps_links_and_tags_literal() {
        let md = to_markdown("Notes\nsee [docs](http://x) and <b>raw</b> &amp; more");
        assert_eq!(
            md,
            "# Notes\n\nsee \\[docs\\](http://x) and \\<b>raw\\</b> \\&amp; more\n"
        );
        let html = markdown::to_html(&md);
        assert!(
            html.contains("<p>see [docs](http://x) and &lt;b&gt;raw&lt;/b&gt; &amp;amp; more</p>"),
            "got: {html}"
        );
    }

    #[test]
    fn markdown_blank_input() {
        assert_eq!(to_markdown(" \n \n"), "");
    }
}
