//! Post-processing: deterministic cleanup of text pulled out of binary documents.
//!
//! PDF and Word extraction hand back text shaped by the producer of the file
//! rather than by its author: CRLF line endings, zero-width joiners left over
//! from layout engines, runs of spaces used for justification, and long
//! stretches of empty paragraphs. These rules strip that noise without
//! touching the words themselves.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so every later rule can split on `\n`;
//! trailing whitespace is trimmed before blank-line collapsing so lines that
//! only held spaces count as blank.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to extracted document text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF, CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Drop leading and trailing blank lines
pub fn clean_extracted_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    trim_outer_blank_lines(&s)
}

/// Collapse runs of spaces to a single space and trim both ends.
///
/// Used when joining the text items of one PDF page into a line.
pub fn collapse_spaces(input: &str) -> String {
    RE_SPACES.replace_all(input.trim(), " ").into_owned()
}

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]{2,}").unwrap());

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

pub(crate) fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .split('\n')
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

// ── Rule 5: Drop leading and trailing blank lines ────────────────────────────

fn trim_outer_blank_lines(input: &str) -> String {
    input.trim_matches('\n').to_string()
}

// ── Tests ────────────────────────────────────────────────────────────────────
