//! Tabular intermediate: parsing CSV and rendering a [`Table`] as CSV, HTML,
//! Markdown or a JSON record dump.

use crate::error::ConvertError;
use crate::format::Format;
use crate::pipeline::html::escape_html;
use serde_json::{Map, Value};

/// A header row plus data rows. Rows may be ragged.
///
/// `rows` holds the display text of every cell. Sources that know cell types
/// (spreadsheets) also fill `values` in parallel with `rows`; the JSON record
/// dump prefers those and falls back to the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub values: Vec<Vec<Value>>,
}

impl Table {
    /// Split a grid of records into header row and data rows.
    pub fn from_records(mut records: Vec<Vec<String>>) -> Self {
        if records.is_empty() {
            return Self::default();
        }
        let headers = records.remove(0);
        Self {
            headers,
            rows: records,
            values: Vec::new(),
        }
    }

    /// Like [`Table::from_records`], keeping a typed value for every cell.
    /// The header row is taken from the text records.
    pub fn from_typed_records(records: Vec<Vec<String>>, mut values: Vec<Vec<Value>>) -> Self {
        let mut table = Self::from_records(records);
        if !values.is_empty() {
            values.remove(0);
        }
        table.values = values;
        table
    }

    fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.values.get(row).and_then(|r| r.get(col))
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    /// Widest row, header included.
    pub fn width(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0)
    }

    fn records(&self) -> impl Iterator<Item = &Vec<String>> {
        std::iter::once(&self.headers)
            .filter(|h| !h.is_empty())
            .chain(self.rows.iter())
    }
}

/// Parse CSV text. The first record is the header row; quoted fields may
/// contain commas, quotes and newlines.
pub fn parse_csv(text: &str) -> Result<Table, ConvertError> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ConvertError::decode(Format::Csv, e))?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(Table::from_records(records))
}

pub fn to_csv(table: &Table) -> Result<String, ConvertError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for record in table.records() {
        writer
            .write_record(record)
            .map_err(|e| ConvertError::encode(Format::Csv, e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ConvertError::encode(Format::Csv, e))?;
    String::from_utf8(bytes).map_err(|e| ConvertError::encode(Format::Csv, e))
}

/// `<table>` with one `<thead>` row and one `<tbody>` row per data record.
pub fn to_html(table: &Table) -> String {
    let mut out = String::from("<table><thead><tr>");
    for h in &table.headers {
        out.push_str(&format!("<th>{}</th>", escape_html(h)));
    }
    out.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str(&format!("<td>{}</td>", escape_html(cell)));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

/// GFM pipe table. Ragged rows are padded with empty cells.
pub fn to_markdown(table: &Table) -> String {
    let width = table.width();
    if width == 0 {
        return String::new();
    }
    let line = |cells: &[String]| {
        let mut padded: Vec<String> = cells
            .iter()
            .map(|c| c.replace('|', "\\|").replace('\n', " "))
            .collect();
        padded.resize(width, String::new());
        format!("| {} |", padded.join(" | "))
    };
    let mut lines = vec![line(&table.headers), format!("|{}", " --- |".repeat(width))];
    lines.extend(table.rows.iter().map(|r| line(r)));
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Data rows as an array of JSON objects keyed by header, pretty-printed with
/// two-space indentation.
///
/// Empty headers are named `__EMPTY`, `__EMPTY_1`, …; repeated headers get a
/// `_1`, `_2` suffix; empty cells are left out of their record. Typed cells
/// keep their JSON type (numbers, booleans); everything else is a string.
pub fn to_json_text(table: &Table) -> Result<String, ConvertError> {
    let keys = record_keys(&table.headers, table.width());
    let records: Vec<Value> = table
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let mut obj = Map::new();
            for (c, (key, cell)) in keys.iter().zip(row).enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let value = table
                    .value(r, c)
                    .cloned()
                    .unwrap_or_else(|| Value::String(cell.clone()));
                obj.insert(key.clone(), value);
            }
            Value::Object(obj)
        })
        .collect();
    serde_json::to_string_pretty(&records).map_err(|e| ConvertError::encode(Format::Txt, e))
}

fn record_keys(headers: &[String], width: usize) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(width);
    for i in 0..width {
        let base = match headers.get(i).map(|h| h.trim()) {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => "__EMPTY".to_string(),
        };
        let mut key = base.clone();
        let mut n = 1;
        while keys.contains(&key) {
            key = format!("{base}_{n}");
            n += 1;
        }
        keys.push(key);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        parse_csv("a,b\n1,2\n3,4").unwrap()
    }

    #[test]
    fn parse_splits_header() {
        let t = sample();
        assert_eq!(t.headers, vec!["a", "b"]);
        assert_eq!(t.rows, vec![vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn parse_quoted_comma() {
        let t = parse_csv("name,note\nAda,\"x, y\"\n").unwrap();
        assert_eq!(t.rows[0][1], "x, y");
    }

    #[test]
    fn parse_strips_bom() {
        let t = parse_csv("\u{FEFF}a,b\n").unwrap();
        assert_eq!(t.headers[0], "a");
    }

    #[test]
    fn html_has_one_header_row() {
        assert_eq!(
            to_html(&sample()),
            "<table><thead><tr><th>a</th><th>b</th></tr></thead><tbody>\
             <tr><td>1</td><td>2</td></tr><tr><td>3</td><td>4</td></tr></tbody></table>"
        );
    }

    #[test]
    fn html_escapes_cells() {
        let t = Table::from_records(vec![vec!["<x>".into()]]);
        assert!(to_html(&t).contains("<th>&lt;x&gt;</th>"));
    }

    #[test]
    fn csv_round_trip_preserves_shape() {
        let t = parse_csv("a,b\n1,\"2,5\"\n").unwrap();
        assert_eq!(to_csv(&t).unwrap(), "a,b\n1,\"2,5\"\n");
    }

    #[test]
    fn markdown_pads_ragged_rows() {
        let t = parse_csv("a,b\n1\n").unwrap();
        assert_eq!(to_markdown(&t), "| a | b |\n| --- | --- |\n| 1 |  |\n");
    }

    #[test]
    fn json_records_keyed_by_header() {
        let t = parse_csv("name,age\nAda,36\nBob,\n").unwrap();
        assert_eq!(
            to_json_text(&t).unwrap(),
            "[\n  {\n    \"name\": \"Ada\",\n    \"age\": \"36\"\n  },\n  {\n    \"name\": \"Bob\"\n  }\n]"
        );
    }

    #[test]
    fn json_keeps_typed_values() {
        let t = Table::from_typed_records(
            vec![
                vec!["name".into(), "age".into(), "member".into()],
                vec!["Ada".into(), "36".into(), "true".into()],
            ],
            vec![
                vec!["name".into(), "age".into(), "member".into()],
                vec!["Ada".into(), 36.into(), true.into()],
            ],
        );
        assert_eq!(
            to_json_text(&t).unwrap(),
            "[\n  {\n    \"name\": \"Ada\",\n    \"age\": 36,\n    \"member\": true\n  }\n]"
        );
        assert_eq!(to_csv(&t).unwrap(), "name,age,member\nAda,36,true\n");
    }

    #[test]
    fn json_keys_for_empty_and_duplicate_headers() {
        assert_eq!(
            record_keys(&["x".into(), "".into(), "x".into()], 4),
            vec!["x", "__EMPTY", "x_1", "__EMPTY_1"]
        );
    }

    #[test]
    fn empty_table() {
        let t = parse_csv("").unwrap();
        assert!(t.is_empty());
        assert_eq!(to_csv(&t).unwrap(), "");
        assert_eq!(to_markdown(&t), "");
        assert_eq!(to_json_text(&t).unwrap(), "[]");
    }
}
