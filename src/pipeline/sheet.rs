//! Spreadsheet adapter: the first worksheet of an `.xls`/`.xlsx` workbook as
//! a [`Table`].

use crate::error::ConvertError;
use crate::format::Format;
use crate::pipeline::table::Table;
use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use serde_json::{Number, Value};
use std::io::Cursor;
use tracing::debug;

/// Largest integer an `f64` holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Read the first worksheet. Its first used row becomes the header row.
///
/// Every cell keeps a display string (dates as `YYYY-MM-DD`, with the time
/// when it is not midnight) and a typed value: numbers and booleans stay
/// numbers and booleans, everything else is the display string.
pub fn read_first_sheet(bytes: &[u8], format: Format) -> Result<Table, ConvertError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ConvertError::decode(format, e))?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ConvertError::decode(format, "workbook has no worksheets"))?;
    let range = workbook
        .worksheet_range(&first)
        .map_err(|e| ConvertError::decode(format, e))?;
    debug!(
        "Worksheet '{}': {} rows × {} columns",
        first,
        range.height(),
        range.width()
    );
    let mut records = Vec::with_capacity(range.height());
    let mut values = Vec::with_capacity(range.height());
    for row in range.rows() {
        let texts: Vec<String> = row.iter().map(cell_text).collect();
        values.push(row.iter().zip(&texts).map(|(c, t)| cell_value(c, t)).collect());
        records.push(texts);
    }
    Ok(Table::from_typed_records(records, values))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(dt) => format_datetime(dt).unwrap_or_else(|| dt.to_string()),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data, text: &str) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => float_value(*f).unwrap_or_else(|| Value::String(text.to_string())),
        Data::Bool(b) => Value::Bool(*b),
        _ => Value::String(text.to_string()),
    }
}

/// Whole floats become JSON integers so `36.0` is written as `36`.
fn float_value(f: f64) -> Option<Value> {
    if f.fract() == 0.0 && f.abs() < MAX_SAFE_INTEGER {
        Some(Value::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number)
    }
}

/// Date, date-time or time of day for a date cell. Durations keep the raw
/// serial.
fn format_datetime(dt: &ExcelDateTime) -> Option<String> {
    if dt.is_duration() {
        return None;
    }
    let serial = dt.as_f64();
    let pattern = if serial < 1.0 {
        "%H:%M:%S"
    } else if serial.fract() == 0.0 {
        "%Y-%m-%d"
    } else {
        "%Y-%m-%d %H:%M:%S"
    };
    dt.as_datetime().map(|d| d.format(pattern).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::{ExcelDateTime as XlsxDate, Format as XlsxFormat, Workbook};

    fn xlsx() -> Vec<u8> {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        sheet.write_string(0, 0, "name").unwrap();
        sheet.write_string(0, 1, "age").unwrap();
        sheet.write_string(1, 0, "Ada").unwrap();
        sheet.write_number(1, 1, 36).unwrap();
        sheet.write_string(2, 0, "Bob").unwrap();
        wb.add_worksheet().write_string(0, 0, "ignored").unwrap();
        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn first_sheet_becomes_table() {
        let table = read_first_sheet(&xlsx(), Format::Xlsx).unwrap();
        assert_eq!(table.headers, vec!["name", "age"]);
        assert_eq!(table.rows[0], vec!["Ada", "36"]);
        assert_eq!(table.rows[1], vec!["Bob", ""]);
    }

    #[test]
    fn cells_keep_their_types() {
        let mut wb = Workbook::new();
        let sheet = wb.add_worksheet();
        let date = XlsxFormat::new().set_num_format("yyyy-mm-dd");
        for (col, header) in ["n", "ratio", "ok", "when", "at"].into_iter().enumerate() {
            sheet.write_string(0, col as u16, header).unwrap();
        }
        sheet.write_number(1, 0, 36).unwrap();
        sheet.write_number(1, 1, 0.5).unwrap();
        sheet.write_boolean(1, 2, true).unwrap();
        let day = XlsxDate::from_ymd(2024, 3, 9).unwrap();
        sheet.write_datetime_with_format(1, 3, &day, &date).unwrap();
        let stamp = XlsxDate::from_ymd(2024, 3, 9).unwrap().and_hms(14, 30, 0).unwrap();
        sheet.write_datetime_with_format(1, 4, &stamp, &date).unwrap();

        let table = read_first_sheet(&wb.save_to_buffer().unwrap(), Format::Xlsx).unwrap();
        assert_eq!(
            table.rows[0],
            vec!["36", "0.5", "true", "2024-03-09", "2024-03-09 14:30:00"]
        );
        assert_eq!(table.values[0][0], Value::from(36));
        assert_eq!(table.values[0][1], Value::from(0.5));
        assert_eq!(table.values[0][2], Value::Bool(true));
        assert_eq!(table.values[0][3], Value::from("2024-03-09"));
    }

    #[test]
    fn garbage_is_decode_error() {
        let err = read_first_sheet(b"no workbook here", Format::Xls).unwrap_err();
        assert!(matches!(err, ConvertError::Decode { format: Format::Xls, .. }));
    }
}
