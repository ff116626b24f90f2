//! Reads the first sheet of a workbook into uniform records.
//!
//! Every record carries exactly the keys of the header row; cells missing from
//! a row are filled with an empty text value rather than left out.

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek};
use tracing::debug;

use crate::domain::{FieldValue, Record};
use crate::error::SheetStoreError;

/// Header used for columns whose header cell is blank.
const EMPTY_HEADER: &str = "__EMPTY";

/// Result of reading the first sheet of a workbook
#[derive(Debug, Clone)]
pub struct ParsedSheet {
    pub sheet_name: String,
    /// Unique column keys, in sheet order
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

/// Read the first sheet of an in-memory workbook. The format is sniffed from
/// the content, so a misnamed file still opens.
pub fn read_first_sheet_from_bytes(bytes: &[u8]) -> Result<ParsedSheet, SheetStoreError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    first_sheet(&mut workbook)
}

fn first_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>) -> Result<ParsedSheet, SheetStoreError> {
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| SheetStoreError::Parse {
            message: "Workbook contains no sheets".to_string(),
        })?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let (headers, records) = normalize_range(&range);

    debug!(
        "Sheet '{}' yielded {} columns and {} records",
        sheet_name,
        headers.len(),
        records.len()
    );

    Ok(ParsedSheet {
        sheet_name,
        headers,
        records,
    })
}

/// Turn a sheet range into header keys and one record per non-blank data row.
pub fn normalize_range(range: &Range<Data>) -> (Vec<String>, Vec<Record>) {
    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_keys(header_row),
        None => return (Vec::new(), Vec::new()),
    };

    let records = rows
        .filter(|row| !row.iter().all(is_blank))
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(idx, header)| {
                    let value = row.get(idx).map(cell_value).unwrap_or_else(FieldValue::empty);
                    (header.clone(), value)
                })
                .collect::<Record>()
        })
        .collect();

    (headers, records)
}

/// Build unique keys from the header row. Blank headers become `__EMPTY`,
/// repeats get a `_1`, `_2`, ... suffix.
fn header_keys(row: &[Data]) -> Vec<String> {
    let mut used = HashSet::new();

    row.iter()
        .map(|cell| {
            let text = header_text(cell);
            let base = if text.is_empty() {
                EMPTY_HEADER.to_string()
            } else {
                text
            };

            let mut key = base.clone();
            let mut suffix = 0;
            while used.contains(&key) {
                suffix += 1;
                key = format!("{}_{}", base, suffix);
            }
            used.insert(key.clone());
            key
        })
        .collect()
}

fn header_text(cell: &Data) -> String {
    match cell_value(cell) {
        FieldValue::Text(s) => s,
        FieldValue::Int(i) => i.to_string(),
        FieldValue::Float(f) => f.to_string(),
        FieldValue::Bool(b) => b.to_string(),
        FieldValue::Date(dt) => format_date(&dt),
        _ => String::new(),
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Convert a sheet cell to a field value
pub fn cell_value(cell: &Data) -> FieldValue {
    match cell {
        Data::Empty => FieldValue::empty(),
        Data::String(s) => FieldValue::Text(s.clone()),
        Data::Int(i) => FieldValue::Int(*i),
        Data::Float(f) => {
            // Whole numbers come back from most readers as floats
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 {
                FieldValue::Int(*f as i64)
            } else {
                FieldValue::Float(*f)
            }
        }
        Data::Bool(b) => FieldValue::Bool(*b),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                return FieldValue::Float(dt.as_f64());
            }
            dt.as_datetime()
                .map(FieldValue::Date)
                .unwrap_or_else(|| FieldValue::Float(dt.as_f64()))
        }
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(FieldValue::Date)
            .unwrap_or_else(|| FieldValue::Text(s.clone())),
        Data::DurationIso(s) => FieldValue::Text(s.clone()),
        Data::Error(e) => FieldValue::Text(e.to_string()),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn format_date(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}
