use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Spreadsheet formats accepted for upload, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xlsx,
    Xlsm,
    Xlsb,
    Xls,
    Ods,
}

impl SpreadsheetFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpreadsheetFormat::Xlsx => "xlsx",
            SpreadsheetFormat::Xlsm => "xlsm",
            SpreadsheetFormat::Xlsb => "xlsb",
            SpreadsheetFormat::Xls => "xls",
            SpreadsheetFormat::Ods => "ods",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Some(SpreadsheetFormat::Xlsx),
            "xlsm" => Some(SpreadsheetFormat::Xlsm),
            "xlsb" => Some(SpreadsheetFormat::Xlsb),
            "xls" => Some(SpreadsheetFormat::Xls),
            "ods" => Some(SpreadsheetFormat::Ods),
            _ => None,
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for SpreadsheetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata of one uploaded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetEntry {
    pub id: i64,
    /// Name of the file under the upload directory
    pub filename: String,
    /// Name the file had on the client
    pub originalname: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Dataset listing entry as returned by `GET /datasets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetSummary {
    pub id: i64,
    pub originalname: String,
    pub uploaded_at: String,
}

impl From<&DatasetEntry> for DatasetSummary {
    fn from(entry: &DatasetEntry) -> Self {
        DatasetSummary {
            id: entry.id,
            originalname: entry.originalname.clone(),
            uploaded_at: format_timestamp(&entry.uploaded_at),
        }
    }
}

/// Response body of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadSummary {
    pub message: String,
    pub dataset_id: i64,
    pub rows_saved: usize,
    pub sheet_name: String,
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
