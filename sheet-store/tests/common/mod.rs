#![allow(dead_code)]

use diesel::sqlite::SqliteConnection;
use diesel::{Connection, RunQueryDsl};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use sheet_store::{DatasetManager, ServiceConfig};
use std::path::Path;
use std::sync::Once;
use tempfile::TempDir;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

/// A service configuration rooted in a fresh temporary directory. Keep the
/// returned `TempDir` alive for the duration of the test.
pub fn test_config() -> (TempDir, ServiceConfig) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config = ServiceConfig {
        port: 0,
        database_url: dir.path().join("data.sqlite").to_string_lossy().into_owned(),
        upload_dir: dir.path().join("uploads"),
        max_upload_bytes: 5 * 1024 * 1024,
    };
    (dir, config)
}

pub async fn test_manager() -> (TempDir, DatasetManager) {
    init_test_logging();
    let (dir, config) = test_config();
    let manager = DatasetManager::new(&config)
        .await
        .expect("Failed to create dataset manager");
    (dir, manager)
}

/// Make every insert into `rows` fail from now on, for the store created by
/// `test_config` in `dir`.
pub fn reject_row_inserts(dir: &Path) {
    let path = dir.join("data.sqlite");
    let mut conn = SqliteConnection::establish(&path.to_string_lossy())
        .expect("Failed to open test database");
    diesel::sql_query(
        "CREATE TRIGGER reject_rows BEFORE INSERT ON rows \
         BEGIN SELECT RAISE(ABORT, 'row insert rejected'); END",
    )
    .execute(&mut conn)
    .expect("Failed to install trigger");
}

/// Number of files in the upload directory.
pub async fn stored_file_count(manager: &DatasetManager) -> usize {
    let mut entries = tokio::fs::read_dir(manager.storage().root()).await.unwrap();
    let mut count = 0;
    while entries.next_entry().await.unwrap().is_some() {
        count += 1;
    }
    count
}

/// Sheet "People": name / age / joined, where Bo has no join date.
pub fn people_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let joined = ExcelDateTime::from_ymd(2024, 1, 15).expect("valid date");

    let sheet = workbook.add_worksheet();
    sheet.set_name("People").expect("valid sheet name");
    sheet.write_string(0, 0, "name").unwrap();
    sheet.write_string(0, 1, "age").unwrap();
    sheet.write_string(0, 2, "joined").unwrap();

    sheet.write_string(1, 0, "Ann").unwrap();
    sheet.write_number(1, 1, 30.0).unwrap();
    sheet
        .write_datetime_with_format(1, 2, &joined, &date_format)
        .unwrap();

    sheet.write_string(2, 0, "Bo").unwrap();
    sheet.write_number(2, 1, 25.0).unwrap();

    // A second sheet that must be ignored
    let other = workbook.add_worksheet();
    other.set_name("Ignored").expect("valid sheet name");
    other.write_string(0, 0, "unused").unwrap();
    other.write_string(1, 0, "value").unwrap();

    workbook.save_to_buffer().expect("Failed to build workbook")
}

/// A single sheet with a header row and `rows` numbered data rows.
pub fn numbered_workbook(rows: u32) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "n").unwrap();
    sheet.write_string(0, 1, "label").unwrap();
    for row in 1..=rows {
        sheet.write_number(row, 0, row as f64).unwrap();
        sheet.write_string(row, 1, &format!("row {}", row)).unwrap();
    }
    workbook.save_to_buffer().expect("Failed to build workbook")
}

/// A `multipart/form-data` body with one file part.
pub fn multipart_body(boundary: &str, field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
