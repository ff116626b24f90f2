use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::catalog::{format_timestamp, DatasetEntry};
use crate::domain::{Record, StoredRecord};
use crate::error::SheetStoreError;
use crate::schema::{datasets, rows};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = datasets)]
#[diesel(primary_key(id))]
pub struct Dataset {
    pub id: i64,
    pub filename: String,
    pub originalname: String,
    pub uploaded_at: String,
}

#[derive(Insertable)]
#[diesel(table_name = datasets)]
pub struct NewDataset<'a> {
    pub filename: &'a str,
    pub originalname: &'a str,
    pub uploaded_at: String,
}

impl<'a> NewDataset<'a> {
    pub fn new(filename: &'a str, originalname: &'a str, uploaded_at: &DateTime<Utc>) -> Self {
        Self {
            filename,
            originalname,
            uploaded_at: format_timestamp(uploaded_at),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = rows)]
#[diesel(belongs_to(Dataset, foreign_key = dataset_id))]
#[diesel(primary_key(id))]
pub struct RowModel {
    pub id: i64,
    pub dataset_id: i64,
    pub data: String,
}

#[derive(Insertable)]
#[diesel(table_name = rows)]
pub struct NewRow {
    pub dataset_id: i64,
    pub data: String,
}

impl NewRow {
    pub fn from_record(dataset_id: i64, record: &Record) -> Result<Self, SheetStoreError> {
        Ok(Self {
            dataset_id,
            data: serde_json::to_string(record)?,
        })
    }
}

impl TryFrom<Dataset> for DatasetEntry {
    type Error = SheetStoreError;

    fn try_from(dataset: Dataset) -> Result<Self, Self::Error> {
        let uploaded_at = DateTime::parse_from_rfc3339(&dataset.uploaded_at)
            .map_err(|e| SheetStoreError::Store {
                message: format!(
                    "Invalid upload timestamp '{}' for dataset {}: {}",
                    dataset.uploaded_at, dataset.id, e
                ),
            })?
            .with_timezone(&Utc);

        Ok(DatasetEntry {
            id: dataset.id,
            filename: dataset.filename,
            originalname: dataset.originalname,
            uploaded_at,
        })
    }
}

impl TryFrom<RowModel> for StoredRecord {
    type Error = SheetStoreError;

    fn try_from(row: RowModel) -> Result<Self, Self::Error> {
        let data: Record = serde_json::from_str(&row.data)?;
        Ok(StoredRecord { id: row.id, data })
    }
}
