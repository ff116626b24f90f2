use chrono::Utc;
use tracing::{error, info, warn};

use crate::catalog::{DatasetSummary, SpreadsheetFormat, UploadSummary};
use crate::config::ServiceConfig;
use crate::database::DatabaseManager;
use crate::domain::StoredRecord;
use crate::error::SheetStoreError;
use crate::storage::UploadStorage;
use crate::workbook;

pub struct DatasetManager {
    storage: UploadStorage,
    database: DatabaseManager,
}

impl DatasetManager {
    pub async fn new(config: &ServiceConfig) -> Result<Self, SheetStoreError> {
        let storage = UploadStorage::new(config.upload_dir.clone()).await?;
        let database = DatabaseManager::new(&config.database_url).await?;

        Ok(Self::with_parts(storage, database))
    }

    pub fn with_parts(storage: UploadStorage, database: DatabaseManager) -> Self {
        Self { storage, database }
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.database
    }

    pub fn storage(&self) -> &UploadStorage {
        &self.storage
    }

    /// Store an uploaded workbook and its first sheet's rows as a new dataset.
    ///
    /// Nothing is written when the extension is not a spreadsheet one. If the
    /// workbook cannot be parsed or saved the stored file is removed again and
    /// no dataset is created.
    pub async fn upload(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<UploadSummary, SheetStoreError> {
        let format = SpreadsheetFormat::from_file_name(original_name).ok_or_else(|| {
            SheetStoreError::validation("Only .xlsx, .xlsm, .xlsb, .xls or .ods files are allowed")
        })?;

        let stored_name = UploadStorage::stored_name_for(original_name);
        let path = self.storage.save(&stored_name, bytes).await?;
        info!(
            "Received {} upload '{}' ({} bytes) as {}",
            format,
            original_name,
            bytes.len(),
            path.display()
        );

        // The format is sniffed from the content, not the extension
        let content = bytes.to_vec();
        let parsed = match tokio::task::spawn_blocking(move || {
            workbook::read_first_sheet_from_bytes(&content)
        })
        .await
        {
            Ok(Ok(parsed)) => parsed,
            Ok(Err(e)) => {
                error!("Failed to parse '{}': {}", original_name, e);
                self.discard(&stored_name).await;
                return Err(e);
            }
            Err(e) => {
                self.discard(&stored_name).await;
                return Err(e.into());
            }
        };

        let dataset_id = match self
            .database
            .create_dataset_with_records(&stored_name, original_name, Utc::now(), &parsed.records)
            .await
        {
            Ok(dataset_id) => dataset_id,
            Err(e) => {
                error!("Failed to save dataset for '{}': {}", original_name, e);
                self.discard(&stored_name).await;
                return Err(e);
            }
        };

        Ok(UploadSummary {
            message: "Upload successful".to_string(),
            dataset_id,
            rows_saved: parsed.records.len(),
            sheet_name: parsed.sheet_name,
        })
    }

    pub async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, SheetStoreError> {
        let datasets = self.database.list_datasets().await?;
        Ok(datasets.iter().map(DatasetSummary::from).collect())
    }

    pub async fn get_rows(&self, dataset_id: i64) -> Result<Vec<StoredRecord>, SheetStoreError> {
        self.database.get_records(dataset_id).await
    }

    /// Delete a dataset, its records and then its stored file. A file that
    /// cannot be removed is only logged; the dataset is already gone by then.
    pub async fn delete_dataset(&self, dataset_id: i64) -> Result<(), SheetStoreError> {
        let removed = self.database.delete_dataset(dataset_id).await?;

        match self.storage.remove(&removed.filename).await {
            Ok(true) => {}
            Ok(false) => warn!(
                "Stored file {} of dataset {} was already missing",
                removed.filename, dataset_id
            ),
            Err(e) => warn!(
                "Failed to remove stored file {} of dataset {}: {}",
                removed.filename, dataset_id, e
            ),
        }

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), SheetStoreError> {
        self.database.health_check().await
    }

    async fn discard(&self, stored_name: &str) {
        if let Err(e) = self.storage.remove(stored_name).await {
            warn!("Failed to clean up {}: {}", stored_name, e);
        }
    }
}
