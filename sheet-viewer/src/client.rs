use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use url::Url;

use crate::error::ViewerError;
use crate::view::Row;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetSummary {
    pub id: i64,
    pub originalname: String,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadSummary {
    #[serde(default)]
    pub message: String,
    pub dataset_id: i64,
    pub rows_saved: usize,
    pub sheet_name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the sheet store service.
#[derive(Debug, Clone)]
pub struct SheetStoreClient {
    client: reqwest::Client,
    base_url: Url,
}

impl SheetStoreClient {
    pub fn new(endpoint: &str) -> Result<Self, ViewerError> {
        let base_url = Url::parse(endpoint).map_err(|e| ViewerError::Config {
            message: format!("Invalid sheet store URL '{}': {}", endpoint, e),
        })?;

        info!("Using sheet store at {}", base_url);

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ViewerError> {
        self.base_url.join(path).map_err(|e| ViewerError::Config {
            message: format!("Invalid request path '{}': {}", path, e),
        })
    }

    pub async fn list_datasets(&self) -> Result<Vec<DatasetSummary>, ViewerError> {
        let response = self.client.get(self.url("datasets")?).send().await?;
        let datasets: Vec<DatasetSummary> = Self::json_or_error(response).await?;

        debug!("Fetched {} datasets", datasets.len());
        Ok(datasets)
    }

    pub async fn fetch_rows(&self, dataset_id: i64) -> Result<Vec<Row>, ViewerError> {
        let mut url = self.url("rows")?;
        url.query_pairs_mut()
            .append_pair("dataset_id", &dataset_id.to_string());

        let response = self.client.get(url).send().await?;
        let rows: Vec<Row> = Self::json_or_error(response).await?;

        debug!("Fetched {} rows for dataset {}", rows.len(), dataset_id);
        Ok(rows)
    }

    pub async fn upload_file(&self, path: &Path) -> Result<UploadSummary, ViewerError> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ViewerError::command(format!("Not a file: {}", path.display())))?
            .to_string();
        let bytes = tokio::fs::read(path).await?;

        info!("Uploading {} ({} bytes)", file_name, bytes.len());

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));
        let response = self
            .client
            .post(self.url("upload")?)
            .multipart(form)
            .send()
            .await?;

        Self::json_or_error(response).await
    }

    pub async fn delete_dataset(&self, dataset_id: i64) -> Result<String, ViewerError> {
        let response = self
            .client
            .delete(self.url(&format!("datasets/{}", dataset_id))?)
            .send()
            .await?;

        let body: serde_json::Value = Self::json_or_error(response).await?;
        Ok(body
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Deleted")
            .to_string())
    }

    pub async fn health_check(&self) -> Result<(), ViewerError> {
        let response = self.client.get(self.url("health")?).send().await?;
        let _: serde_json::Value = Self::json_or_error(response).await?;
        Ok(())
    }

    async fn json_or_error<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ViewerError> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|body| body.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ViewerError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}
