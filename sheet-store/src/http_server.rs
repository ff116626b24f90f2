use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::catalog::{format_timestamp, DatasetSummary, UploadSummary};
use crate::dataset_manager::DatasetManager;
use crate::domain::StoredRecord;
use crate::error::SheetStoreError;

/// Multipart field carrying the uploaded workbook.
const FILE_FIELD: &str = "file";

pub struct HttpServer {
    manager: Arc<DatasetManager>,
    max_upload_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct RowsParams {
    pub dataset_id: Option<String>,
}

impl HttpServer {
    pub fn new(manager: Arc<DatasetManager>, max_upload_bytes: usize) -> Self {
        Self {
            manager,
            max_upload_bytes,
        }
    }

    pub fn router(&self) -> Router {
        router(self.manager.clone(), self.max_upload_bytes)
    }

    pub async fn start(&self, addr: SocketAddr) -> Result<(), SheetStoreError> {
        info!("Starting HTTP server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}

pub fn router(manager: Arc<DatasetManager>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/datasets", get(list_datasets))
        .route("/datasets/:id", delete(delete_dataset))
        .route("/rows", get(get_rows))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}

async fn upload(
    State(manager): State<Arc<DatasetManager>>,
    mut multipart: Multipart,
) -> Result<Json<UploadSummary>, SheetStoreError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SheetStoreError::validation(format!("Invalid upload: {}", e.body_text())))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if upload.is_some() {
            return Err(SheetStoreError::validation(
                "Only one file may be uploaded per request",
            ));
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| SheetStoreError::validation("No file uploaded"))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| SheetStoreError::validation(format!("Invalid upload: {}", e.body_text())))?;

        upload = Some((file_name, data.to_vec()));
    }

    let (file_name, data) = upload.ok_or_else(|| SheetStoreError::validation("No file uploaded"))?;
    info!("HTTP: Received upload '{}'", file_name);

    let summary = manager.upload(&file_name, &data).await?;
    info!(
        "HTTP: Saved {} row(s) from sheet '{}' as dataset {}",
        summary.rows_saved, summary.sheet_name, summary.dataset_id
    );

    Ok(Json(summary))
}

async fn list_datasets(
    State(manager): State<Arc<DatasetManager>>,
) -> Result<Json<Vec<DatasetSummary>>, SheetStoreError> {
    let datasets = manager.list_datasets().await?;
    info!("HTTP: Returning {} datasets", datasets.len());
    Ok(Json(datasets))
}

async fn get_rows(
    State(manager): State<Arc<DatasetManager>>,
    Query(params): Query<RowsParams>,
) -> Result<Json<Vec<StoredRecord>>, SheetStoreError> {
    let raw = params
        .dataset_id
        .ok_or_else(|| SheetStoreError::validation("dataset_id is required"))?;
    let dataset_id = parse_dataset_id(&raw)
        .ok_or_else(|| SheetStoreError::validation("dataset_id must be a positive integer"))?;

    let rows = manager.get_rows(dataset_id).await?;
    info!("HTTP: Returning {} rows for dataset {}", rows.len(), dataset_id);
    Ok(Json(rows))
}

async fn delete_dataset(
    State(manager): State<Arc<DatasetManager>>,
    Path(raw): Path<String>,
) -> Result<Json<serde_json::Value>, SheetStoreError> {
    let dataset_id =
        parse_dataset_id(&raw).ok_or_else(|| SheetStoreError::validation("Invalid id"))?;

    manager.delete_dataset(dataset_id).await?;
    Ok(Json(serde_json::json!({ "message": "Deleted dataset and file" })))
}

async fn health_check(
    State(manager): State<Arc<DatasetManager>>,
) -> Result<Json<serde_json::Value>, SheetStoreError> {
    if let Err(e) = manager.health_check().await {
        error!("HTTP: Health check failed: {}", e);
        return Err(e);
    }

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": format_timestamp(&chrono::Utc::now()),
    })))
}

/// Dataset ids are positive integers.
pub fn parse_dataset_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_ids_must_be_positive_integers() {
        assert_eq!(parse_dataset_id("12"), Some(12));
        assert_eq!(parse_dataset_id(" 7 "), Some(7));
        assert_eq!(parse_dataset_id("0"), None);
        assert_eq!(parse_dataset_id("-3"), None);
        assert_eq!(parse_dataset_id("12abc"), None);
        assert_eq!(parse_dataset_id(""), None);
    }
}
