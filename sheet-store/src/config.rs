use std::path::PathBuf;

use crate::error::SheetStoreError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_URL: &str = "data.sqlite";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Runtime settings of the service, read once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub port: u16,
    /// Path of the SQLite database file
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, SheetStoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SheetStoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| SheetStoreError::ConfigError {
                message: format!("Invalid PORT '{}': {}", raw, e),
            })?,
            None => DEFAULT_PORT,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| SheetStoreError::ConfigError {
                message: format!("Invalid MAX_UPLOAD_BYTES '{}': {}", raw, e),
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            port,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes,
        })
    }
}
