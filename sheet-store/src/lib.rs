pub mod catalog;
pub mod config;
pub mod database;
pub mod dataset_manager;
pub mod domain;
pub mod error;
pub mod http_server;
pub mod models;
pub mod schema;
pub mod storage;
pub mod workbook;

pub use config::ServiceConfig;
pub use dataset_manager::DatasetManager;
pub use error::SheetStoreError;
pub use http_server::HttpServer;
