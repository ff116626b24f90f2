pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod render;
pub mod shell;
pub mod view;

pub use client::SheetStoreClient;
pub use config::ViewerConfig;
pub use error::ViewerError;
pub use shell::Shell;
