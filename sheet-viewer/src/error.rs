use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{message}")]
    Command { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ViewerError {
    pub fn command(message: impl Into<String>) -> Self {
        ViewerError::Command {
            message: message.into(),
        }
    }
}
