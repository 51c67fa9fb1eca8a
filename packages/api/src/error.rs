use store::StoreError;
use thiserror::Error;

/// Errors raised while talking to the prospecting backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Invalid CSV file: {0}")]
    InvalidFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}
