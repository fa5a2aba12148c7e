use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no control bound to {0}")]
    UnknownControl(String),
}
