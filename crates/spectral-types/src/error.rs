use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectralError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SpectralResult<T> = Result<T, SpectralError>;
