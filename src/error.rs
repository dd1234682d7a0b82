use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("symbol not watched: {0}")]
    NotFound(String),

    #[error("market clock misconfigured: {0}")]
    ClockConfig(String),

    #[error("invalid opening price: {0}")]
    InvalidOpeningPrice(f64),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("alert sink I/O error: {0}")]
    Sink(#[from] std::io::Error),

    #[error("alert serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
