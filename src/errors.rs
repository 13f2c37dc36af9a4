use thiserror::Error;

/// Precondition violations raised before anything reaches the irradiance chain.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("latitude must be a finite value in [-90, 90], got {0}")]
    InvalidLatitude(f64),
    #[error("longitude must be a finite value in [-180, 180], got {0}")]
    InvalidLongitude(f64),
    #[error("unparseable UTC instant: {0:?}")]
    InvalidInstant(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read options file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse options file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid site location: {0}")]
    Location(#[from] FeatureError),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to decode provider payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LogWriterError {
    #[error("log file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode log record: {0}")]
    Json(#[from] serde_json::Error),
}
