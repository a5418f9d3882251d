use thiserror::Error;

#[derive(Error, Debug)]
pub enum QrAnalyticsError {
    #[error("Failed to load order data from {path}: {details}")]
    LoadError { path: String, details: String },

    #[error("Required column '{0}' is missing from the order data")]
    MissingColumn(String),

    #[error("Invalid filter criteria: {0}")]
    InvalidFilter(String),

    #[error("Invalid period '{0}': expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl QrAnalyticsError {
    /// True for the failures that must halt the pipeline before any dashboard
    /// content is produced.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            QrAnalyticsError::LoadError { .. }
                | QrAnalyticsError::MissingColumn(_)
                | QrAnalyticsError::Csv(_)
                | QrAnalyticsError::IoError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, QrAnalyticsError>;
