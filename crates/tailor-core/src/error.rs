use thiserror::Error;

/// Application-wide error types for Tailor.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a catalog page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// No page yielded listings, or the batch ended up empty.
    #[error("Harvest failed: {pages_succeeded}/{pages_attempted} pages yielded listings")]
    HarvestFailed {
        pages_attempted: u32,
        pages_succeeded: u32,
    },

    /// The normalization pipeline could not produce a table.
    #[error("Transformation failed: {0}")]
    TransformFailed(String),

    /// A sink destination is still the placeholder or missing its credentials.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// A sink could not reach its destination.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The destination refused the write.
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// CSV encoding/decoding failed.
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl AppError {
    /// Returns true if this error must halt the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::HarvestFailed { .. } | AppError::TransformFailed(_)
        )
    }

    /// Returns true for single-request transport failures.
    ///
    /// The batch collector swallows these per page.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }
}
