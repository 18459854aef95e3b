//! Error types for background removal processing

use thiserror::Error;

/// Result type alias for background removal processing operations
pub type Result<T> = std::result::Result<T, MatteError>;

/// Error types for the processing pipeline
///
/// Durable-cache I/O failures never appear here: the durable tier is an
/// optimization layer, so its errors are logged and downgraded to cache
/// misses (reads) or no-ops (writes) inside [`crate::cache::ResultCache`].
#[derive(Error, Debug)]
pub enum MatteError {
    /// Input/output errors (cache directory creation, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input bytes could not be decoded as an image
    #[error("Decode error: {0}")]
    Decode(#[source] image::ImageError),

    /// The matting capability failed or returned an invalid result
    #[error("Matting failed: {0}")]
    Matting(String),

    /// Canonical re-encoding failed after successful matting
    #[error("Encode error: {0}")]
    Encode(#[source] image::ImageError),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MatteError {
    /// Create a new decode error from an underlying image error
    pub fn decode(error: image::ImageError) -> Self {
        Self::Decode(error)
    }

    /// Create a new matting error
    pub fn matting<S: Into<String>>(msg: S) -> Self {
        Self::Matting(msg.into())
    }

    /// Create a new encode error from an underlying image error
    pub fn encode(error: image::ImageError) -> Self {
        Self::Encode(error)
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
    ) -> Self {
        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {})",
            parameter, value, valid_range
        ))
    }

    /// Whether this error indicates undecodable input bytes
    #[must_use]
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
