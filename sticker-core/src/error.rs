//! Error types for sticker operations.

use thiserror::Error;

/// Result type for core sticker operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core sticker operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A scale or base size was zero, negative, or not finite.
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    /// An image handle could not be resolved to pixel data.
    #[error("Failed to resolve image: {0}")]
    ImageResolution(String),

    /// Scene serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
