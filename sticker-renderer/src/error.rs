//! Export error types.

use thiserror::Error;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors that end a single export attempt.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Rasterizing or writing the image failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Media-library access was not granted.
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// Another export is still in flight.
    #[error("An export is already in progress")]
    Busy,
}

/// Rasterization or file-write failures.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The scene could not be turned into pixels.
    #[error("Rasterization failed: {0}")]
    Rasterize(String),

    /// The pixels could not be encoded.
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Writing or moving the artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Capture options were out of range.
    #[error("Invalid capture options: {0}")]
    InvalidOptions(String),

    /// The scene's images could not be prepared.
    #[error("Scene preparation failed: {0}")]
    Scene(#[from] sticker_core::CoreError),
}

/// Media-library permission failures (native runtime only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The host has not asked the user yet.
    #[error("Media library permission has not been requested")]
    NotRequested,

    /// The user refused access.
    #[error("Media library permission denied")]
    Denied,
}
