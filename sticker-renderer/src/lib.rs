//! # Sticker Renderer
//!
//! Captures the composed sticker scene as a PNG and hands it to the host:
//! a file download in the browser, the media library on native.
//!
//! ## Export Flow
//!
//! ```text
//! ComposedScene ──> SceneRasterizer ──> CaptureStrategy ──> ExportReceipt
//!   (snapshot)      (SVG -> resvg)      ├─ DomCapture    (download)
//!                                       └─ NativeCapture (permission,
//!                                                         media library)
//! ```
//!
//! [`ExportPipeline`] wraps the strategy selected at startup and allows one
//! export at a time.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capture;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod raster;

pub use capture::{
    select_default_strategy, select_strategy, ArtifactPayload, CaptureStrategy, CapturedArtifact,
    DirectoryDownloads, DirectoryMediaLibrary, DomCapture, DownloadSink, ExportReceipt,
    HostServices, MediaLibrary, NativeCapture, PermissionProvider, PermissionStatus,
    RuntimeTarget, DOWNLOAD_FILENAME, SAVED_CONFIRMATION,
};
pub use error::{CaptureError, ExportError, ExportResult, PermissionError};
pub use image::DefaultImageResolver;
pub use pipeline::{ExportPipeline, ExportState};
pub use raster::{CaptureOptions, RasterImage, SceneRasterizer};

#[cfg(feature = "wasm")]
pub use capture::BrowserDownload;

use sticker_core::StickerSession;

/// Export the session's current scene.
///
/// Takes a snapshot first, so the session may keep receiving gestures while
/// the export is running.
///
/// # Errors
///
/// Returns whatever error ended the export; the session is left unchanged.
pub async fn export_session(
    pipeline: &ExportPipeline,
    session: &mut StickerSession,
) -> ExportResult<ExportReceipt> {
    let scene = session.snapshot();
    pipeline.export(&scene).await
}
