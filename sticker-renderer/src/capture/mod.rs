//! Runtime-specific capture strategies.
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            CaptureStrategy Trait            │
//! ├──────────────────────┬──────────────────────┤
//! │ DomCapture           │ NativeCapture        │
//! │ 320x440 PNG bytes    │ 440-high temp file   │
//! │ -> DownloadSink      │ -> MediaLibrary      │
//! │ (no permission)      │ (permission gated)   │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! The host picks one strategy at startup with [`select_strategy`]; nothing
//! downstream checks the platform again.

pub mod dom;
pub mod native;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sticker_core::{ComposedScene, ImageResolver};

use crate::error::{CaptureError, ExportResult};
use crate::image::path_to_file_uri;
use crate::raster::{CaptureOptions, SceneRasterizer};

pub use dom::{DirectoryDownloads, DomCapture, DownloadSink, DOWNLOAD_FILENAME};
pub use native::{
    DirectoryMediaLibrary, MediaLibrary, NativeCapture, PermissionProvider, PermissionStatus,
    SAVED_CONFIRMATION,
};

#[cfg(feature = "wasm")]
pub use dom::BrowserDownload;

/// The runtime the application is hosted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeTarget {
    /// A browser with a DOM.
    Dom,
    /// A native mobile or desktop runtime.
    Native,
}

impl RuntimeTarget {
    /// The target this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Dom
        } else {
            Self::Native
        }
    }
}

/// Where the captured pixels live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactPayload {
    /// In-memory PNG bytes.
    Bytes(Vec<u8>),
    /// A temporary PNG file.
    TempFile(PathBuf),
}

/// A rasterized PNG of the composed scene.
///
/// Consumed by [`CaptureStrategy::deliver`]; the pipeline keeps no copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedArtifact {
    width: u32,
    height: u32,
    payload: ArtifactPayload,
}

impl CapturedArtifact {
    /// Create an artifact.
    #[must_use]
    pub fn new(width: u32, height: u32, payload: ArtifactPayload) -> Self {
        Self {
            width,
            height,
            payload,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The payload.
    #[must_use]
    pub fn payload(&self) -> &ArtifactPayload {
        &self.payload
    }

    /// `file://` URI of a temp-file payload. `None` for in-memory bytes or a
    /// relative temp path.
    #[must_use]
    pub fn file_uri(&self) -> Option<String> {
        match &self.payload {
            ArtifactPayload::TempFile(path) => path_to_file_uri(path),
            ArtifactPayload::Bytes(_) => None,
        }
    }

    /// Take the PNG bytes, reading the temp file if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be read.
    pub async fn into_bytes(self) -> Result<Vec<u8>, CaptureError> {
        match self.payload {
            ArtifactPayload::Bytes(bytes) => Ok(bytes),
            ArtifactPayload::TempFile(path) => {
                let bytes = tokio::fs::read(&path).await?;
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("Failed to remove temp capture {}: {e}", path.display());
                }
                Ok(bytes)
            }
        }
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    /// Runtime that produced the export.
    pub target: RuntimeTarget,
    /// Where the image ended up (download path or media-library location).
    pub location: String,
    /// Pixel width of the exported image.
    pub width: u32,
    /// Pixel height of the exported image.
    pub height: u32,
    /// Message to show the user, if the runtime has no built-in feedback.
    pub confirmation: Option<&'static str>,
}

/// One way of turning a scene into a saved image.
#[async_trait]
pub trait CaptureStrategy: Send + Sync {
    /// The runtime this strategy serves.
    fn target(&self) -> RuntimeTarget;

    /// Rasterize the composed scene.
    ///
    /// # Errors
    ///
    /// Returns an error if preconditions fail or the image cannot be produced.
    async fn capture(&self, scene: &ComposedScene) -> ExportResult<CapturedArtifact>;

    /// Hand the artifact to the runtime's save or download collaborator.
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator fails.
    async fn deliver(&self, artifact: CapturedArtifact) -> ExportResult<ExportReceipt>;
}

/// Collaborators the host provides to the capture strategies.
#[derive(Clone)]
pub struct HostServices {
    /// Resolves background and sticker images.
    pub resolver: Arc<dyn ImageResolver>,
    /// Receives DOM downloads.
    pub downloads: Arc<dyn DownloadSink>,
    /// Persists native captures.
    pub media_library: Arc<dyn MediaLibrary>,
    /// Reports native media permission.
    pub permission: Arc<dyn PermissionProvider>,
    /// Directory for native temp captures.
    pub temp_dir: PathBuf,
}

/// Build the capture strategy for the runtime this binary targets.
///
/// # Errors
///
/// Returns an error if the runtime's default capture options are rejected.
pub fn select_default_strategy(
    services: HostServices,
) -> Result<Box<dyn CaptureStrategy>, CaptureError> {
    select_strategy(RuntimeTarget::current(), services)
}

/// Build the capture strategy for `target`, once, at startup.
///
/// # Errors
///
/// Returns an error if the runtime's default capture options are rejected.
pub fn select_strategy(
    target: RuntimeTarget,
    services: HostServices,
) -> Result<Box<dyn CaptureStrategy>, CaptureError> {
    tracing::info!("Using {target:?} capture strategy");
    match target {
        RuntimeTarget::Dom => {
            let rasterizer = SceneRasterizer::new(services.resolver, CaptureOptions::dom())?;
            Ok(Box::new(DomCapture::new(rasterizer, services.downloads)))
        }
        RuntimeTarget::Native => {
            let rasterizer = SceneRasterizer::new(services.resolver, CaptureOptions::native())?;
            Ok(Box::new(NativeCapture::new(
                rasterizer,
                services.permission,
                services.media_library,
                services.temp_dir,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_temp_file_uri_escapes_reserved_characters() {
        let artifact = CapturedArtifact::new(
            320,
            440,
            ArtifactPayload::TempFile("/tmp/caps #1?/x.png".into()),
        );
        assert_eq!(
            artifact.file_uri().as_deref(),
            Some("file:///tmp/caps%20%231%3F/x.png")
        );

        let relative = CapturedArtifact::new(1, 1, ArtifactPayload::TempFile("x.png".into()));
        assert!(relative.file_uri().is_none());
    }

    #[test]
    fn test_default_strategy_matches_compile_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let services = HostServices {
            resolver: Arc::new(crate::image::DefaultImageResolver::new().expect("resolver")),
            downloads: Arc::new(DirectoryDownloads::new(dir.path())),
            media_library: Arc::new(DirectoryMediaLibrary::new(dir.path())),
            permission: Arc::new(PermissionStatus::Granted),
            temp_dir: dir.path().to_path_buf(),
        };
        let strategy = select_default_strategy(services).expect("strategy");
        assert_eq!(strategy.target(), RuntimeTarget::current());
        assert_eq!(RuntimeTarget::current(), RuntimeTarget::Native);
    }

    #[test]
    fn test_artifact_accessors() {
        let artifact = CapturedArtifact::new(320, 440, ArtifactPayload::Bytes(vec![1, 2, 3]));
        assert_eq!((artifact.width(), artifact.height()), (320, 440));
        assert!(artifact.file_uri().is_none());

        let file = CapturedArtifact::new(320, 440, ArtifactPayload::TempFile("/tmp/x.png".into()));
        assert!(file.file_uri().is_some_and(|uri| uri.starts_with("file:///")));
    }

    #[tokio::test]
    async fn test_into_bytes_consumes_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("capture.png");
        tokio::fs::write(&path, b"png").await.expect("write");

        let artifact = CapturedArtifact::new(1, 1, ArtifactPayload::TempFile(path.clone()));
        assert_eq!(artifact.into_bytes().await.expect("bytes"), b"png");
        assert!(!path.exists());
    }

    #[test]
    fn test_runtime_target_serde() {
        let target: RuntimeTarget = serde_json::from_str("\"dom\"").expect("deserialize");
        assert_eq!(target, RuntimeTarget::Dom);
    }
}
