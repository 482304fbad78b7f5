//! Native capture: permission-gated temp file handed to the media library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sticker_core::ComposedScene;
use tokio::sync::watch;

use super::{ArtifactPayload, CaptureStrategy, CapturedArtifact, ExportReceipt, RuntimeTarget};
use crate::error::{CaptureError, ExportResult, PermissionError};
use crate::raster::SceneRasterizer;

/// Message shown after a native save succeeds.
pub const SAVED_CONFIRMATION: &str = "Saved!";

/// Media-library permission as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// The user has not been asked yet.
    #[default]
    Undetermined,
    /// Access granted.
    Granted,
    /// Access refused.
    Denied,
}

impl PermissionStatus {
    /// Map the status to the error an export should fail with, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::NotRequested`] or [`PermissionError::Denied`]
    /// unless the status is `Granted`.
    pub fn require_granted(self) -> Result<(), PermissionError> {
        match self {
            Self::Granted => Ok(()),
            Self::Undetermined => Err(PermissionError::NotRequested),
            Self::Denied => Err(PermissionError::Denied),
        }
    }
}

/// Reports the current media-library permission.
///
/// Requesting permission is the host's job; the strategy only reads it.
pub trait PermissionProvider: Send + Sync {
    /// Current permission status.
    fn status(&self) -> PermissionStatus;
}

impl PermissionProvider for PermissionStatus {
    fn status(&self) -> PermissionStatus {
        *self
    }
}

/// A host can publish permission changes through a watch channel.
impl PermissionProvider for watch::Receiver<PermissionStatus> {
    fn status(&self) -> PermissionStatus {
        *self.borrow()
    }
}

/// Persists captured images into the device's media library.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Save the PNG at `uri` (a `file://` URI) and return its library location.
    ///
    /// # Errors
    ///
    /// Returns an error if the asset cannot be saved.
    async fn save_to_library(&self, uri: &str) -> Result<String, CaptureError>;
}

/// A media library backed by a directory on disk.
///
/// Saved assets are moved out of the temp location.
#[derive(Debug, Clone)]
pub struct DirectoryMediaLibrary {
    dir: PathBuf,
}

impl DirectoryMediaLibrary {
    /// Create a library rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The library directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl MediaLibrary for DirectoryMediaLibrary {
    async fn save_to_library(&self, uri: &str) -> Result<String, CaptureError> {
        let source = crate::image::file_uri_to_path(uri)?;
        let name = source.file_name().ok_or_else(|| {
            CaptureError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("URI has no file name: {uri}"),
            ))
        })?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let dest = self.dir.join(name);
        tokio::fs::copy(&source, &dest).await?;
        if let Err(e) = tokio::fs::remove_file(&source).await {
            tracing::warn!("Failed to remove temp capture {}: {e}", source.display());
        }

        tracing::debug!("Saved {} to media library", dest.display());
        Ok(dest.display().to_string())
    }
}

/// Capture strategy for a native host.
///
/// Checks permission before any rendering, writes the capture to a
/// uniquely named temp file and saves it through the [`MediaLibrary`].
#[derive(Clone)]
pub struct NativeCapture {
    rasterizer: SceneRasterizer,
    permission: Arc<dyn PermissionProvider>,
    library: Arc<dyn MediaLibrary>,
    temp_dir: PathBuf,
}

impl std::fmt::Debug for NativeCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeCapture")
            .field("rasterizer", &self.rasterizer)
            .field("permission", &self.permission.status())
            .field("temp_dir", &self.temp_dir)
            .finish_non_exhaustive()
    }
}

impl NativeCapture {
    /// Create a native capture strategy.
    #[must_use]
    pub fn new(
        rasterizer: SceneRasterizer,
        permission: Arc<dyn PermissionProvider>,
        library: Arc<dyn MediaLibrary>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            rasterizer,
            permission,
            library,
            temp_dir: temp_dir.into(),
        }
    }

    /// Directory temp captures are written to.
    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }
}

#[async_trait]
impl CaptureStrategy for NativeCapture {
    fn target(&self) -> RuntimeTarget {
        RuntimeTarget::Native
    }

    async fn capture(&self, scene: &ComposedScene) -> ExportResult<CapturedArtifact> {
        self.permission.status().require_granted()?;

        let raster = self.rasterizer.rasterize(scene)?;
        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(CaptureError::from)?;
        let temp_dir = tokio::fs::canonicalize(&self.temp_dir)
            .await
            .map_err(CaptureError::from)?;
        let path = temp_dir.join(format!("{}.png", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, &raster.png)
            .await
            .map_err(CaptureError::from)?;

        tracing::debug!("Wrote temp capture {}", path.display());
        Ok(CapturedArtifact::new(
            raster.width,
            raster.height,
            ArtifactPayload::TempFile(path),
        ))
    }

    async fn deliver(&self, artifact: CapturedArtifact) -> ExportResult<ExportReceipt> {
        let uri = artifact.file_uri().ok_or_else(|| {
            CaptureError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Native capture has no file URI",
            ))
        })?;

        let location = match self.library.save_to_library(&uri).await {
            Ok(location) => location,
            Err(e) => {
                if let ArtifactPayload::TempFile(path) = artifact.payload() {
                    let _ = tokio::fs::remove_file(path).await;
                }
                return Err(e.into());
            }
        };

        Ok(ExportReceipt {
            target: RuntimeTarget::Native,
            location,
            width: artifact.width(),
            height: artifact.height(),
            confirmation: Some(SAVED_CONFIRMATION),
        })
    }
}
