//! Browser capture: rasterize to PNG bytes and trigger a download.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sticker_core::ComposedScene;
use tokio::io::AsyncWriteExt;

use super::{ArtifactPayload, CaptureStrategy, CapturedArtifact, ExportReceipt, RuntimeTarget};
use crate::error::{CaptureError, ExportResult};
use crate::raster::SceneRasterizer;

/// File name offered for browser downloads.
pub const DOWNLOAD_FILENAME: &str = "image.png";

/// Receives a finished download.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Save `bytes` under `filename` and return where it went.
    ///
    /// # Errors
    ///
    /// Returns an error if the download could not be started or written.
    async fn download(&self, filename: &str, bytes: Vec<u8>) -> Result<String, CaptureError>;
}

/// A download sink that writes into a directory, the way a browser's
/// downloads folder does.
///
/// Existing files are never overwritten; a second `image.png` becomes
/// `image (1).png`.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    /// Create a sink for `dir`. The directory is created on first download.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the first free name in the browser's `name (n).ext` sequence.
    async fn create_unique(
        &self,
        filename: &str,
    ) -> Result<(PathBuf, tokio::fs::File), CaptureError> {
        let path = Path::new(filename);
        let stem = path
            .file_stem()
            .map_or_else(|| filename.to_string(), |s| s.to_string_lossy().into_owned());
        let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

        let mut n = 0u32;
        loop {
            let name = match (n, &ext) {
                (0, _) => filename.to_string(),
                (_, Some(ext)) => format!("{stem} ({n}).{ext}"),
                (_, None) => format!("{stem} ({n})"),
            };
            let candidate = self.dir.join(name);
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => n += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn download(&self, filename: &str, bytes: Vec<u8>) -> Result<String, CaptureError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let (path, mut file) = self.create_unique(filename).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        tracing::debug!("Wrote download {} ({} bytes)", path.display(), bytes.len());
        Ok(path.display().to_string())
    }
}

/// Triggers a real browser download through an object URL and a
/// temporary anchor element.
#[cfg(feature = "wasm")]
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserDownload;

#[cfg(feature = "wasm")]
impl BrowserDownload {
    fn trigger(filename: &str, bytes: &[u8]) -> Result<String, CaptureError> {
        use wasm_bindgen::JsCast;

        let js_err = |e: wasm_bindgen::JsValue| CaptureError::Encode(format!("{e:?}"));

        let window = web_sys::window()
            .ok_or_else(|| CaptureError::Encode("No window available".to_string()))?;
        let document = window
            .document()
            .ok_or_else(|| CaptureError::Encode("No document available".to_string()))?;

        let array = js_sys::Uint8Array::from(bytes);
        let parts = js_sys::Array::new();
        parts.push(&array.buffer());

        let options = web_sys::BlobPropertyBag::new();
        options.set_type("image/png");
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)
            .map_err(js_err)?;
        let url = web_sys::Url::create_object_url_with_blob(&blob).map_err(js_err)?;

        let anchor = document
            .create_element("a")
            .map_err(js_err)?
            .dyn_into::<web_sys::HtmlAnchorElement>()
            .map_err(|_| CaptureError::Encode("Anchor element cast failed".to_string()))?;
        anchor.set_href(&url);
        anchor.set_download(filename);
        anchor.click();

        web_sys::Url::revoke_object_url(&url).map_err(js_err)?;
        Ok(filename.to_string())
    }
}

#[cfg(feature = "wasm")]
#[async_trait]
impl DownloadSink for BrowserDownload {
    async fn download(&self, filename: &str, bytes: Vec<u8>) -> Result<String, CaptureError> {
        Self::trigger(filename, &bytes)
    }
}

/// Capture strategy for a DOM host.
///
/// Produces a fixed-size PNG in memory and hands it to a [`DownloadSink`].
/// No permission is involved.
#[derive(Clone)]
pub struct DomCapture {
    rasterizer: SceneRasterizer,
    sink: Arc<dyn DownloadSink>,
}

impl std::fmt::Debug for DomCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomCapture")
            .field("rasterizer", &self.rasterizer)
            .finish_non_exhaustive()
    }
}

impl DomCapture {
    /// Create a DOM capture strategy.
    #[must_use]
    pub fn new(rasterizer: SceneRasterizer, sink: Arc<dyn DownloadSink>) -> Self {
        Self { rasterizer, sink }
    }
}

#[async_trait]
impl CaptureStrategy for DomCapture {
    fn target(&self) -> RuntimeTarget {
        RuntimeTarget::Dom
    }

    async fn capture(&self, scene: &ComposedScene) -> ExportResult<CapturedArtifact> {
        let raster = self.rasterizer.rasterize(scene)?;
        Ok(CapturedArtifact::new(
            raster.width,
            raster.height,
            ArtifactPayload::Bytes(raster.png),
        ))
    }

    async fn deliver(&self, artifact: CapturedArtifact) -> ExportResult<ExportReceipt> {
        let (width, height) = (artifact.width(), artifact.height());
        let bytes = artifact.into_bytes().await?;
        let location = self.sink.download(DOWNLOAD_FILENAME, bytes).await?;
        Ok(ExportReceipt {
            target: RuntimeTarget::Dom,
            location,
            width,
            height,
            confirmation: None,
        })
    }
}
