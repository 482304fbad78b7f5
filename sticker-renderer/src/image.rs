//! Image loading utilities.
//!
//! Resolves [`ImageHandle`]s from files, `file://` URIs, base64 or
//! percent-encoded data URIs, and raw bytes. Every resolved image is
//! normalized to PNG so the rasterizer only has to embed one format.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, Rgba, RgbaImage};
use sticker_core::{CoreError, CoreResult, ImageHandle, ImageResolver, ResolvedImage};
use url::Url;

/// Default upper bound on decoded image dimensions.
pub const DEFAULT_MAX_DIMENSION: u32 = 2048;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// GIF (first frame only).
    Gif,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // GIF: GIF8
        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }
}

fn resolution_error(message: impl Into<String>) -> CoreError {
    CoreError::ImageResolution(message.into())
}

/// Decode an image from raw bytes.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded.
pub fn decode_image(data: &[u8]) -> CoreResult<DynamicImage> {
    if ImageFormat::from_magic_bytes(data) == ImageFormat::Unknown {
        return Err(resolution_error("Unrecognized image format"));
    }
    image::load_from_memory(data)
        .map_err(|e| resolution_error(format!("Failed to decode image: {e}")))
}

/// Decode the payload of a data URI.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns an error if the data URI is malformed.
pub fn decode_data_uri(uri: &str) -> CoreResult<Vec<u8>> {
    let uri_data = uri
        .strip_prefix("data:")
        .ok_or_else(|| resolution_error("Not a data URI"))?;

    let (metadata, encoded_data) = uri_data
        .split_once(',')
        .ok_or_else(|| resolution_error("Invalid data URI: missing comma"))?;

    if metadata.contains(";base64") {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(encoded_data)
            .map_err(|e| resolution_error(format!("Failed to decode base64: {e}")))
    } else {
        percent_decode(encoded_data)
    }
}

/// Percent-decoding for data URI payloads.
fn percent_decode(input: &str) -> CoreResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| resolution_error("Invalid URL encoding"))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}

/// Convert a `file://` URI to a local path.
///
/// Only local URIs (no host, or `localhost`) are accepted.
///
/// # Errors
///
/// Returns an error if the URI does not parse, is not a `file://` URI or
/// names a remote host.
pub fn file_uri_to_path(uri: &str) -> CoreResult<PathBuf> {
    let url = Url::parse(uri).map_err(|e| resolution_error(format!("Invalid URI {uri}: {e}")))?;
    if url.scheme() != "file" {
        return Err(resolution_error(format!("Unsupported URI scheme: {uri}")));
    }
    url_to_path(&url).ok_or_else(|| resolution_error(format!("Not a local file URI: {uri}")))
}

/// Convert an absolute path to a `file://` URI. Returns `None` for relative
/// paths.
#[must_use]
pub fn path_to_file_uri(path: &Path) -> Option<String> {
    path_to_url(path).map(String::from)
}

#[cfg(not(target_arch = "wasm32"))]
fn url_to_path(url: &Url) -> Option<PathBuf> {
    url.to_file_path().ok()
}

#[cfg(target_arch = "wasm32")]
fn url_to_path(_url: &Url) -> Option<PathBuf> {
    None
}

#[cfg(not(target_arch = "wasm32"))]
fn path_to_url(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

#[cfg(target_arch = "wasm32")]
fn path_to_url(_path: &Path) -> Option<Url> {
    None
}

/// Scale an image down to fit within `max_dimension`, preserving aspect ratio.
///
/// Returns the image unchanged if it already fits.
#[must_use]
pub fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    if img.width() <= max_dimension && img.height() <= max_dimension {
        return img;
    }
    img.resize(
        max_dimension,
        max_dimension,
        image::imageops::FilterType::Lanczos3,
    )
}

/// Encode an image as PNG.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_png(img: &DynamicImage) -> CoreResult<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| resolution_error(format!("PNG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Create the placeholder background: a dark vertical gradient with a
/// lighter checkerboard, so an empty frame is visibly a frame.
#[must_use]
pub fn create_placeholder(width: u32, height: u32) -> RgbaImage {
    let cell_size = 20u32;
    let span = height.max(1);

    RgbaImage::from_fn(width, height, |x, y| {
        let is_light = ((x / cell_size) + (y / cell_size)) % 2 == 0;
        // 0x25 -> 0x45 from top to bottom
        #[allow(clippy::cast_possible_truncation)]
        let shade = 0x25 + ((y * 0x20) / span) as u8;
        let lift = if is_light { 12 } else { 0 };
        Rgba([shade + lift, shade + lift + 4, shade + lift + 9, 255])
    })
}

/// Resolves handles from the local filesystem and in-memory data.
#[derive(Debug, Clone)]
pub struct DefaultImageResolver {
    base_dir: Option<PathBuf>,
    max_dimension: u32,
    placeholder: ResolvedImage,
}

impl DefaultImageResolver {
    /// Create a resolver with a 320x440 placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error if the placeholder cannot be encoded.
    pub fn new() -> CoreResult<Self> {
        let placeholder = DynamicImage::ImageRgba8(create_placeholder(320, 440));
        Ok(Self {
            base_dir: None,
            max_dimension: DEFAULT_MAX_DIMENSION,
            placeholder: ResolvedImage {
                width: placeholder.width(),
                height: placeholder.height(),
                png: Arc::from(encode_png(&placeholder)?),
            },
        })
    }

    /// Resolve relative file paths against `base_dir`.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Limit decoded image dimensions.
    #[must_use]
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    fn read_file(&self, path: &Path) -> CoreResult<Vec<u8>> {
        let full = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        std::fs::read(&full)
            .map_err(|e| resolution_error(format!("Failed to read {}: {e}", full.display())))
    }

    fn load(&self, bytes: &[u8]) -> CoreResult<ResolvedImage> {
        let decoded = decode_image(bytes)?;
        let fits = decoded.width() <= self.max_dimension && decoded.height() <= self.max_dimension;
        let img = fit_within(decoded, self.max_dimension);
        // PNG input that needed no downscaling is embedded as-is.
        let png = if fits && ImageFormat::from_magic_bytes(bytes) == ImageFormat::Png {
            bytes.to_vec()
        } else {
            encode_png(&img)?
        };
        Ok(ResolvedImage {
            width: img.width(),
            height: img.height(),
            png: Arc::from(png),
        })
    }
}

impl ImageResolver for DefaultImageResolver {
    fn resolve(&self, handle: &ImageHandle) -> CoreResult<ResolvedImage> {
        match handle {
            ImageHandle::Placeholder => Ok(self.placeholder.clone()),
            ImageHandle::Bytes(bytes) => self.load(bytes),
            ImageHandle::File(path) => self.load(&self.read_file(path)?),
            ImageHandle::Uri(uri) if uri.starts_with("data:") => self.load(&decode_data_uri(uri)?),
            ImageHandle::Uri(uri) => {
                let path = file_uri_to_path(uri)?;
                self.load(&self.read_file(&path)?)
            }
        }
    }
}
