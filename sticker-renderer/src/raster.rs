//! Scene rasterization.
//!
//! Renders a [`RealizedScene`] to PNG using an SVG intermediate
//! representation and the resvg/tiny-skia rasterization pipeline.

use std::fmt::Write;
use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};
use sticker_core::{ComposedScene, ContentFit, ImageResolver, RealizedLayer, RealizedScene};

use crate::error::CaptureError;

/// Size and quality of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Output width in pixels. `None` infers it from the frame aspect ratio.
    pub width: Option<u32>,
    /// Output height in pixels.
    pub height: u32,
    /// Quality in `(0, 1]`. PNG output is lossless at any quality.
    pub quality: f32,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::dom()
    }
}

impl CaptureOptions {
    /// Fixed 320x440 at maximum quality, as used by the DOM runtime.
    #[must_use]
    pub const fn dom() -> Self {
        Self {
            width: Some(320),
            height: 440,
            quality: 1.0,
        }
    }

    /// Height 440 with inferred width at maximum quality, as used natively.
    #[must_use]
    pub const fn native() -> Self {
        Self {
            width: None,
            height: 440,
            quality: 1.0,
        }
    }

    /// Check that the options describe a drawable image.
    ///
    /// # Errors
    ///
    /// Returns an error for zero dimensions or quality outside `(0, 1]`.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.height == 0 || self.width == Some(0) {
            return Err(CaptureError::InvalidOptions(
                "capture dimensions must be non-zero".to_string(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(CaptureError::InvalidOptions(format!(
                "quality must be in (0, 1], got {}",
                self.quality
            )));
        }
        Ok(())
    }

    /// Parse and validate options from JSON. Missing fields take the DOM defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the options are invalid.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| CaptureError::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Output dimensions (width, height) in pixels for a frame.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn output_dimensions(&self, frame_width: f32, frame_height: f32) -> (u32, u32) {
        let width = self.width.unwrap_or_else(|| {
            let aspect = frame_width / frame_height.max(f32::EPSILON);
            (self.height as f32 * aspect).round().max(1.0) as u32
        });
        (width, self.height)
    }
}

/// A rasterized PNG with its pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// PNG bytes.
    pub png: Vec<u8>,
}

/// Turns composed scenes into PNG images.
#[derive(Clone)]
pub struct SceneRasterizer {
    resolver: Arc<dyn ImageResolver>,
    options: CaptureOptions,
}

impl std::fmt::Debug for SceneRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRasterizer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SceneRasterizer {
    /// Create a rasterizer.
    ///
    /// # Errors
    ///
    /// Returns an error if `options` are invalid.
    pub fn new(
        resolver: Arc<dyn ImageResolver>,
        options: CaptureOptions,
    ) -> Result<Self, CaptureError> {
        options.validate()?;
        Ok(Self { resolver, options })
    }

    /// Get the capture options.
    #[must_use]
    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Resolve, lay out and rasterize a composed scene.
    ///
    /// # Errors
    ///
    /// Returns an error if the placeholder cannot be resolved or rendering fails.
    pub fn rasterize(&self, scene: &ComposedScene) -> Result<RasterImage, CaptureError> {
        let realized = scene.realize(self.resolver.as_ref())?;
        self.rasterize_realized(&realized)
    }

    /// Rasterize an already realized scene.
    ///
    /// # Errors
    ///
    /// Returns an error if SVG parsing, rasterization or encoding fails.
    pub fn rasterize_realized(&self, scene: &RealizedScene) -> Result<RasterImage, CaptureError> {
        let (width, height) = self.options.output_dimensions(scene.width, scene.height);
        let svg = render_to_svg(scene, width, height);
        let pixmap = rasterize_svg(&svg, width, height)?;
        let png = pixmap
            .encode_png()
            .map_err(|e| CaptureError::Encode(format!("PNG encoding failed: {e}")))?;

        tracing::debug!("Rasterized scene to {width}x{height} ({} bytes)", png.len());
        Ok(RasterImage { width, height, png })
    }
}

/// Render a realized scene to an SVG document of the given pixel size.
///
/// The view box is always the logical frame, so output size never changes
/// the composition.
#[must_use]
pub fn render_to_svg(scene: &RealizedScene, width: u32, height: u32) -> String {
    let mut svg = String::with_capacity(
        4096 + scene.background.image.png.len() * 4 / 3
            + scene.sticker.as_ref().map_or(0, |s| s.image.png.len() * 4 / 3),
    );
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {} {}\" preserveAspectRatio=\"none\">",
        scene.width, scene.height,
    );

    let bg = &scene.background;
    if bg.corner_radius > 0.0 {
        let _ = write!(
            svg,
            "<defs><clipPath id=\"frame\"><rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{r}\" ry=\"{r}\"/></clipPath></defs>",
            bg.rect.x,
            bg.rect.y,
            bg.rect.width,
            bg.rect.height,
            r = bg.corner_radius,
        );
        svg.push_str("<g clip-path=\"url(#frame)\">");
        render_layer_svg(&mut svg, bg);
        svg.push_str("</g>");
    } else {
        render_layer_svg(&mut svg, bg);
    }

    if let Some(sticker) = &scene.sticker {
        render_layer_svg(&mut svg, sticker);
    }

    svg.push_str("</svg>");
    svg
}

/// Render a single image layer to SVG.
fn render_layer_svg(svg: &mut String, layer: &RealizedLayer) {
    let aspect = match layer.fit {
        ContentFit::Cover => "xMidYMid slice",
        ContentFit::Contain => "xMidYMid meet",
    };
    let data = base64::engine::general_purpose::STANDARD.encode(&layer.image.png);
    let _ = write!(
        svg,
        "<image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"{aspect}\" href=\"data:image/png;base64,{data}\"/>",
        layer.rect.x, layer.rect.y, layer.rect.width, layer.rect.height,
    );
}

/// Rasterize an SVG string to a tiny-skia Pixmap of exactly `width` x `height`.
#[allow(clippy::cast_precision_loss)]
fn rasterize_svg(svg: &str, width: u32, height: u32) -> Result<tiny_skia::Pixmap, CaptureError> {
    let opt = usvg::Options::default();
    let tree = usvg::Tree::from_str(svg, &opt)
        .map_err(|e| CaptureError::Rasterize(format!("SVG parsing failed: {e}")))?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CaptureError::Rasterize("Failed to create pixmap".to_string()))?;

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(pixmap)
}
