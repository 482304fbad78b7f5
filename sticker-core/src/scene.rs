//! The composed scene: background photo plus optional sticker.
//!
//! [`compose`] is a pure function of its inputs. The resulting
//! [`ComposedScene`] is an immutable value that is replaced, never edited,
//! whenever the background, the sticker image, or the transform changes.
//!
//! ## Layout
//!
//! ```text
//! (0,0) ┌──────────────┐
//!       │  background  │ 320 x 440, cover, rounded corners
//!       │   ┌──┐       │
//!       │   └──┘ <─────┼── sticker: flow origin (0, 440) + (tx, ty - 300)
//!       │              │
//!       └──────────────┘
//!       (0,440) = sticker flow origin
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, HitRegions, ImageHandle, Rect, StickerId, StickerTransform};

/// Width of the display frame in logical units.
pub const FRAME_WIDTH: f32 = 320.0;
/// Height of the display frame in logical units.
pub const FRAME_HEIGHT: f32 = 440.0;
/// Vertical offset applied to the sticker wrapper from its flow position.
pub const STICKER_TOP_OFFSET: f32 = -300.0;
/// Corner radius of the background frame.
pub const BACKGROUND_CORNER_RADIUS: f32 = 18.0;
/// Base sticker size used by the application.
pub const DEFAULT_IMAGE_SIZE: f32 = 40.0;

/// The sticker subtree of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickerNode {
    /// Identity of the sticker instance.
    pub id: StickerId,
    /// Emoji image.
    pub image: ImageHandle,
    /// Logical transform at the time the scene was composed.
    pub transform: StickerTransform,
}

impl StickerNode {
    /// Create a sticker node.
    #[must_use]
    pub fn new(id: StickerId, image: ImageHandle, transform: StickerTransform) -> Self {
        Self {
            id,
            image,
            transform,
        }
    }

    /// Offset of the sticker relative to its container's flow position.
    #[must_use]
    pub fn offset(&self) -> (f32, f32) {
        (
            self.transform.translate_x,
            self.transform.translate_y + STICKER_TOP_OFFSET,
        )
    }

    /// Edge length of the rendered sticker.
    #[must_use]
    pub fn size(&self) -> f32 {
        self.transform.scale
    }

    /// The sticker's square in frame coordinates.
    #[must_use]
    pub fn frame_rect(&self) -> Rect {
        let (dx, dy) = self.offset();
        let size = self.size();
        Rect::new(dx, FRAME_HEIGHT + dy, size, size)
    }

    /// Gesture hit regions for this sticker.
    ///
    /// The wrapper spans the container width, like a block-level view, and
    /// moves with the translation; the image is the sticker square.
    #[must_use]
    pub fn hit_regions(&self) -> HitRegions {
        let image = self.frame_rect();
        HitRegions {
            wrapper: Rect::new(image.x, image.y, FRAME_WIDTH.max(image.width), image.height),
            image,
        }
    }
}

/// Logical tree of background and optional sticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedScene {
    background: ImageHandle,
    sticker: Option<StickerNode>,
}

/// Compose a scene from the picked background and the active sticker.
///
/// A missing background falls back to the placeholder image.
#[must_use]
pub fn compose(background: Option<ImageHandle>, sticker: Option<StickerNode>) -> ComposedScene {
    ComposedScene {
        background: background.unwrap_or(ImageHandle::Placeholder),
        sticker,
    }
}

impl Default for ComposedScene {
    fn default() -> Self {
        compose(None, None)
    }
}

impl ComposedScene {
    /// The background image.
    #[must_use]
    pub fn background(&self) -> &ImageHandle {
        &self.background
    }

    /// The sticker node, if one has been picked.
    #[must_use]
    pub fn sticker(&self) -> Option<&StickerNode> {
        self.sticker.as_ref()
    }

    /// Whether a sticker is shown.
    #[must_use]
    pub fn has_sticker(&self) -> bool {
        self.sticker.is_some()
    }

    /// The display frame, which is also the capture area.
    #[must_use]
    pub fn frame(&self) -> Rect {
        Rect::new(0.0, 0.0, FRAME_WIDTH, FRAME_HEIGHT)
    }

    /// Sticker offset from its flow position, if a sticker is shown.
    #[must_use]
    pub fn sticker_offset(&self) -> Option<(f32, f32)> {
        self.sticker.as_ref().map(StickerNode::offset)
    }

    /// Sticker square in frame coordinates, if a sticker is shown.
    #[must_use]
    pub fn sticker_frame_rect(&self) -> Option<Rect> {
        self.sticker.as_ref().map(StickerNode::frame_rect)
    }

    /// Gesture hit regions, if a sticker is shown.
    #[must_use]
    pub fn hit_regions(&self) -> Option<HitRegions> {
        self.sticker.as_ref().map(StickerNode::hit_regions)
    }

    /// Serialize the scene to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(CoreError::Serialization)
    }

    /// Deserialize a scene from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(CoreError::Serialization)
    }

    /// Resolve images and lay the scene out for capture.
    ///
    /// A sticker whose image cannot be resolved is left out. A background that
    /// cannot be resolved is replaced by the placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error only if the placeholder itself cannot be resolved.
    pub fn realize(&self, resolver: &dyn ImageResolver) -> CoreResult<RealizedScene> {
        let background_image = match resolver.resolve(&self.background) {
            Ok(image) => image,
            Err(e) if !self.background.is_placeholder() => {
                tracing::warn!(
                    "Background {} unavailable, using placeholder: {e}",
                    self.background
                );
                resolver.resolve(&ImageHandle::Placeholder)?
            }
            Err(e) => return Err(e),
        };

        let sticker = self.sticker.as_ref().and_then(|node| {
            match resolver.resolve(&node.image) {
                Ok(image) => Some(RealizedLayer {
                    image,
                    rect: node.frame_rect(),
                    fit: ContentFit::Contain,
                    corner_radius: 0.0,
                }),
                Err(e) => {
                    tracing::warn!("Sticker {} unavailable, rendering without it: {e}", node.id);
                    None
                }
            }
        });

        Ok(RealizedScene {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            background: RealizedLayer {
                image: background_image,
                rect: self.frame(),
                fit: ContentFit::Cover,
                corner_radius: BACKGROUND_CORNER_RADIUS,
            },
            sticker,
        })
    }
}

/// Resolves [`ImageHandle`]s to decoded, re-encoded image data.
///
/// Implementations must always resolve [`ImageHandle::Placeholder`].
pub trait ImageResolver: Send + Sync {
    /// Resolve a handle.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ImageResolution`] if the image cannot be loaded.
    fn resolve(&self, handle: &ImageHandle) -> CoreResult<ResolvedImage>;
}

/// Image data ready to be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Intrinsic width in pixels.
    pub width: u32,
    /// Intrinsic height in pixels.
    pub height: u32,
    /// PNG-encoded pixels.
    pub png: Arc<[u8]>,
}

/// How an image fills its layout rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFit {
    /// Scale to cover the rect, cropping overflow.
    Cover,
    /// Scale to fit inside the rect, letterboxing.
    Contain,
}

/// One drawable layer of a realized scene.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedLayer {
    /// Resolved image.
    pub image: ResolvedImage,
    /// Layout rect in frame coordinates.
    pub rect: Rect,
    /// Fit mode.
    pub fit: ContentFit,
    /// Corner clip radius (0 for none).
    pub corner_radius: f32,
}

/// A scene with images resolved and layout computed: the capture source.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedScene {
    /// Frame width in logical units.
    pub width: f32,
    /// Frame height in logical units.
    pub height: f32,
    /// Background layer, always present.
    pub background: RealizedLayer,
    /// Sticker layer, drawn above the background.
    pub sticker: Option<RealizedLayer>,
}
