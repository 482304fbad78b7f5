//! Sticker transform state.
//!
//! [`TransformState`] owns the logical scale and translation of the single
//! active sticker. Every mutation is published on a [`tokio::sync::watch`]
//! channel so the scene composer (and anything else that cares) can recompute
//! without the state knowing who is listening.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{CoreError, CoreResult, GestureEvent};

/// Scale and translation of the sticker, in logical units.
///
/// Deserialization applies the same checks as construction, so a decoded
/// transform always has a positive finite scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTransform")]
pub struct StickerTransform {
    /// Rendered edge length of the (square) sticker. Starts at the base size.
    pub scale: f32,
    /// Horizontal offset from the sticker's flow position.
    pub translate_x: f32,
    /// Vertical offset from the sticker's flow position.
    pub translate_y: f32,
}

impl StickerTransform {
    /// Create a transform at the given base size with no translation.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_size` is not a positive finite number.
    pub fn new(base_size: f32) -> CoreResult<Self> {
        validate_scale(base_size)?;
        Ok(Self {
            scale: base_size,
            translate_x: 0.0,
            translate_y: 0.0,
        })
    }

    /// Set the translation.
    #[must_use]
    pub fn with_translation(mut self, translate_x: f32, translate_y: f32) -> Self {
        self.translate_x = translate_x;
        self.translate_y = translate_y;
        self
    }
}

#[derive(Deserialize)]
struct RawTransform {
    scale: f32,
    translate_x: f32,
    translate_y: f32,
}

impl TryFrom<RawTransform> for StickerTransform {
    type Error = CoreError;

    fn try_from(raw: RawTransform) -> CoreResult<Self> {
        validate_scale(raw.scale)?;
        if !(raw.translate_x.is_finite() && raw.translate_y.is_finite()) {
            return Err(CoreError::InvalidTransform(format!(
                "translation must be finite, got ({}, {})",
                raw.translate_x, raw.translate_y
            )));
        }
        Ok(Self {
            scale: raw.scale,
            translate_x: raw.translate_x,
            translate_y: raw.translate_y,
        })
    }
}

fn validate_scale(scale: f32) -> CoreResult<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidTransform(format!(
            "scale must be positive and finite, got {scale}"
        )))
    }
}

/// Gesture-driven transform of the active sticker.
#[derive(Debug)]
pub struct TransformState {
    image_size: f32,
    current: watch::Sender<StickerTransform>,
}

impl TransformState {
    /// Create state for a sticker with the given base size.
    ///
    /// # Errors
    ///
    /// Returns an error if `image_size` is not a positive finite number.
    pub fn new(image_size: f32) -> CoreResult<Self> {
        let initial = StickerTransform::new(image_size)?;
        let (current, _) = watch::channel(initial);
        Ok(Self {
            image_size,
            current,
        })
    }

    /// The base size the sticker was created with.
    #[must_use]
    pub fn image_size(&self) -> f32 {
        self.image_size
    }

    /// Snapshot of the current transform.
    #[must_use]
    pub fn current(&self) -> StickerTransform {
        *self.current.borrow()
    }

    /// Subscribe to transform changes.
    ///
    /// The receiver starts with the current value marked as seen.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StickerTransform> {
        self.current.subscribe()
    }

    /// Apply a recognized gesture. Returns whether the transform changed.
    pub fn apply(&self, gesture: GestureEvent) -> bool {
        match gesture {
            GestureEvent::DoubleTap => self.apply_double_tap(),
            GestureEvent::PanChange { delta_x, delta_y } => self.apply_pan(delta_x, delta_y),
        }
    }

    /// Double the scale unless it already equals twice the base size.
    ///
    /// The guard is an equality test against `image_size * 2`, so a scale set
    /// externally to some other value grows again on the next double tap.
    #[allow(clippy::float_cmp)]
    pub fn apply_double_tap(&self) -> bool {
        let target = self.image_size * 2.0;
        self.current.send_if_modified(|t| {
            if t.scale == target {
                return false;
            }
            let doubled = t.scale * 2.0;
            if !doubled.is_finite() {
                tracing::warn!("Double tap ignored: scale {} would overflow", t.scale);
                return false;
            }
            tracing::debug!("Double tap: scale {} -> {}", t.scale, doubled);
            t.scale = doubled;
            true
        })
    }

    /// Accumulate a drag delta. No clamping: the sticker may leave the frame.
    pub fn apply_pan(&self, delta_x: f32, delta_y: f32) -> bool {
        if !delta_x.is_finite() || !delta_y.is_finite() {
            tracing::warn!("Ignoring non-finite pan delta ({delta_x}, {delta_y})");
            return false;
        }
        self.current.send_if_modified(|t| {
            t.translate_x += delta_x;
            t.translate_y += delta_y;
            delta_x != 0.0 || delta_y != 0.0
        })
    }

    /// Set the scale directly.
    ///
    /// # Errors
    ///
    /// Returns an error if `scale` is not a positive finite number.
    #[allow(clippy::float_cmp)]
    pub fn set_scale(&self, scale: f32) -> CoreResult<()> {
        validate_scale(scale)?;
        self.current.send_if_modified(|t| {
            let changed = t.scale != scale;
            t.scale = scale;
            changed
        });
        Ok(())
    }
}
