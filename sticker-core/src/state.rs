//! Sticker session state.
//!
//! [`StickerSession`] owns the single active sticker: its transform, the
//! gesture recognizer feeding it, the spring animating its rendered size, and
//! the composer that turns all of it into a [`ComposedScene`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    ComposedScene, CoreError, CoreResult, GestureConfig, GestureEvent, GestureRecognizer,
    ImageHandle, SceneComposer, SpringConfig, SpringValue, StickerId, StickerTransform,
    TouchEvent, TransformState, DEFAULT_IMAGE_SIZE,
};

/// Tunables for a sticker session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base edge length of a freshly placed sticker.
    pub image_size: f32,
    /// Gesture thresholds.
    pub gesture: GestureConfig,
    /// Spring used for the rendered size.
    pub spring: SpringConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            gesture: GestureConfig::default(),
            spring: SpringConfig::default(),
        }
    }
}

#[derive(Debug)]
struct ActiveSticker {
    id: StickerId,
    transform: TransformState,
    rendered_scale: SpringValue,
}

/// One editing session with at most one sticker.
#[derive(Debug)]
pub struct StickerSession {
    config: SessionConfig,
    sticker: Option<ActiveSticker>,
    recognizer: GestureRecognizer,
    composer: SceneComposer,
}

impl StickerSession {
    /// Create a session showing the placeholder background.
    ///
    /// # Errors
    ///
    /// Returns an error if `config.image_size` is not a positive finite number.
    pub fn new(config: SessionConfig) -> CoreResult<Self> {
        if !(config.image_size.is_finite() && config.image_size > 0.0) {
            return Err(CoreError::InvalidTransform(format!(
                "image size must be positive and finite, got {}",
                config.image_size
            )));
        }
        let recognizer = GestureRecognizer::with_config(config.gesture.clone());
        Ok(Self {
            config,
            sticker: None,
            recognizer,
            composer: SceneComposer::new(),
        })
    }

    /// Get the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Show the picked photo, or the placeholder when the picker was cancelled.
    pub fn select_background(&mut self, background: Option<ImageHandle>) {
        match &background {
            Some(handle) => tracing::debug!("Background selected: {handle}"),
            None => tracing::debug!("No background selected, using placeholder"),
        }
        self.composer.set_background(background);
    }

    /// Show the chosen emoji.
    ///
    /// The first selection places a new sticker at the base size. Later
    /// selections swap the image in place and keep the current transform.
    ///
    /// # Errors
    ///
    /// Returns an error if a new transform cannot be created.
    pub fn select_sticker(&mut self, image: ImageHandle) -> CoreResult<StickerId> {
        if let Some(active) = &self.sticker {
            tracing::debug!("Sticker {} image replaced with {image}", active.id);
            self.composer.replace_sticker_image(image);
            return Ok(active.id);
        }

        let transform = TransformState::new(self.config.image_size)?;
        let id = StickerId::new();
        self.composer.attach_sticker(id, image, transform.subscribe());
        self.sticker = Some(ActiveSticker {
            id,
            rendered_scale: SpringValue::with_config(self.config.image_size, self.config.spring),
            transform,
        });
        tracing::debug!("Sticker {id} placed");
        Ok(id)
    }

    /// Remove the sticker, discarding its transform.
    pub fn clear_sticker(&mut self) {
        if let Some(active) = self.sticker.take() {
            tracing::debug!("Sticker {} removed", active.id);
        }
        self.recognizer.reset();
        self.composer.detach_sticker();
    }

    /// Transform state of the active sticker.
    #[must_use]
    pub fn transform_state(&self) -> Option<&TransformState> {
        self.sticker.as_ref().map(|s| &s.transform)
    }

    /// Logical transform of the active sticker.
    #[must_use]
    pub fn transform(&self) -> Option<StickerTransform> {
        self.transform_state().map(TransformState::current)
    }

    /// Feed raw touch input. Returns the gestures it produced, already applied.
    pub fn handle_touch(&mut self, event: &TouchEvent) -> Vec<GestureEvent> {
        self.composer.refresh();
        let Some(regions) = self.composer.scene().hit_regions() else {
            return Vec::new();
        };
        let gestures = self.recognizer.process(event, &regions);
        for gesture in &gestures {
            self.apply(*gesture);
        }
        gestures
    }

    /// Apply a gesture to the active sticker. Returns whether anything changed.
    pub fn apply(&mut self, gesture: GestureEvent) -> bool {
        let Some(active) = self.sticker.as_mut() else {
            tracing::trace!("Gesture {gesture:?} ignored, no sticker");
            return false;
        };
        let changed = active.transform.apply(gesture);
        if changed {
            active.rendered_scale.set_target(active.transform.current().scale);
            self.composer.refresh();
        }
        changed
    }

    /// Advance the size animation. Returns the rendered scale.
    pub fn tick(&mut self, dt: Duration) -> Option<f32> {
        let active = self.sticker.as_mut()?;
        active.rendered_scale.set_target(active.transform.current().scale);
        Some(active.rendered_scale.step(dt))
    }

    /// Sticker size as currently drawn on screen, mid-animation included.
    #[must_use]
    pub fn rendered_scale(&self) -> Option<f32> {
        self.sticker.as_ref().map(|s| s.rendered_scale.value())
    }

    /// The current scene, recomposed first if the transform moved.
    pub fn scene(&mut self) -> &ComposedScene {
        self.composer.refresh();
        self.composer.scene()
    }

    /// An owned snapshot of the current scene, for export.
    pub fn snapshot(&mut self) -> ComposedScene {
        self.scene().clone()
    }
}
