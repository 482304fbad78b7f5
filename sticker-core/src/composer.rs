//! Keeps a [`ComposedScene`] in step with its inputs.
//!
//! The composer listens on the transform channel published by
//! [`TransformState`](crate::TransformState) and recomposes on receipt.
//! Background and sticker-image changes recompose immediately.

use tokio::sync::watch;

use crate::{compose, ComposedScene, ImageHandle, StickerId, StickerNode, StickerTransform};

#[derive(Debug)]
struct StickerSource {
    id: StickerId,
    image: ImageHandle,
    transform: watch::Receiver<StickerTransform>,
}

/// Recomputes the scene whenever background, sticker or transform changes.
#[derive(Debug, Default)]
pub struct SceneComposer {
    background: Option<ImageHandle>,
    sticker: Option<StickerSource>,
    scene: ComposedScene,
    revision: u64,
}

impl SceneComposer {
    /// Create a composer showing the placeholder background.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently composed scene.
    #[must_use]
    pub fn scene(&self) -> &ComposedScene {
        &self.scene
    }

    /// Number of times the scene has been recomposed.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the background. `None` shows the placeholder.
    pub fn set_background(&mut self, background: Option<ImageHandle>) {
        self.background = background;
        self.recompose();
    }

    /// Show a sticker whose transform is published on `transform`.
    pub fn attach_sticker(
        &mut self,
        id: StickerId,
        image: ImageHandle,
        transform: watch::Receiver<StickerTransform>,
    ) {
        self.sticker = Some(StickerSource {
            id,
            image,
            transform,
        });
        self.recompose();
    }

    /// Swap the sticker image, keeping the live transform.
    ///
    /// Returns `false` if no sticker is attached.
    pub fn replace_sticker_image(&mut self, image: ImageHandle) -> bool {
        let Some(source) = self.sticker.as_mut() else {
            return false;
        };
        source.image = image;
        self.recompose();
        true
    }

    /// Remove the sticker from the scene.
    pub fn detach_sticker(&mut self) {
        if self.sticker.take().is_some() {
            self.recompose();
        }
    }

    /// Recompose if a transform update has arrived. Returns whether it did.
    pub fn refresh(&mut self) -> bool {
        let changed = self
            .sticker
            .as_ref()
            .is_some_and(|s| s.transform.has_changed().unwrap_or(false));
        if changed {
            self.recompose();
        }
        changed
    }

    fn recompose(&mut self) {
        let sticker = self.sticker.as_mut().map(|source| {
            let transform = *source.transform.borrow_and_update();
            StickerNode::new(source.id, source.image.clone(), transform)
        });
        self.scene = compose(self.background.clone(), sticker);
        self.revision += 1;
        tracing::trace!("Scene recomposed (revision {})", self.revision);
    }
}
