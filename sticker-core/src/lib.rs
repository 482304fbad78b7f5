//! # Sticker Core
//!
//! Interactive transform engine for a single emoji sticker placed over a
//! background photo. Compiles to WASM for the web runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                sticker-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Gesture Recognizer  │  Transform State     │
//! │  - Double tap        │  - Scale             │
//! │  - Pan               │  - Translation       │
//! │                      │  - watch channel ────┼──┐
//! ├─────────────────────────────────────────────┤  │
//! │  Scene Composer  <───────────────────────────┼──┘
//! │  - Background + optional sticker            │
//! │  - Layout, hit regions, realization         │
//! ├─────────────────────────────────────────────┤
//! │  Spring  (rendered scale only)              │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod composer;
pub mod element;
pub mod error;
pub mod event;
pub mod gesture;
pub mod scene;
pub mod spring;
pub mod state;
pub mod transform;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use composer::SceneComposer;
pub use element::{ImageHandle, Rect, StickerId};
pub use error::{CoreError, CoreResult};
pub use event::{GestureEvent, TouchEvent, TouchPhase, TouchPoint};
pub use gesture::{GestureConfig, GestureRecognizer, HitRegions};
pub use scene::{
    compose, ComposedScene, ContentFit, ImageResolver, RealizedLayer, RealizedScene,
    ResolvedImage, StickerNode, BACKGROUND_CORNER_RADIUS, DEFAULT_IMAGE_SIZE, FRAME_HEIGHT,
    FRAME_WIDTH, STICKER_TOP_OFFSET,
};
pub use spring::{SpringConfig, SpringValue};
pub use state::{SessionConfig, StickerSession};
pub use transform::{StickerTransform, TransformState};

/// Sticker core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
