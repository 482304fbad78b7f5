//! WebAssembly bindings for sticker-core.
//!
//! This module provides JavaScript-callable functions when compiled to WASM.

use std::time::Duration;

use wasm_bindgen::prelude::*;

use crate::{
    GestureEvent, ImageHandle, SessionConfig, StickerSession, TouchEvent, DEFAULT_IMAGE_SIZE,
};

/// Initialize the sticker WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();
}

/// Sticker session instance for WASM.
#[wasm_bindgen]
pub struct WasmSticker {
    session: StickerSession,
}

#[wasm_bindgen]
impl WasmSticker {
    /// Create a session whose stickers start at `image_size` logical units.
    ///
    /// # Errors
    ///
    /// Returns an error string if `image_size` is not positive.
    #[wasm_bindgen(constructor)]
    pub fn new(image_size: Option<f32>) -> Result<WasmSticker, String> {
        let config = SessionConfig {
            image_size: image_size.unwrap_or(DEFAULT_IMAGE_SIZE),
            ..SessionConfig::default()
        };
        let session = StickerSession::new(config).map_err(|e| e.to_string())?;
        Ok(Self { session })
    }

    /// Set the background URI, or clear it to show the placeholder.
    #[wasm_bindgen(js_name = selectBackground)]
    pub fn select_background(&mut self, uri: Option<String>) {
        self.session.select_background(uri.map(ImageHandle::Uri));
    }

    /// Show or swap the sticker image.
    ///
    /// # Errors
    ///
    /// Returns an error string if the sticker cannot be placed.
    #[wasm_bindgen(js_name = selectSticker)]
    pub fn select_sticker(&mut self, uri: String) -> Result<String, String> {
        self.session
            .select_sticker(ImageHandle::Uri(uri))
            .map(|id| id.to_string())
            .map_err(|e| e.to_string())
    }

    /// Double the sticker size (once).
    #[wasm_bindgen(js_name = applyDoubleTap)]
    pub fn apply_double_tap(&mut self) -> bool {
        self.session.apply(GestureEvent::DoubleTap)
    }

    /// Move the sticker by a drag delta.
    #[wasm_bindgen(js_name = applyPan)]
    pub fn apply_pan(&mut self, delta_x: f32, delta_y: f32) -> bool {
        self.session.apply(GestureEvent::PanChange { delta_x, delta_y })
    }

    /// Feed a JSON-encoded touch event. Returns the number of gestures applied.
    ///
    /// # Errors
    ///
    /// Returns an error string if the JSON is not a touch event.
    #[wasm_bindgen(js_name = handleTouchJson)]
    pub fn handle_touch_json(&mut self, json: &str) -> Result<u32, String> {
        let event: TouchEvent = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let applied = self.session.handle_touch(&event).len();
        Ok(u32::try_from(applied).unwrap_or(u32::MAX))
    }

    /// Advance the size animation by `dt_ms` and return the rendered size.
    #[wasm_bindgen]
    pub fn tick(&mut self, dt_ms: f64) -> Option<f32> {
        let dt = Duration::try_from_secs_f64(dt_ms / 1000.0).unwrap_or(if dt_ms > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        });
        self.session.tick(dt)
    }

    /// Get the logical transform as `{ scale, translateX, translateY }`,
    /// or `null` when no sticker is shown.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be built.
    #[wasm_bindgen(js_name = getTransform)]
    pub fn get_transform(&self) -> Result<JsValue, JsValue> {
        let Some(transform) = self.session.transform() else {
            return Ok(JsValue::NULL);
        };
        let obj = js_sys::Object::new();
        js_sys::Reflect::set(&obj, &"scale".into(), &transform.scale.into())?;
        js_sys::Reflect::set(&obj, &"translateX".into(), &transform.translate_x.into())?;
        js_sys::Reflect::set(&obj, &"translateY".into(), &transform.translate_y.into())?;
        Ok(obj.into())
    }

    /// Sticker size as currently drawn, mid-animation included.
    #[wasm_bindgen(js_name = renderedScale)]
    #[must_use]
    pub fn rendered_scale(&self) -> Option<f32> {
        self.session.rendered_scale()
    }

    /// Get the current scene as JSON.
    #[wasm_bindgen(js_name = getSceneJson)]
    #[must_use]
    pub fn get_scene_json(&mut self) -> String {
        self.session.scene().to_json().unwrap_or_default()
    }
}
