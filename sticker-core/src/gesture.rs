//! Gesture recognition: raw pointer input to [`GestureEvent`]s.
//!
//! Two recognizers run side by side on a single pointer sequence. Pan is
//! attached to the sticker wrapper and double-tap to the inner image; neither
//! blocks the other. A sequence that moves far enough to start a pan can no
//! longer count as a tap, and a tap sequence never emits pan deltas.

use serde::{Deserialize, Serialize};

use crate::{GestureEvent, Rect, TouchEvent, TouchPhase};

/// Thresholds for gesture recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Longest finger-down time that still counts as a tap.
    pub max_tap_duration_ms: u64,
    /// Longest gap between the first tap's release and the second tap's press.
    pub max_tap_delay_ms: u64,
    /// How far a tap may wander, and how far apart the two taps may land.
    pub max_tap_distance: f32,
    /// Distance the pointer must travel before a drag becomes a pan.
    pub pan_activation_distance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            max_tap_duration_ms: 500,
            max_tap_delay_ms: 500,
            max_tap_distance: 10.0,
            pan_activation_distance: 10.0,
        }
    }
}

/// Where each gesture listens, in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitRegions {
    /// The translated wrapper that receives pan gestures.
    pub wrapper: Rect,
    /// The sticker image that receives double taps.
    pub image: Rect,
}

#[derive(Debug, Clone, Copy)]
struct ActivePointer {
    start: (f32, f32),
    start_ms: u64,
    last: (f32, f32),
    on_wrapper: bool,
    on_image: bool,
    panning: bool,
    tap_possible: bool,
}

#[derive(Debug, Clone, Copy)]
struct CompletedTap {
    at: (f32, f32),
    released_ms: u64,
}

/// Turns single-pointer touch sequences into double-tap and pan gestures.
#[derive(Debug, Default)]
pub struct GestureRecognizer {
    config: GestureConfig,
    pointer: Option<ActivePointer>,
    last_tap: Option<CompletedTap>,
}

impl GestureRecognizer {
    /// Create a recognizer with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(GestureConfig::default())
    }

    /// Create with custom thresholds.
    #[must_use]
    pub fn with_config(config: GestureConfig) -> Self {
        Self {
            config,
            pointer: None,
            last_tap: None,
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Whether a pointer sequence is in progress.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.pointer.is_some()
    }

    /// Drop any in-flight sequence and pending first tap.
    pub fn reset(&mut self) {
        self.pointer = None;
        self.last_tap = None;
    }

    /// Feed one touch event and collect the gestures it completes.
    pub fn process(&mut self, event: &TouchEvent, regions: &HitRegions) -> Vec<GestureEvent> {
        if event.is_multi_touch() {
            if self.pointer.is_some() {
                tracing::debug!("Multi-touch detected, cancelling pointer sequence");
            }
            self.reset();
            return Vec::new();
        }

        match event.phase {
            TouchPhase::Start => {
                self.on_start(event, regions);
                Vec::new()
            }
            TouchPhase::Move => self.on_move(event),
            TouchPhase::End => self.on_end(event),
            TouchPhase::Cancel => {
                self.reset();
                Vec::new()
            }
        }
    }

    fn on_start(&mut self, event: &TouchEvent, regions: &HitRegions) {
        let Some(point) = event.primary_touch() else {
            return;
        };
        let (x, y) = (point.x, point.y);
        let on_wrapper = regions.wrapper.contains_point(x, y);
        let on_image = regions.image.contains_point(x, y);

        if let Some(tap) = self.last_tap {
            let gap = event.timestamp_ms.saturating_sub(tap.released_ms);
            if gap > self.config.max_tap_delay_ms
                || distance(tap.at, (x, y)) > self.config.max_tap_distance
            {
                self.last_tap = None;
            }
        }

        if !on_wrapper && !on_image {
            self.pointer = None;
            self.last_tap = None;
            return;
        }

        self.pointer = Some(ActivePointer {
            start: (x, y),
            start_ms: event.timestamp_ms,
            last: (x, y),
            on_wrapper,
            on_image,
            panning: false,
            tap_possible: on_image,
        });
    }

    fn on_move(&mut self, event: &TouchEvent) -> Vec<GestureEvent> {
        let (Some(pointer), Some(point)) = (self.pointer.as_mut(), event.primary_touch()) else {
            return Vec::new();
        };
        let position = (point.x, point.y);
        let travelled = distance(pointer.start, position);

        if travelled > self.config.max_tap_distance {
            pointer.tap_possible = false;
        }

        if !pointer.panning {
            if !pointer.on_wrapper || travelled <= self.config.pan_activation_distance {
                return Vec::new();
            }
            tracing::trace!("Pan activated after {travelled:.1} units");
            pointer.panning = true;
            pointer.tap_possible = false;
        }

        let delta_x = position.0 - pointer.last.0;
        let delta_y = position.1 - pointer.last.1;
        pointer.last = position;

        if delta_x == 0.0 && delta_y == 0.0 {
            return Vec::new();
        }
        vec![GestureEvent::PanChange { delta_x, delta_y }]
    }

    fn on_end(&mut self, event: &TouchEvent) -> Vec<GestureEvent> {
        let Some(pointer) = self.pointer.take() else {
            return Vec::new();
        };
        let released_at = event.primary_touch().map_or(pointer.last, |p| (p.x, p.y));
        let held_ms = event.timestamp_ms.saturating_sub(pointer.start_ms);

        let is_tap = pointer.tap_possible
            && pointer.on_image
            && held_ms <= self.config.max_tap_duration_ms
            && distance(pointer.start, released_at) <= self.config.max_tap_distance;

        if !is_tap {
            self.last_tap = None;
            return Vec::new();
        }

        if self.last_tap.take().is_some() {
            tracing::trace!("Double tap recognized");
            return vec![GestureEvent::DoubleTap];
        }

        self.last_tap = Some(CompletedTap {
            at: pointer.start,
            released_ms: event.timestamp_ms,
        });
        Vec::new()
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> HitRegions {
        HitRegions {
            wrapper: Rect::new(0.0, 140.0, 320.0, 40.0),
            image: Rect::new(0.0, 140.0, 40.0, 40.0),
        }
    }

    fn touch(phase: TouchPhase, x: f32, y: f32, t: u64) -> TouchEvent {
        TouchEvent::single(phase, x, y, t)
    }

    fn tap(recognizer: &mut GestureRecognizer, x: f32, y: f32, t: u64) -> Vec<GestureEvent> {
        let r = regions();
        let mut out = recognizer.process(&touch(TouchPhase::Start, x, y, t), &r);
        out.extend(recognizer.process(&touch(TouchPhase::End, x, y, t + 50), &r));
        out
    }

    #[test]
    fn two_quick_taps_make_a_double_tap() {
        let mut recognizer = GestureRecognizer::new();
        assert!(tap(&mut recognizer, 20.0, 160.0, 0).is_empty());
        assert_eq!(
            tap(&mut recognizer, 21.0, 161.0, 200),
            vec![GestureEvent::DoubleTap]
        );
        // A third tap starts a new pair.
        assert!(tap(&mut recognizer, 20.0, 160.0, 400).is_empty());
    }

    #[test]
    fn slow_second_tap_does_not_count() {
        let mut recognizer = GestureRecognizer::new();
        assert!(tap(&mut recognizer, 20.0, 160.0, 0).is_empty());
        assert!(tap(&mut recognizer, 20.0, 160.0, 1_000).is_empty());
    }

    #[test]
    fn taps_on_wrapper_outside_image_are_ignored() {
        let mut recognizer = GestureRecognizer::new();
        assert!(tap(&mut recognizer, 200.0, 160.0, 0).is_empty());
        assert!(tap(&mut recognizer, 200.0, 160.0, 100).is_empty());
    }

    #[test]
    fn taps_far_apart_do_not_pair() {
        let mut recognizer = GestureRecognizer::new();
        assert!(tap(&mut recognizer, 5.0, 145.0, 0).is_empty());
        assert!(tap(&mut recognizer, 35.0, 175.0, 100).is_empty());
    }

    #[test]
    fn drag_emits_changes_summing_to_travel() {
        let mut recognizer = GestureRecognizer::new();
        let r = regions();
        recognizer.process(&touch(TouchPhase::Start, 100.0, 150.0, 0), &r);

        let mut total = (0.0_f32, 0.0_f32);
        for (i, (x, y)) in [(104.0, 150.0), (115.0, 152.0), (130.0, 170.0), (90.0, 100.0)]
            .into_iter()
            .enumerate()
        {
            let t = 16 * (i as u64 + 1);
            for gesture in recognizer.process(&touch(TouchPhase::Move, x, y, t), &r) {
                match gesture {
                    GestureEvent::PanChange { delta_x, delta_y } => {
                        total.0 += delta_x;
                        total.1 += delta_y;
                    }
                    GestureEvent::DoubleTap => panic!("unexpected double tap"),
                }
            }
        }
        recognizer.process(&touch(TouchPhase::End, 90.0, 100.0, 100), &r);

        assert!((total.0 - -10.0).abs() < 1e-4);
        assert!((total.1 - -50.0).abs() < 1e-4);
        assert!(!recognizer.is_tracking());
    }

    #[test]
    fn small_jitter_does_not_pan() {
        let mut recognizer = GestureRecognizer::new();
        let r = regions();
        recognizer.process(&touch(TouchPhase::Start, 20.0, 160.0, 0), &r);
        let out = recognizer.process(&touch(TouchPhase::Move, 23.0, 162.0, 10), &r);
        assert!(out.is_empty());
    }

    #[test]
    fn drag_cancels_pending_tap() {
        let mut recognizer = GestureRecognizer::new();
        let r = regions();
        assert!(tap(&mut recognizer, 20.0, 160.0, 0).is_empty());

        recognizer.process(&touch(TouchPhase::Start, 20.0, 160.0, 100), &r);
        let moved = recognizer.process(&touch(TouchPhase::Move, 60.0, 160.0, 120), &r);
        assert_eq!(moved.len(), 1);
        let ended = recognizer.process(&touch(TouchPhase::End, 60.0, 160.0, 140), &r);
        assert!(ended.is_empty());
    }

    #[test]
    fn multi_touch_cancels_sequence() {
        let mut recognizer = GestureRecognizer::new();
        let r = regions();
        recognizer.process(&touch(TouchPhase::Start, 100.0, 150.0, 0), &r);
        assert!(recognizer.is_tracking());

        let pinch = TouchEvent::new(
            TouchPhase::Move,
            vec![
                crate::TouchPoint::new(0, 100.0, 150.0),
                crate::TouchPoint::new(1, 150.0, 150.0),
            ],
            10,
        );
        assert!(recognizer.process(&pinch, &r).is_empty());
        assert!(!recognizer.is_tracking());
        assert!(recognizer
            .process(&touch(TouchPhase::Move, 200.0, 150.0, 20), &r)
            .is_empty());
    }

    #[test]
    fn touches_outside_sticker_are_ignored() {
        let mut recognizer = GestureRecognizer::new();
        let r = regions();
        recognizer.process(&touch(TouchPhase::Start, 100.0, 400.0, 0), &r);
        assert!(!recognizer.is_tracking());
        assert!(recognizer
            .process(&touch(TouchPhase::Move, 200.0, 420.0, 16), &r)
            .is_empty());
    }
}
