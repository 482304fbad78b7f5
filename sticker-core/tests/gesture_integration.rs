//! Session Integration Tests
//!
//! Drives a sticker session with raw touch sequences and checks the
//! resulting transform, scene composition and size animation.

use std::time::Duration;

use sticker_core::{
    compose, ComposedScene, GestureEvent, ImageHandle, SessionConfig, StickerSession,
    StickerTransform, TouchEvent, TouchPhase, TouchPoint, FRAME_HEIGHT, STICKER_TOP_OFFSET,
};

fn session_with_sticker() -> StickerSession {
    let mut session = StickerSession::new(SessionConfig::default()).expect("session");
    session
        .select_sticker(ImageHandle::Uri("file:///emoji/1.png".to_string()))
        .expect("sticker");
    session
}

fn touch(phase: TouchPhase, x: f32, y: f32, t: u64) -> TouchEvent {
    TouchEvent::single(phase, x, y, t)
}

/// Tap twice at `(x, y)` starting at `t`.
fn double_tap(session: &mut StickerSession, x: f32, y: f32, t: u64) -> Vec<GestureEvent> {
    let mut out = Vec::new();
    for (phase, dt) in [
        (TouchPhase::Start, 0),
        (TouchPhase::End, 60),
        (TouchPhase::Start, 150),
        (TouchPhase::End, 210),
    ] {
        out.extend(session.handle_touch(&touch(phase, x, y, t + dt)));
    }
    out
}

// ============================================================================
// Double Tap
// ============================================================================

#[test]
fn test_double_tap_doubles_base_size_once() {
    let mut session = session_with_sticker();

    // Default sticker square sits at (0, 140) with edge 40.
    assert_eq!(
        double_tap(&mut session, 20.0, 160.0, 0),
        vec![GestureEvent::DoubleTap]
    );
    assert_eq!(session.transform().expect("transform").scale, 80.0);

    // Recognized again, but the scale is already at twice the base size.
    assert_eq!(
        double_tap(&mut session, 20.0, 160.0, 1_000),
        vec![GestureEvent::DoubleTap]
    );
    assert_eq!(session.transform().expect("transform").scale, 80.0);
}

#[test]
fn test_double_tap_outside_sticker_is_ignored() {
    let mut session = session_with_sticker();
    assert!(double_tap(&mut session, 200.0, 20.0, 0).is_empty());
    assert_eq!(session.transform().expect("transform").scale, 40.0);
}

// ============================================================================
// Pan
// ============================================================================

#[test]
fn test_pan_moves_sticker_by_total_travel() {
    let mut session = session_with_sticker();

    session.handle_touch(&touch(TouchPhase::Start, 100.0, 150.0, 0));
    let mut gestures = Vec::new();
    for (i, (x, y)) in [(103.0, 151.0), (130.0, 150.0), (150.0, 175.0), (150.0, 200.0)]
        .into_iter()
        .enumerate()
    {
        gestures.extend(session.handle_touch(&touch(TouchPhase::Move, x, y, 16 * (i as u64 + 1))));
    }
    session.handle_touch(&touch(TouchPhase::End, 150.0, 200.0, 100));

    assert!(gestures
        .iter()
        .all(|g| matches!(g, GestureEvent::PanChange { .. })));

    let transform = session.transform().expect("transform");
    assert!((transform.translate_x - 50.0).abs() < 1e-4);
    assert!((transform.translate_y - 50.0).abs() < 1e-4);
    assert_eq!(transform.scale, 40.0);

    let rect = session
        .scene()
        .sticker()
        .expect("sticker node")
        .frame_rect();
    assert!((rect.x - 50.0).abs() < 1e-4);
    assert!((rect.y - (FRAME_HEIGHT + STICKER_TOP_OFFSET + 50.0)).abs() < 1e-4);
}

#[test]
fn test_pan_deltas_accumulate_through_apply() {
    let mut session = session_with_sticker();
    let deltas = [(3.5, -1.0), (-10.0, 4.25), (0.5, 0.75), (22.0, -30.0)];
    for (delta_x, delta_y) in deltas {
        session.apply(GestureEvent::PanChange { delta_x, delta_y });
    }

    let expected_x: f32 = deltas.iter().map(|d| d.0).sum();
    let expected_y: f32 = deltas.iter().map(|d| d.1).sum();
    let transform = session.transform().expect("transform");
    assert!((transform.translate_x - expected_x).abs() < 1e-4);
    assert!((transform.translate_y - expected_y).abs() < 1e-4);
}

#[test]
fn test_multi_touch_cancels_pan() {
    let mut session = session_with_sticker();
    session.handle_touch(&touch(TouchPhase::Start, 100.0, 150.0, 0));
    session.handle_touch(&TouchEvent::new(
        TouchPhase::Move,
        vec![
            TouchPoint::new(0, 140.0, 150.0),
            TouchPoint::new(1, 200.0, 160.0),
        ],
        16,
    ));
    let out = session.handle_touch(&touch(TouchPhase::Move, 160.0, 150.0, 32));

    assert!(out.is_empty());
    assert_eq!(
        session.transform(),
        Some(StickerTransform::new(40.0).expect("transform"))
    );
}

// ============================================================================
// Composition
// ============================================================================

#[test]
fn test_scene_without_sticker_has_placeholder_background() {
    let mut session = StickerSession::new(SessionConfig::default()).expect("session");
    let scene = session.scene();
    assert!(scene.background().is_placeholder());
    assert!(!scene.has_sticker());
    assert_eq!(scene, &compose(None, None));

    // Gestures are inert without a sticker.
    assert!(!session.apply(GestureEvent::DoubleTap));
    assert!(double_tap(&mut session, 20.0, 160.0, 0).is_empty());
}

#[test]
fn test_picked_background_and_swap_keep_transform() {
    let mut session = session_with_sticker();
    session.select_background(Some(ImageHandle::File("photos/beach.jpg".into())));
    session.apply(GestureEvent::PanChange {
        delta_x: 12.0,
        delta_y: 8.0,
    });
    let id = session.scene().sticker().expect("sticker").id;

    let swapped = session
        .select_sticker(ImageHandle::Uri("file:///emoji/2.png".to_string()))
        .expect("swap");
    assert_eq!(swapped, id);

    let scene = session.snapshot();
    let sticker = scene.sticker().expect("sticker");
    assert_eq!(
        sticker.image,
        ImageHandle::Uri("file:///emoji/2.png".to_string())
    );
    assert_eq!(sticker.transform.translate_x, 12.0);
    assert_eq!(
        scene.background(),
        &ImageHandle::File("photos/beach.jpg".into())
    );

    // A cancelled picker falls back to the placeholder.
    session.select_background(None);
    assert!(session.scene().background().is_placeholder());
}

#[test]
fn test_scene_json_round_trip() {
    let mut session = session_with_sticker();
    session.apply(GestureEvent::DoubleTap);
    let scene = session.snapshot();

    let json = scene.to_json().expect("serialize");
    let restored = ComposedScene::from_json(&json).expect("deserialize");
    assert_eq!(restored, scene);
}

#[test]
fn test_clear_sticker_then_place_new_one_resets_transform() {
    let mut session = session_with_sticker();
    session.apply(GestureEvent::DoubleTap);
    session.clear_sticker();
    assert!(session.transform().is_none());
    assert!(!session.scene().has_sticker());

    session
        .select_sticker(ImageHandle::Uri("file:///emoji/3.png".to_string()))
        .expect("sticker");
    assert_eq!(session.transform().expect("transform").scale, 40.0);
}

// ============================================================================
// Observers and Animation
// ============================================================================

#[tokio::test]
async fn test_subscriber_sees_latest_transform() {
    let mut session = session_with_sticker();
    let mut rx = session
        .transform_state()
        .expect("transform state")
        .subscribe();

    session.apply(GestureEvent::DoubleTap);
    rx.changed().await.expect("changed");
    assert_eq!(rx.borrow_and_update().scale, 80.0);
}

#[test]
fn test_rendered_scale_springs_to_logical_scale() {
    let mut session = session_with_sticker();
    session.apply(GestureEvent::DoubleTap);

    let first = session.tick(Duration::from_millis(16)).expect("tick");
    assert!(first > 40.0 && first < 80.0);
    assert_eq!(session.transform().expect("transform").scale, 80.0);

    for _ in 0..300 {
        session.tick(Duration::from_millis(16));
    }
    let settled = session.rendered_scale().expect("rendered");
    assert!((settled - 80.0).abs() < 0.5, "settled at {settled}");
}

#[test]
fn test_stalled_frame_settles_rendered_scale() {
    let mut session = session_with_sticker();
    session.apply(GestureEvent::DoubleTap);

    let scale = session.tick(Duration::from_secs(200_000)).expect("tick");
    assert!((scale - 80.0).abs() < f32::EPSILON, "rendered {scale}");
    assert!((session.rendered_scale().expect("rendered") - 80.0).abs() < f32::EPSILON);
}
