//! Integration tests for scene export (sticker-renderer).
//!
//! Drives a sticker session through both capture strategies with
//! directory-backed downloads and media library.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use sticker_core::{GestureEvent, ImageHandle, SessionConfig, StickerSession};
use sticker_renderer::image::encode_png;
use sticker_renderer::{
    export_session, select_strategy, CaptureError, DefaultImageResolver, DirectoryDownloads,
    DirectoryMediaLibrary, DownloadSink, ExportError, ExportPipeline, ExportState, HostServices,
    PermissionError, PermissionStatus, RuntimeTarget, SAVED_CONFIRMATION,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)));
    encode_png(&img).expect("encode")
}

fn red_sticker() -> ImageHandle {
    ImageHandle::from_bytes(solid_png(8, 8, [255, 0, 0, 255]))
}

fn session() -> StickerSession {
    StickerSession::new(SessionConfig::default()).expect("session")
}

fn services(root: &Path, permission: PermissionStatus) -> HostServices {
    services_with_sink(
        root,
        permission,
        Arc::new(DirectoryDownloads::new(root.join("downloads"))),
    )
}

fn services_with_sink(
    root: &Path,
    permission: PermissionStatus,
    downloads: Arc<dyn DownloadSink>,
) -> HostServices {
    HostServices {
        resolver: Arc::new(DefaultImageResolver::new().expect("resolver")),
        downloads,
        media_library: Arc::new(DirectoryMediaLibrary::new(root.join("library"))),
        permission: Arc::new(permission),
        temp_dir: root.join("tmp"),
    }
}

fn pipeline(target: RuntimeTarget, services: HostServices) -> ExportPipeline {
    ExportPipeline::new(select_strategy(target, services).expect("strategy"))
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, Iterator::count)
}

struct FailingSink;

#[async_trait]
impl DownloadSink for FailingSink {
    async fn download(&self, _filename: &str, _bytes: Vec<u8>) -> Result<String, CaptureError> {
        Err(CaptureError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "downloads blocked",
        )))
    }
}

struct SlowSink;

#[async_trait]
impl DownloadSink for SlowSink {
    async fn download(&self, filename: &str, _bytes: Vec<u8>) -> Result<String, CaptureError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(filename.to_string())
    }
}

// ==========================================================================
// DOM export
// ==========================================================================

#[tokio::test]
async fn test_dom_export_is_fixed_size_for_wide_background() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = pipeline(
        RuntimeTarget::Dom,
        services(dir.path(), PermissionStatus::Undetermined),
    );

    let mut session = session();
    session.select_background(Some(ImageHandle::from_bytes(solid_png(
        1200,
        300,
        [0, 0, 255, 255],
    ))));
    session.select_sticker(red_sticker()).expect("sticker");

    let receipt = export_session(&pipeline, &mut session)
        .await
        .expect("export");
    assert_eq!(receipt.target, RuntimeTarget::Dom);
    assert_eq!((receipt.width, receipt.height), (320, 440));
    assert!(receipt.confirmation.is_none());
    assert!(receipt.location.ends_with("image.png"));

    let bytes = std::fs::read(&receipt.location).expect("read download");
    let decoded = image::load_from_memory(&bytes).expect("decode");
    assert_eq!(decoded.dimensions(), (320, 440));
}

#[tokio::test]
async fn test_dom_export_uses_logical_transform() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = pipeline(
        RuntimeTarget::Dom,
        services(dir.path(), PermissionStatus::Undetermined),
    );

    let mut session = session();
    session.select_sticker(red_sticker()).expect("sticker");
    assert!(session.apply(GestureEvent::PanChange {
        delta_x: 100.0,
        delta_y: 0.0,
    }));
    // The spring has not moved yet; capture still sees the logical size.
    assert!(session.apply(GestureEvent::DoubleTap));

    let receipt = export_session(&pipeline, &mut session)
        .await
        .expect("export");
    let bytes = std::fs::read(&receipt.location).expect("read download");
    let decoded = image::load_from_memory(&bytes).expect("decode").to_rgba8();

    // Frame rect is (100, 140, 80, 80).
    let inside = decoded.get_pixel(170, 210);
    assert_eq!(inside.0[0], 255);
    assert_eq!(inside.0[1], 0);
    let outside = decoded.get_pixel(60, 180);
    assert_ne!(outside.0, [255, 0, 0, 255]);
}

#[tokio::test]
async fn test_failed_download_leaves_session_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = pipeline(
        RuntimeTarget::Dom,
        services_with_sink(dir.path(), PermissionStatus::Granted, Arc::new(FailingSink)),
    );

    let mut session = session();
    session.select_sticker(red_sticker()).expect("sticker");
    session.apply(GestureEvent::PanChange {
        delta_x: 12.0,
        delta_y: -7.0,
    });
    let transform_before = session.transform();
    let scene_before = session.scene().clone();

    let result = export_session(&pipeline, &mut session).await;
    assert!(matches!(
        result,
        Err(ExportError::Capture(CaptureError::Io(_)))
    ));

    assert_eq!(session.transform(), transform_before);
    assert_eq!(session.scene(), &scene_before);
    assert_eq!(pipeline.state(), ExportState::Idle);
}

#[tokio::test]
async fn test_second_export_while_in_flight_is_busy() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = pipeline(
        RuntimeTarget::Dom,
        services_with_sink(dir.path(), PermissionStatus::Granted, Arc::new(SlowSink)),
    );
    let scene = session().snapshot();

    let (first, second) = tokio::join!(pipeline.export(&scene), async {
        tokio::task::yield_now().await;
        pipeline.export(&scene).await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(ExportError::Busy)));
    assert_eq!(pipeline.state(), ExportState::Idle);

    pipeline.export(&scene).await.expect("export after idle");
}

// ==========================================================================
// Native export
// ==========================================================================

#[tokio::test]
async fn test_native_export_saves_to_library() {
    init_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = pipeline(
        RuntimeTarget::Native,
        services(dir.path(), PermissionStatus::Granted),
    );

    let mut session = session();
    session.select_sticker(red_sticker()).expect("sticker");

    let receipt = export_session(&pipeline, &mut session)
        .await
        .expect("export");
    assert_eq!(receipt.target, RuntimeTarget::Native);
    assert_eq!(receipt.confirmation, Some(SAVED_CONFIRMATION));
    assert_eq!(receipt.height, 440);
    assert_eq!(receipt.width, 320);

    let saved = Path::new(&receipt.location);
    assert!(saved.starts_with(dir.path().join("library")));
    assert!(saved.exists());
    assert_eq!(file_count(&dir.path().join("tmp")), 0);
}

#[tokio::test]
async fn test_native_export_requires_requested_permission() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = pipeline(
        RuntimeTarget::Native,
        services(dir.path(), PermissionStatus::Undetermined),
    );

    let result = pipeline.export(&session().snapshot()).await;
    assert!(matches!(
        result,
        Err(ExportError::Permission(PermissionError::NotRequested))
    ));
    assert_eq!(file_count(&dir.path().join("tmp")), 0);
    assert_eq!(file_count(&dir.path().join("library")), 0);
}

#[tokio::test]
async fn test_native_export_denied_writes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pipeline = pipeline(
        RuntimeTarget::Native,
        services(dir.path(), PermissionStatus::Denied),
    );

    let result = pipeline.export(&session().snapshot()).await;
    assert!(matches!(
        result,
        Err(ExportError::Permission(PermissionError::Denied))
    ));
    assert!(!dir.path().join("tmp").exists());
    assert_eq!(pipeline.state(), ExportState::Idle);
}

#[tokio::test]
async fn test_native_permission_follows_host_updates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (tx, rx) = tokio::sync::watch::channel(PermissionStatus::Undetermined);
    let mut services = services(dir.path(), PermissionStatus::Undetermined);
    services.permission = Arc::new(rx);
    let pipeline = pipeline(RuntimeTarget::Native, services);
    let scene = session().snapshot();

    assert!(pipeline.export(&scene).await.is_err());
    tx.send(PermissionStatus::Granted).expect("send");
    let receipt = pipeline.export(&scene).await.expect("export");
    assert_eq!(receipt.confirmation, Some(SAVED_CONFIRMATION));
}
