// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the playback controller

mod common;

use common::{BackendProbe, CameraProbe, MockBackend, MockProvider, Reply, code_at, drain};
use roi_scanner::app::frame_processor::TickOutcome;
use roi_scanner::app::qr_overlay::{RecordingSurface, SurfaceLog};
use roi_scanner::app::state::{EventSink, PlaybackState, ScannerEvent};
use roi_scanner::app::PlaybackController;
use roi_scanner::backends::camera::CameraFacing;
use roi_scanner::backends::detection::EngineKind;
use roi_scanner::config::ScannerConfig;
use roi_scanner::errors::{BackendError, DeviceError, ScanError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

struct Scanner {
    controller: PlaybackController<RecordingSurface>,
    camera: CameraProbe,
    detector: BackendProbe,
    log: SurfaceLog,
    events: UnboundedReceiver<ScannerEvent>,
}

fn scanner(config: ScannerConfig) -> Scanner {
    scanner_with(config, MockBackend::new("fallback"))
}

fn scanner_with(config: ScannerConfig, (fallback, detector): (MockBackend, BackendProbe)) -> Scanner {
    let (provider, camera) = MockProvider::new(320, 240);
    let (events, receiver) = EventSink::channel();
    let surface = RecordingSurface::new();
    let log = surface.log();
    let controller = PlaybackController::new(
        config,
        provider.boxed(),
        None,
        fallback.boxed(),
        surface,
        events,
    );
    Scanner {
        controller,
        camera,
        detector,
        log,
        events: receiver,
    }
}

fn states(events: &[ScannerEvent]) -> Vec<PlaybackState> {
    events
        .iter()
        .filter_map(|event| match event {
            ScannerEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_start_acquires_device_and_engine() {
    let mut s = scanner(ScannerConfig::default());
    assert_eq!(s.controller.state(), PlaybackState::Idle);

    s.controller.start().await.unwrap();
    assert_eq!(s.controller.state(), PlaybackState::Running);
    assert_eq!(s.camera.acquisitions(), 1);
    assert_eq!(s.detector.initializations(), 1);
    assert_eq!(s.controller.active_engine(), Some(EngineKind::Fallback));

    let events = drain(&mut s.events);
    assert!(events.contains(&ScannerEvent::EngineChanged(EngineKind::Fallback)));
    assert_eq!(states(&events), vec![PlaybackState::Running]);

    assert_eq!(
        s.controller.step().await,
        Some(TickOutcome::Processed { detections: 0 })
    );
    assert_eq!(s.log.frames_rendered(), 1);
}

#[tokio::test]
async fn test_release_on_pause_reacquires_on_resume() {
    let mut s = scanner(ScannerConfig {
        release_on_pause: true,
        ..ScannerConfig::default()
    });
    s.controller.start().await.unwrap();

    s.controller.pause().unwrap();
    assert_eq!(s.controller.state(), PlaybackState::PausedReleased);
    assert!(!s.controller.has_device());
    assert_eq!(s.camera.held(), 0);
    assert_eq!(s.camera.releases(), 1);
    assert_eq!(s.detector.disposals(), 1);
    assert_eq!(s.controller.step().await, None);

    s.controller.resume().await.unwrap();
    assert_eq!(s.controller.state(), PlaybackState::Running);
    assert_eq!(s.camera.acquisitions(), 2, "fresh device handle");
    assert_eq!(s.camera.held(), 1);
    assert_eq!(s.detector.initializations(), 2, "fresh engine initialization");
}

#[tokio::test]
async fn test_retained_pause_keeps_device() {
    let mut s = scanner(ScannerConfig::default());
    s.controller.start().await.unwrap();

    s.controller.set_paused(true).await.unwrap();
    assert_eq!(s.controller.state(), PlaybackState::PausedRetained);
    assert!(s.controller.has_device());
    assert_eq!(s.camera.pauses(), 1);
    assert_eq!(s.camera.releases(), 0);

    s.controller.set_paused(false).await.unwrap();
    assert_eq!(s.controller.state(), PlaybackState::Running);
    assert_eq!(s.camera.acquisitions(), 1);
    assert_eq!(s.camera.resumes(), 1);
    assert_eq!(s.detector.initializations(), 1);
}

#[tokio::test]
async fn test_scan_once_stops_scheduling() {
    let (fallback, detector) = MockBackend::new("fallback");
    detector.set_default(Reply::Codes(vec![code_at(160.0, 120.0, 40.0)]));
    let mut s = scanner_with(
        ScannerConfig {
            stop_after_detection: true,
            tick_interval_ms: 5,
            ..ScannerConfig::default()
        },
        (fallback, detector),
    );
    s.controller.start().await.unwrap();

    let (handle, commands) = s.controller.command_channel();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown();
    });
    s.controller.run(commands).await.unwrap();

    assert_eq!(s.detector.detections(), 1);
    assert_eq!(
        s.log.frames_rendered(),
        2,
        "the detecting frame plus exactly one more render"
    );
    let events = drain(&mut s.events);
    assert_eq!(
        events
            .iter()
            .filter(|event| matches!(event, ScannerEvent::Detected(_)))
            .count(),
        1
    );
    assert!(states(&events).contains(&PlaybackState::StoppedAfterDetection));
}

#[tokio::test]
async fn test_stopped_after_detection_requires_restart() {
    let (fallback, detector) = MockBackend::new("fallback");
    detector.set_default(Reply::Codes(vec![code_at(160.0, 120.0, 40.0)]));
    let mut s = scanner_with(
        ScannerConfig {
            stop_after_detection: true,
            ..ScannerConfig::default()
        },
        (fallback, detector),
    );
    s.controller.start().await.unwrap();

    assert_eq!(
        s.controller.step().await,
        Some(TickOutcome::StoppedAfterDetection)
    );
    assert_eq!(s.controller.state(), PlaybackState::StoppedAfterDetection);
    assert_eq!(s.controller.step().await, None);

    s.controller.resume().await.unwrap();
    s.controller.set_paused(false).await.unwrap();
    s.controller.pause().unwrap();
    assert_eq!(s.controller.state(), PlaybackState::StoppedAfterDetection);

    s.controller.restart().await.unwrap();
    assert_eq!(s.controller.state(), PlaybackState::Running);
    assert_eq!(s.camera.acquisitions(), 2);
    assert_eq!(s.camera.held(), 1);
}

#[tokio::test]
async fn test_switch_camera_while_running() {
    let mut s = scanner(ScannerConfig::default());
    s.controller.start().await.unwrap();
    drain(&mut s.events);

    s.controller.switch_camera().await.unwrap();
    assert_eq!(s.controller.facing(), CameraFacing::Front);
    assert_eq!(s.controller.state(), PlaybackState::Running);
    assert_eq!(
        s.camera.acquired_facings(),
        vec![CameraFacing::Back, CameraFacing::Front]
    );
    assert_eq!(s.camera.held(), 1);
    assert_eq!(s.detector.initializations(), 2);
    assert!(drain(&mut s.events).contains(&ScannerEvent::EngineChanged(EngineKind::Fallback)));
}

#[tokio::test]
async fn test_switch_camera_while_paused() {
    let mut s = scanner(ScannerConfig::default());
    s.controller.start().await.unwrap();
    s.controller.pause().unwrap();
    drain(&mut s.events);

    s.controller.switch_camera().await.unwrap();
    assert_eq!(s.controller.state(), PlaybackState::PausedReleased);
    assert_eq!(s.camera.held(), 0);
    assert_eq!(s.detector.disposals(), 1);
    assert_eq!(s.detector.initializations(), 1, "engine is chosen on resume");
    assert_eq!(s.controller.active_engine(), None);

    s.controller.resume().await.unwrap();
    assert_eq!(s.controller.state(), PlaybackState::Running);
    assert_eq!(s.camera.acquired_facings().last(), Some(&CameraFacing::Front));
    assert_eq!(s.detector.initializations(), 2);
    let engine_changes = drain(&mut s.events)
        .into_iter()
        .filter(|event| matches!(event, ScannerEvent::EngineChanged(_)))
        .count();
    assert_eq!(engine_changes, 1);
}

#[tokio::test]
async fn test_device_error_is_reported_once() {
    let mut s = scanner(ScannerConfig::default());
    s.camera
        .fail_next_acquire(DeviceError::PermissionDenied("blocked".into()));

    let result = s.controller.start().await;
    assert!(matches!(
        result,
        Err(ScanError::Device(DeviceError::PermissionDenied(_)))
    ));
    assert_eq!(s.controller.state(), PlaybackState::Idle);
    let errors = drain(&mut s.events)
        .into_iter()
        .filter(|event| matches!(event, ScannerEvent::Error(_)))
        .count();
    assert_eq!(errors, 1);
    assert_eq!(s.detector.initializations(), 0);
}

#[tokio::test]
async fn test_no_detection_engine_leaves_scanner_idle() {
    let (fallback, detector) = MockBackend::new("fallback");
    let mut s = scanner_with(ScannerConfig::default(), (fallback.failing_init(), detector));

    let result = s.controller.start().await;
    assert!(matches!(
        result,
        Err(ScanError::Backend(BackendError::NotAvailable(_)))
    ));
    assert_eq!(s.controller.state(), PlaybackState::Idle);
    assert_eq!(s.camera.acquisitions(), 1);
    assert_eq!(s.camera.held(), 0, "device released again");
}

#[tokio::test]
async fn test_start_paused() {
    let mut s = scanner(ScannerConfig {
        paused: true,
        ..ScannerConfig::default()
    });
    assert!(s.controller.config().paused);
    s.controller.start().await.unwrap();
    assert_eq!(s.controller.state(), PlaybackState::PausedRetained);
    assert_eq!(
        states(&drain(&mut s.events)),
        vec![PlaybackState::Running, PlaybackState::PausedRetained]
    );
}

#[tokio::test]
async fn test_torch_is_optional() {
    let mut s = scanner(ScannerConfig::default());
    s.controller.start().await.unwrap();

    s.controller.set_torch(true).unwrap();
    assert!(s.camera.torch_calls().is_empty());

    s.camera.set_torch_supported(true);
    s.controller.set_torch(true).unwrap();
    assert_eq!(s.camera.torch_calls(), vec![true]);
}

#[tokio::test]
async fn test_lost_surface_stops_the_session() {
    let mut s = scanner(ScannerConfig::default());
    s.controller.start().await.unwrap();
    s.log.set_available(false);

    let outcome = s.controller.step().await;
    assert!(matches!(outcome, Some(TickOutcome::Fatal(ScanError::Surface(_)))));
    assert_eq!(s.controller.state(), PlaybackState::Idle);
    assert_eq!(s.camera.held(), 0);
}

#[tokio::test]
async fn test_run_loop_follows_commands() {
    let mut s = scanner(ScannerConfig {
        tick_interval_ms: 5,
        ..ScannerConfig::default()
    });
    s.controller.start().await.unwrap();
    let (handle, commands) = s.controller.command_channel();
    let camera = s.camera.clone();

    let driver = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.pause();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let paused_snapshots = camera.snapshots();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let still_paused = camera.snapshots() == paused_snapshots;
        handle.shutdown();
        still_paused
    });

    s.controller.run(commands).await.unwrap();
    assert!(driver.await.unwrap(), "no frames are scheduled while paused");
    assert!(s.camera.snapshots() > 0);
    assert_eq!(s.controller.state(), PlaybackState::Idle);
    assert_eq!(s.camera.held(), 0);
}
