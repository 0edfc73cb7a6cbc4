// SPDX-License-Identifier: GPL-3.0-only

//! Test doubles shared by the integration tests
//!
//! Every mock hands out a probe that stays with the test after the mock
//! itself has been moved into the scanner.

#![allow(dead_code)]

use futures::future::BoxFuture;
use roi_scanner::app::frame_processor::{DetectedCode, Point};
use roi_scanner::app::state::ScannerEvent;
use roi_scanner::backends::camera::{CameraFacing, CameraFrame, CameraProvider, CameraStream};
use roi_scanner::backends::detection::{BackendResult, DetectionBackend};
use roi_scanner::errors::{BackendError, DeviceError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

/// What a mock backend answers to one `detect` call
#[derive(Debug, Clone)]
pub enum Reply {
    Codes(Vec<DetectedCode>),
    Fail,
    /// Never completes
    Hang,
    /// Completes after a delay
    Delayed(Duration, Vec<DetectedCode>),
}

impl Reply {
    pub fn empty() -> Self {
        Reply::Codes(Vec::new())
    }
}

#[derive(Debug)]
struct BackendState {
    script: VecDeque<Reply>,
    default: Reply,
    initializations: usize,
    detections: usize,
    disposals: usize,
    frame_sizes: Vec<(u32, u32)>,
}

/// Inspection and scripting handle of a [`MockBackend`]
#[derive(Debug, Clone)]
pub struct BackendProbe {
    state: Arc<Mutex<BackendState>>,
}

impl BackendProbe {
    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    /// Queue a reply for the next unanswered `detect` call
    pub fn push(&self, reply: Reply) {
        self.lock().script.push_back(reply);
    }

    /// Reply used once the script is exhausted
    pub fn set_default(&self, reply: Reply) {
        self.lock().default = reply;
    }

    pub fn initializations(&self) -> usize {
        self.lock().initializations
    }

    pub fn detections(&self) -> usize {
        self.lock().detections
    }

    pub fn disposals(&self) -> usize {
        self.lock().disposals
    }

    /// Size of the frame passed to the last `detect` call
    pub fn last_frame_size(&self) -> Option<(u32, u32)> {
        self.lock().frame_sizes.last().copied()
    }
}

/// Scripted detection backend
pub struct MockBackend {
    name: &'static str,
    available: bool,
    fail_init: bool,
    probe: BackendProbe,
}

impl MockBackend {
    pub fn new(name: &'static str) -> (Self, BackendProbe) {
        let probe = BackendProbe {
            state: Arc::new(Mutex::new(BackendState {
                script: VecDeque::new(),
                default: Reply::empty(),
                initializations: 0,
                detections: 0,
                disposals: 0,
                frame_sizes: Vec::new(),
            })),
        };
        (
            Self {
                name,
                available: true,
                fail_init: false,
                probe: probe.clone(),
            },
            probe,
        )
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn boxed(self) -> Box<dyn DetectionBackend> {
        Box::new(self)
    }
}

impl DetectionBackend for MockBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn initialize(&mut self) -> BoxFuture<'_, BackendResult<()>> {
        let fail = self.fail_init;
        let name = self.name;
        self.probe.lock().initializations += 1;
        Box::pin(async move {
            if fail {
                Err(BackendError::InitializationFailed(format!("{} refused", name)))
            } else {
                Ok(())
            }
        })
    }

    fn detect(&mut self, frame: Arc<CameraFrame>) -> BoxFuture<'_, BackendResult<Vec<DetectedCode>>> {
        let reply = {
            let mut state = self.probe.lock();
            state.detections += 1;
            state.frame_sizes.push((frame.width, frame.height));
            let default = state.default.clone();
            state.script.pop_front().unwrap_or(default)
        };
        Box::pin(async move {
            match reply {
                Reply::Codes(codes) => Ok(codes),
                Reply::Fail => Err(BackendError::DetectionFailed("scripted failure".into())),
                Reply::Hang => futures::future::pending().await,
                Reply::Delayed(delay, codes) => {
                    tokio::time::sleep(delay).await;
                    Ok(codes)
                }
            }
        })
    }

    fn dispose(&mut self) {
        self.probe.lock().disposals += 1;
    }
}

#[derive(Debug, Default)]
struct CameraState {
    acquired: Vec<CameraFacing>,
    releases: usize,
    pauses: usize,
    resumes: usize,
    snapshots: usize,
    acquire_error: Option<DeviceError>,
    snapshot_error: Option<DeviceError>,
    torch_supported: bool,
    torch: Vec<bool>,
}

/// Inspection handle of a [`MockProvider`]
#[derive(Debug, Clone)]
pub struct CameraProbe {
    state: Arc<Mutex<CameraState>>,
}

impl CameraProbe {
    fn lock(&self) -> MutexGuard<'_, CameraState> {
        self.state.lock().unwrap()
    }

    pub fn acquisitions(&self) -> usize {
        self.lock().acquired.len()
    }

    /// Facing of every acquisition, in order
    pub fn acquired_facings(&self) -> Vec<CameraFacing> {
        self.lock().acquired.clone()
    }

    pub fn releases(&self) -> usize {
        self.lock().releases
    }

    /// Devices acquired and not yet released
    pub fn held(&self) -> usize {
        let state = self.lock();
        state.acquired.len() - state.releases
    }

    pub fn pauses(&self) -> usize {
        self.lock().pauses
    }

    pub fn resumes(&self) -> usize {
        self.lock().resumes
    }

    pub fn snapshots(&self) -> usize {
        self.lock().snapshots
    }

    /// Fail the next acquisition
    pub fn fail_next_acquire(&self, error: DeviceError) {
        self.lock().acquire_error = Some(error);
    }

    /// Fail the next snapshot
    pub fn fail_next_snapshot(&self, error: DeviceError) {
        self.lock().snapshot_error = Some(error);
    }

    pub fn set_torch_supported(&self, supported: bool) {
        self.lock().torch_supported = supported;
    }

    /// Every torch value applied to a device
    pub fn torch_calls(&self) -> Vec<bool> {
        self.lock().torch.clone()
    }
}

/// Camera provider handing out streams of one fixed frame
pub struct MockProvider {
    width: u32,
    height: u32,
    probe: CameraProbe,
}

impl MockProvider {
    pub fn new(width: u32, height: u32) -> (Self, CameraProbe) {
        let probe = CameraProbe {
            state: Arc::new(Mutex::new(CameraState::default())),
        };
        (
            Self {
                width,
                height,
                probe: probe.clone(),
            },
            probe,
        )
    }

    pub fn boxed(self) -> Box<dyn CameraProvider> {
        Box::new(self)
    }
}

impl CameraProvider for MockProvider {
    fn acquire(
        &mut self,
        facing: CameraFacing,
    ) -> BoxFuture<'_, Result<Box<dyn CameraStream>, DeviceError>> {
        Box::pin(async move {
            let mut state = self.probe.lock();
            if let Some(error) = state.acquire_error.take() {
                return Err(error);
            }
            state.acquired.push(facing);
            drop(state);
            Ok(Box::new(MockStream {
                frame: Arc::new(gray_frame(self.width, self.height)),
                facing,
                probe: self.probe.clone(),
            }) as Box<dyn CameraStream>)
        })
    }
}

pub struct MockStream {
    frame: Arc<CameraFrame>,
    facing: CameraFacing,
    probe: CameraProbe,
}

impl CameraStream for MockStream {
    fn dimensions(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn snapshot(&mut self) -> Result<Arc<CameraFrame>, DeviceError> {
        let mut state = self.probe.lock();
        state.snapshots += 1;
        match state.snapshot_error.take() {
            Some(error) => Err(error),
            None => Ok(Arc::clone(&self.frame)),
        }
    }

    fn facing(&self) -> CameraFacing {
        self.facing
    }

    fn pause(&mut self) {
        self.probe.lock().pauses += 1;
    }

    fn resume(&mut self) {
        self.probe.lock().resumes += 1;
    }

    fn release(self: Box<Self>) {
        self.probe.lock().releases += 1;
    }

    fn supports_torch(&self) -> bool {
        self.probe.lock().torch_supported
    }

    fn apply_torch(&mut self, enabled: bool) -> Result<(), DeviceError> {
        self.probe.lock().torch.push(enabled);
        Ok(())
    }
}

pub fn gray_frame(width: u32, height: u32) -> CameraFrame {
    CameraFrame::from_gray(width, height, vec![128; (width * height) as usize])
}

/// A square code of side `size` centered on (`cx`, `cy`)
pub fn code_at(cx: f32, cy: f32, size: f32) -> DetectedCode {
    let half = size / 2.0;
    DetectedCode::new(
        "https://example.com".into(),
        None,
        vec![
            Point::new(cx - half, cy - half),
            Point::new(cx + half, cy - half),
            Point::new(cx + half, cy + half),
            Point::new(cx - half, cy + half),
        ],
    )
}

/// Every event received so far
pub fn drain(receiver: &mut UnboundedReceiver<ScannerEvent>) -> Vec<ScannerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

pub fn detected_count(events: &[ScannerEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, ScannerEvent::Detected(_)))
        .count()
}
