// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame scheduling
//!
//! [`FrameScheduler::tick`] is called once per display refresh. Every
//! `frame_skip`-th tick is processed:
//!
//! ```text
//! snapshot ─▶ crop to ROI ─▶ detect ─▶ ROI filter ─▶ smooth ─▶ emit ─▶ overlay
//! ```
//!
//! The remaining ticks only redraw the overlay from the last known state.
//! A failure inside one frame is reported and the next tick runs as usual;
//! only losing the overlay surface stops the scheduler.

use super::roi::compute_roi;
use super::smoothing::{SmoothingFilter, centroid};
use super::types::{DetectedCode, Point, RoiRect};
use crate::app::qr_overlay::{OverlayFrame, OverlaySurface, render_overlay};
use crate::app::state::{EventSink, ScannerEvent};
use crate::backends::camera::CameraStream;
use crate::backends::detection::{BackendResult, DetectionEngineSelector, EngineKind};
use crate::config::ScannerConfig;
use crate::constants::timing::FRAME_LOG_INTERVAL;
use crate::errors::{BackendError, ScanError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace, warn};

/// Cooperative cancellation for in-flight frames
///
/// Every clone shares one epoch counter. A tick remembers the epoch it
/// started in and drops its results if the epoch moved while it was
/// waiting for the detector.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    epoch: Arc<AtomicU64>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate every frame currently in flight
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch() == epoch
    }
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Throttled by the frame-skip factor; overlay redrawn only
    Skipped,
    /// Frame processed; `detections` is the number of accepted codes
    Processed { detections: usize },
    /// The detector missed its budget; frame dropped
    Stalled,
    /// A per-frame error was reported; scheduling continues
    Failed,
    /// Cancelled while detecting; results discarded
    Cancelled,
    /// A code was found with stop-after-detection enabled
    StoppedAfterDetection,
    /// The scheduler cannot continue
    Fatal(ScanError),
}

impl TickOutcome {
    /// Whether the next tick should be scheduled
    pub fn reschedule(&self) -> bool {
        !matches!(
            self,
            TickOutcome::StoppedAfterDetection | TickOutcome::Fatal(_)
        )
    }
}

/// Last drawn overlay state, replayed on skipped ticks
#[derive(Debug, Clone, Copy, Default)]
struct OverlayMemory {
    dimensions: Option<(u32, u32)>,
    active: bool,
}

/// Per-session frame pipeline
pub struct FrameScheduler {
    config: ScannerConfig,
    selector: DetectionEngineSelector,
    smoothing: SmoothingFilter,
    events: EventSink,
    cancel: CancelToken,
    ticks: u64,
    frames_processed: u64,
    overlay: OverlayMemory,
}

impl FrameScheduler {
    pub fn new(config: ScannerConfig, selector: DetectionEngineSelector, events: EventSink) -> Self {
        let config = config.sanitized();
        Self {
            smoothing: SmoothingFilter::new(config.smoothing_alpha),
            config,
            selector,
            events,
            cancel: CancelToken::new(),
            ticks: 0,
            frames_processed: 0,
            overlay: OverlayMemory::default(),
        }
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    pub fn active_engine(&self) -> Option<EngineKind> {
        self.selector.active_engine()
    }

    /// Shared cancellation token of this scheduler
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Last smoothed outline
    pub fn smoothed_outline(&self) -> Option<&[Point]> {
        self.smoothing.current()
    }

    /// Choose the detection engine from scratch
    pub async fn initialize_engine(&mut self) -> BackendResult<EngineKind> {
        self.selector.initialize().await
    }

    pub fn dispose_engine(&mut self) {
        self.selector.dispose();
    }

    /// Clear the session state; the next tick starts a fresh cadence
    pub fn reset(&mut self) {
        self.ticks = 0;
        self.smoothing.reset();
        self.overlay = OverlayMemory::default();
    }

    /// Run one scheduled tick
    pub async fn tick(
        &mut self,
        stream: &mut dyn CameraStream,
        surface: &mut dyn OverlaySurface,
    ) -> TickOutcome {
        self.ticks += 1;
        let mirrored = self.config.mirrored_for(stream.facing());

        if self.ticks % u64::from(self.config.frame_skip) != 0 {
            trace!(tick = self.ticks, "Frame skipped");
            let dimensions = self.overlay.dimensions.unwrap_or_else(|| stream.dimensions());
            return match self.redraw(surface, dimensions, mirrored) {
                Ok(()) => TickOutcome::Skipped,
                Err(e) => self.fatal(e),
            };
        }

        let epoch = self.cancel.epoch();
        let frame = match stream.snapshot() {
            Ok(frame) if frame.width == 0 || frame.height == 0 => {
                return self.frame_failed(
                    surface,
                    ScanError::Pipeline("camera produced an empty frame".into()),
                    mirrored,
                );
            }
            Ok(frame) => frame,
            Err(e) => return self.frame_failed(surface, ScanError::Device(e), mirrored),
        };
        let (width, height) = (frame.width, frame.height);
        self.track_dimensions(width, height);

        let roi = compute_roi(width, height, &self.config.roi);
        if self.config.crop_to_roi && roi.is_empty() {
            debug!(tick = self.ticks, ?roi, "ROI is empty, nothing to decode");
            self.frames_processed += 1;
            self.smoothing.reset();
            self.overlay.active = false;
            return match self.draw(surface, (width, height), roi, mirrored) {
                Ok(()) => TickOutcome::Processed { detections: 0 },
                Err(e) => self.fatal(e),
            };
        }
        let (input, offset) = if self.config.crop_to_roi {
            (Arc::new(frame.crop(roi)), (roi.x, roi.y))
        } else {
            (frame, (0, 0))
        };

        let budget = self.config.detect_stall_budget();
        let detected = tokio::time::timeout(budget, self.selector.detect(input)).await;

        if !self.cancel.is_current(epoch) {
            debug!(tick = self.ticks, "Discarding results of a cancelled frame");
            return TickOutcome::Cancelled;
        }

        let codes = match detected {
            Ok(Ok(codes)) => codes,
            Ok(Err(e)) => return self.frame_failed(surface, ScanError::Backend(e), mirrored),
            Err(_) => {
                let stall = BackendError::Stalled {
                    budget_ms: budget.as_millis() as u64,
                };
                warn!(tick = self.ticks, error = %stall, "Skipping stalled frame");
                return match self.redraw(surface, (width, height), mirrored) {
                    Ok(()) => TickOutcome::Stalled,
                    Err(e) => self.fatal(e),
                };
            }
        };

        let codes = self.accept(codes, offset, &roi);
        self.frames_processed += 1;
        if self.frames_processed % FRAME_LOG_INTERVAL == 0 {
            debug!(
                frames = self.frames_processed,
                engine = ?self.selector.active_engine(),
                "Frame processing heartbeat"
            );
        }

        match codes.first().and_then(DetectedCode::polygon) {
            Some(polygon) => {
                self.smoothing.update(polygon);
            }
            None => self.smoothing.reset(),
        }

        let active = !codes.is_empty();
        if active && self.config.emit_detections {
            debug!(count = codes.len(), "Publishing detections");
            self.events.emit(ScannerEvent::Detected(codes.clone()));
        }

        self.overlay.active = active;
        if let Err(e) = self.draw(surface, (width, height), roi, mirrored) {
            return self.fatal(e);
        }

        if active && self.config.stop_after_detection {
            info!(count = codes.len(), "Stopping after first detection");
            if let Err(e) = self.draw(surface, (width, height), roi, mirrored) {
                return self.fatal(e);
            }
            return TickOutcome::StoppedAfterDetection;
        }

        TickOutcome::Processed {
            detections: codes.len(),
        }
    }

    /// Translate to frame coordinates and apply the ROI-only filter
    fn accept(&self, codes: Vec<DetectedCode>, offset: (u32, u32), roi: &RoiRect) -> Vec<DetectedCode> {
        let codes: Vec<DetectedCode> = if offset == (0, 0) {
            codes
        } else {
            let (dx, dy) = (offset.0 as f32, offset.1 as f32);
            codes.iter().map(|code| code.translated(dx, dy)).collect()
        };

        if !self.config.roi_only || codes.is_empty() {
            return codes;
        }

        let inside = codes
            .first()
            .and_then(DetectedCode::polygon)
            .and_then(centroid)
            .is_some_and(|center| roi.contains(center));
        if inside {
            codes
        } else {
            trace!(count = codes.len(), "Detections outside the ROI discarded");
            Vec::new()
        }
    }

    fn track_dimensions(&mut self, width: u32, height: u32) {
        match self.overlay.dimensions {
            Some(previous) if previous != (width, height) => {
                info!(
                    from = ?previous,
                    to = ?(width, height),
                    "Frame dimensions changed"
                );
                self.smoothing.reset();
            }
            None => debug!(width, height, "First frame"),
            _ => {}
        }
        self.overlay.dimensions = Some((width, height));
    }

    fn draw(
        &self,
        surface: &mut dyn OverlaySurface,
        (frame_width, frame_height): (u32, u32),
        roi: RoiRect,
        mirrored: bool,
    ) -> Result<(), ScanError> {
        let outline = if self.overlay.active {
            self.smoothing.current()
        } else {
            None
        };
        let frame = OverlayFrame {
            frame_width,
            frame_height,
            roi,
            active: self.overlay.active,
            outline,
            mirrored,
        };
        render_overlay(surface, &frame, &self.config)
    }

    /// Repaint the last overlay state for a frame of the given size
    fn redraw(
        &self,
        surface: &mut dyn OverlaySurface,
        (width, height): (u32, u32),
        mirrored: bool,
    ) -> Result<(), ScanError> {
        let roi = compute_roi(width, height, &self.config.roi);
        self.draw(surface, (width, height), roi, mirrored)
    }

    fn frame_failed(
        &mut self,
        surface: &mut dyn OverlaySurface,
        error: ScanError,
        mirrored: bool,
    ) -> TickOutcome {
        if error.is_scheduler_fatal() {
            return self.fatal(error);
        }
        warn!(tick = self.ticks, error = %error, "Frame processing failed");
        self.events.emit(ScannerEvent::Error(error));

        self.overlay.active = false;
        self.smoothing.reset();
        if let Some(dimensions) = self.overlay.dimensions {
            if let Err(e) = self.redraw(surface, dimensions, mirrored) {
                return self.fatal(e);
            }
        }
        TickOutcome::Failed
    }

    fn fatal(&mut self, error: ScanError) -> TickOutcome {
        warn!(error = %error, "Frame scheduler stopped");
        self.events.emit(ScannerEvent::Error(error.clone()));
        TickOutcome::Fatal(error)
    }
}
