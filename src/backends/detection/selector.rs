// SPDX-License-Identifier: GPL-3.0-only

//! Detection engine selection with automatic fallback
//!
//! ```text
//!                 timeout | empty streak | native error
//!  NativeActive ─────────────────────────────────────────▶ FallbackActive
//! ```
//!
//! The native engine is preferred when it is available and not disabled by
//! configuration. Once demoted, the session stays on the fallback engine
//! until the selector is initialized again (e.g. after a camera switch).

use super::{BackendResult, DetectionBackend, EngineKind};
use crate::app::frame_processor::types::DetectedCode;
use crate::app::state::{EventSink, ScannerEvent};
use crate::backends::camera::CameraFrame;
use crate::config::ScannerConfig;
use crate::errors::BackendError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Which engine is active, and the counters driving demotion
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub active: EngineKind,
    /// Consecutive empty results from the active engine
    pub zero_result_streak: u32,
    /// When the active engine was entered
    pub active_since: Instant,
}

/// Fallback policy taken from [`ScannerConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FallbackPolicy {
    pub force_fallback: bool,
    pub native_timeout: Option<Duration>,
    pub max_zero_frames: Option<u32>,
}

impl From<&ScannerConfig> for FallbackPolicy {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            force_fallback: config.force_fallback,
            native_timeout: config.native_timeout(),
            max_zero_frames: config.native_max_zero_frames(),
        }
    }
}

/// Owns both detection engines and routes each frame to the active one
pub struct DetectionEngineSelector {
    native: Option<Box<dyn DetectionBackend>>,
    fallback: Box<dyn DetectionBackend>,
    policy: FallbackPolicy,
    state: Option<EngineState>,
    native_ready: bool,
    fallback_ready: bool,
    events: EventSink,
}

impl DetectionEngineSelector {
    /// Create a selector; `native` is `None` when the host has no detector
    pub fn new(
        native: Option<Box<dyn DetectionBackend>>,
        fallback: Box<dyn DetectionBackend>,
        policy: FallbackPolicy,
        events: EventSink,
    ) -> Self {
        Self {
            native,
            fallback,
            policy,
            state: None,
            native_ready: false,
            fallback_ready: false,
            events,
        }
    }

    /// Current engine state, `None` before initialization
    pub fn state(&self) -> Option<&EngineState> {
        self.state.as_ref()
    }

    pub fn active_engine(&self) -> Option<EngineKind> {
        self.state.as_ref().map(|s| s.active)
    }

    /// Choose the starting engine from scratch
    ///
    /// Disposes whatever was running before. Fails only when neither engine
    /// can be initialized.
    pub async fn initialize(&mut self) -> BackendResult<EngineKind> {
        self.dispose();
        let now = Instant::now();

        if self.policy.force_fallback {
            info!("Native detector disabled by configuration");
        } else if let Some(native) = self.native.as_mut() {
            if !native.is_available() {
                info!(backend = native.name(), "Native detector not available on this host");
            } else {
                match native.initialize().await {
                    Ok(()) => {
                        self.native_ready = true;
                        self.enter(EngineKind::Native, now);
                        return Ok(EngineKind::Native);
                    }
                    Err(e) => {
                        warn!(backend = native.name(), error = %e, "Native detector failed to initialize");
                    }
                }
            }
        }

        if let Err(e) = self.fallback.initialize().await {
            warn!(backend = self.fallback.name(), error = %e, "Fallback detector failed to initialize");
            return Err(BackendError::NotAvailable(format!(
                "no detection engine could be initialized: {}",
                e
            )));
        }
        self.fallback_ready = true;
        self.enter(EngineKind::Fallback, now);
        Ok(EngineKind::Fallback)
    }

    /// Detect codes with the active engine
    pub async fn detect(&mut self, frame: Arc<CameraFrame>) -> BackendResult<Vec<DetectedCode>> {
        self.detect_at(frame, Instant::now()).await
    }

    /// Detect codes, evaluating the native time budget against `now`
    ///
    /// Native failures never reach the caller: they demote the session to
    /// the fallback engine, which then handles the same frame. Errors from
    /// the fallback engine are returned.
    pub async fn detect_at(
        &mut self,
        frame: Arc<CameraFrame>,
        now: Instant,
    ) -> BackendResult<Vec<DetectedCode>> {
        let Some(state) = self.state.as_ref() else {
            return Err(BackendError::NotInitialized);
        };

        if state.active == EngineKind::Fallback {
            return self.detect_fallback(frame).await;
        }

        if let Some(timeout) = self.policy.native_timeout {
            let elapsed = now.saturating_duration_since(state.active_since);
            if elapsed >= timeout {
                info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Native detector exceeded its time budget"
                );
                self.demote(now);
                return self.detect_fallback(frame).await;
            }
        }

        let Some(native) = self.native.as_mut() else {
            self.demote(now);
            return self.detect_fallback(frame).await;
        };

        match native.detect(Arc::clone(&frame)).await {
            Ok(codes) => {
                if codes.is_empty() {
                    self.record_empty_result(now);
                } else if let Some(state) = self.state.as_mut() {
                    state.zero_result_streak = 0;
                }
                Ok(codes)
            }
            Err(e) => {
                warn!(error = %e, "Native detector failed, switching to fallback");
                self.demote(now);
                self.detect_fallback(frame).await
            }
        }
    }

    /// Release both engines; `detect` fails until the next `initialize`
    pub fn dispose(&mut self) {
        if self.native_ready {
            if let Some(native) = self.native.as_mut() {
                native.dispose();
            }
            self.native_ready = false;
        }
        if self.fallback_ready {
            self.fallback.dispose();
            self.fallback_ready = false;
        }
        self.state = None;
    }

    fn record_empty_result(&mut self, now: Instant) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.zero_result_streak += 1;
        let streak = state.zero_result_streak;
        if let Some(max) = self.policy.max_zero_frames {
            if streak >= max {
                info!(streak, "Native detector found nothing for too long");
                self.demote(now);
            }
        }
    }

    fn demote(&mut self, now: Instant) {
        if self.native_ready {
            if let Some(native) = self.native.as_mut() {
                native.dispose();
            }
            self.native_ready = false;
        }
        self.enter(EngineKind::Fallback, now);
    }

    async fn detect_fallback(&mut self, frame: Arc<CameraFrame>) -> BackendResult<Vec<DetectedCode>> {
        if !self.fallback_ready {
            self.fallback.initialize().await?;
            self.fallback_ready = true;
        }
        let codes = self.fallback.detect(frame).await?;
        if let Some(state) = self.state.as_mut() {
            if codes.is_empty() {
                state.zero_result_streak += 1;
            } else {
                state.zero_result_streak = 0;
            }
        }
        Ok(codes)
    }

    fn enter(&mut self, kind: EngineKind, now: Instant) {
        info!(engine = %kind, "Detection engine selected");
        self.state = Some(EngineState {
            active: kind,
            zero_result_streak: 0,
            active_since: now,
        });
        self.events.emit(ScannerEvent::EngineChanged(kind));
    }
}

impl Drop for DetectionEngineSelector {
    fn drop(&mut self) {
        self.dispose();
    }
}
