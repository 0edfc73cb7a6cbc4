// SPDX-License-Identifier: GPL-3.0-only

//! Scanner state and the messages exchanged with consumers

use crate::app::frame_processor::types::DetectedCode;
use crate::backends::detection::EngineKind;
use crate::errors::ScanError;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;

/// Playback state of a scanner session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Not started, or shut down
    Idle,
    /// Frames are being scheduled
    Running,
    /// Paused with the camera device still held
    PausedRetained,
    /// Paused with the camera device released
    PausedReleased,
    /// Stopped by the first detection; only `restart` leaves this state
    StoppedAfterDetection,
}

impl PlaybackState {
    pub fn is_running(&self) -> bool {
        matches!(self, PlaybackState::Running)
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Running => "running",
            PlaybackState::PausedRetained => "paused (device retained)",
            PlaybackState::PausedReleased => "paused (device released)",
            PlaybackState::StoppedAfterDetection => "stopped after detection",
        };
        f.write_str(name)
    }
}

/// Events published to the consumer
#[derive(Debug, Clone, PartialEq)]
pub enum ScannerEvent {
    /// Non-empty detections of one processed frame
    Detected(Vec<DetectedCode>),
    /// A per-frame failure or a fatal pipeline failure
    Error(ScanError),
    /// The active detection engine changed (including the initial choice)
    EngineChanged(EngineKind),
    /// The playback state changed
    StateChanged(PlaybackState),
}

/// Commands accepted by [`PlaybackController::run`](crate::app::playback::PlaybackController::run)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Pause,
    Resume,
    /// Apply the pause flag
    SetPaused(bool),
    /// Toggle between front and back camera
    SwitchCamera,
    /// Leave any state and scan again from scratch
    Restart,
    SetTorch(bool),
    /// Release everything and leave the run loop
    Shutdown,
}

/// Outbound event channel
///
/// Cloned into every component that publishes. Sending never blocks; if the
/// consumer went away the event is dropped.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<mpsc::UnboundedSender<ScannerEvent>>,
}

impl EventSink {
    /// Create a sink and the receiving end for the consumer
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ScannerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// A sink that drops every event
    pub fn disconnected() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: ScannerEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                trace!("Event receiver dropped");
            }
        }
    }
}
