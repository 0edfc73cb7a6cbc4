// SPDX-License-Identifier: GPL-3.0-only

//! Scanner application layer
//!
//! # Architecture
//!
//! - `frame_processor`: ROI geometry, smoothing and the per-frame scheduler
//! - `qr_overlay`: Overlay rendering onto a drawing surface
//! - `playback`: Session lifecycle (start, pause, resume, camera switching)
//! - `state`: Playback state, events and commands
//!
//! # Main Types
//!
//! - `PlaybackController`: Owns the camera device and drives the scheduler
//! - `FrameScheduler`: Runs one frame through detection and drawing
//! - `ScannerEvent`: What consumers receive on the event channel

pub mod frame_processor;
pub mod playback;
pub mod qr_overlay;
pub mod state;

pub use frame_processor::{FrameScheduler, TickOutcome};
pub use playback::{PlaybackController, PlaybackHandle};
pub use state::{EventSink, PlaybackCommand, PlaybackState, ScannerEvent};
