// SPDX-License-Identifier: GPL-3.0-only

//! Camera source abstraction
//!
//! The scanner never talks to capture hardware directly. It asks a
//! [`CameraProvider`] for a [`CameraStream`] facing a given direction and
//! pulls frame snapshots from it.
//!
//! ```text
//! ┌──────────────────────┐
//! │  PlaybackController  │  ← owns the stream handle
//! └──────────┬───────────┘
//!            │ acquire / release
//!            ▼
//! ┌──────────────────────┐
//! │    CameraProvider    │
//! └──────────┬───────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐
//! │     CameraStream     │  ← snapshot, pause/resume, torch
//! └──────────────────────┘
//! ```

pub mod file_source;
pub mod types;

pub use crate::constants::CameraFacing;
pub use file_source::ImageSequenceProvider;
pub use types::*;

use crate::errors::DeviceError;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Opens camera devices
pub trait CameraProvider: Send {
    /// Acquire the camera facing `facing`
    ///
    /// Permission and availability problems are reported as [`DeviceError`]
    /// and are not retried by the caller.
    fn acquire(
        &mut self,
        facing: CameraFacing,
    ) -> BoxFuture<'_, Result<Box<dyn CameraStream>, DeviceError>>;
}

/// An acquired, streaming camera device
pub trait CameraStream: Send {
    /// Current frame dimensions (may change between frames)
    fn dimensions(&self) -> (u32, u32);

    /// Snapshot the current frame
    fn snapshot(&mut self) -> Result<Arc<CameraFrame>, DeviceError>;

    /// Which way this device faces
    fn facing(&self) -> CameraFacing;

    /// Pause the media without closing the device
    fn pause(&mut self);

    /// Resume after [`CameraStream::pause`]
    fn resume(&mut self);

    /// Close the device
    fn release(self: Box<Self>);

    /// Whether the device has a controllable torch
    fn supports_torch(&self) -> bool {
        false
    }

    /// Switch the torch; a no-op for devices without one
    fn apply_torch(&mut self, _enabled: bool) -> Result<(), DeviceError> {
        Ok(())
    }
}
