// SPDX-License-Identifier: GPL-3.0-only

//! ROI Scanner - region-of-interest barcode and QR code scanning
//!
//! Frames from a camera are cropped to a configurable region of interest,
//! decoded by a native detector with automatic software fallback, smoothed
//! and drawn as an overlay, while detections are published on a channel.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Frame scheduling, overlay rendering and playback control
//! - [`backends`]: Camera source and detection engine abstraction
//! - [`config`]: Scanner configuration
//! - [`constants`]: Design defaults
//! - [`errors`]: Error types
//!
//! # Example
//!
//! ```ignore
//! let (events, mut receiver) = EventSink::channel();
//! let mut scanner = PlaybackController::new(
//!     ScannerConfig::default(),
//!     Box::new(ImageSequenceProvider::from_paths(&paths)?),
//!     None,
//!     Box::new(QrDetector::new()),
//!     RasterSurface::default(),
//!     events,
//! );
//! scanner.start().await?;
//! scanner.step().await;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types
pub use app::frame_processor::{DetectedCode, Point, QrDetector, RoiRect, compute_roi};
pub use app::qr_overlay::{RasterSurface, RecordingSurface, render_overlay};
pub use app::{EventSink, PlaybackController, PlaybackState, ScannerEvent};
pub use backends::camera::ImageSequenceProvider;
pub use config::{RoiConfig, ScannerConfig};
pub use errors::{ScanError, ScanResult};
