// SPDX-License-Identifier: GPL-3.0-only

//! Frame processing
//!
//! Everything that happens to a single camera frame: the ROI computed for
//! it, the detection run on it, the smoothing of the resulting outline and
//! the [`FrameScheduler`] that ties these together on every tick.

pub mod roi;
pub mod scheduler;
pub mod smoothing;
pub mod tasks;
pub mod types;

pub use roi::compute_roi;
pub use scheduler::{CancelToken, FrameScheduler, TickOutcome};
pub use smoothing::{SmoothingFilter, centroid, smooth};
pub use tasks::QrDetector;
pub use types::{BarcodeFormat, DetectedCode, Point, RoiRect};
