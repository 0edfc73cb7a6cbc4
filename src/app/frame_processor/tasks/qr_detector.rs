// SPDX-License-Identifier: GPL-3.0-only

//! Software QR code detection
//!
//! This is the fallback engine. It converts frames to grayscale, downscales
//! them for speed and runs the `rqrr` decoder, reporting each code with the
//! four corners of its grid in the coordinates of the frame it was given.

use crate::app::frame_processor::types::{BarcodeFormat, DetectedCode, Point};
use crate::backends::camera::types::CameraFrame;
use crate::backends::detection::{BackendResult, DetectionBackend};
use crate::constants::engine::FALLBACK_MAX_DIMENSION;
use crate::errors::BackendError;
use futures::future::BoxFuture;
use rqrr::PreparedImage;
use std::sync::Arc;
use tracing::{debug, trace};

/// QR code detector
///
/// Analyzes camera frames to detect and decode QR codes.
/// Optimized for real-time processing with frame downscaling.
pub struct QrDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
    initialized: bool,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a new QR detector with default settings
    pub fn new() -> Self {
        Self::with_max_dimension(FALLBACK_MAX_DIMENSION)
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
            initialized: false,
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }
}

impl DetectionBackend for QrDetector {
    fn name(&self) -> &'static str {
        "rqrr"
    }

    fn initialize(&mut self) -> BoxFuture<'_, BackendResult<()>> {
        Box::pin(async move {
            self.initialized = true;
            debug!(max_dimension = self.max_dimension, "QR detector ready");
            Ok(())
        })
    }

    fn detect(&mut self, frame: Arc<CameraFrame>) -> BoxFuture<'_, BackendResult<Vec<DetectedCode>>> {
        let max_dim = self.max_dimension;
        let initialized = self.initialized;
        Box::pin(async move {
            if !initialized {
                return Err(BackendError::NotInitialized);
            }
            // Run detection in a blocking task to avoid blocking the async runtime
            tokio::task::spawn_blocking(move || detect_sync(&frame, max_dim))
                .await
                .map_err(|e| BackendError::DetectionFailed(format!("QR detection task failed: {}", e)))
        })
    }

    fn dispose(&mut self) {
        self.initialized = false;
    }
}

/// Size the frame is processed at, and the per-axis factors back to frame pixels
///
/// The processed size is truncated to whole pixels, so the two factors can
/// differ slightly from each other.
fn processing_size(width: u32, height: u32, max_dimension: u32) -> (u32, u32, f32, f32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height, 1.0, 1.0);
    }
    let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
    let new_width = ((width as f32 / scale) as u32).max(1);
    let new_height = ((height as f32 / scale) as u32).max(1);
    (
        new_width,
        new_height,
        width as f32 / new_width as f32,
        height as f32 / new_height as f32,
    )
}

/// Synchronous QR detection (runs in blocking task)
fn detect_sync(frame: &CameraFrame, max_dimension: u32) -> Vec<DetectedCode> {
    let start = std::time::Instant::now();
    if frame.width == 0 || frame.height == 0 {
        return Vec::new();
    }

    let (proc_width, proc_height, x_scale, y_scale) =
        processing_size(frame.width, frame.height, max_dimension);
    let luma = if (proc_width, proc_height) != (frame.width, frame.height) {
        downscale_luma(frame, proc_width, proc_height)
    } else {
        copy_luma(frame)
    };
    trace!(
        proc_width,
        proc_height,
        x_scale,
        y_scale,
        conversion_ms = start.elapsed().as_millis(),
        "Prepared grayscale image for processing"
    );

    let w = proc_width as usize;
    let mut prepared =
        PreparedImage::prepare_from_greyscale(w, proc_height as usize, |x, y| luma[y * w + x]);
    let grids = prepared.detect_grids();
    trace!(count = grids.len(), "QR grids located");

    let mut detections = Vec::with_capacity(grids.len());
    for grid in grids {
        let content = match grid.decode() {
            Ok((_meta, content)) => content,
            Err(e) => {
                debug!(error = %e, "Failed to decode QR code");
                continue;
            }
        };

        // Scale back to original frame coordinates
        let corners: Vec<Point> = grid
            .bounds
            .iter()
            .map(|p| Point::new(p.x as f32 * x_scale, p.y as f32 * y_scale))
            .collect();

        debug!(content = %content, "Detected QR code");
        detections.push(DetectedCode::new(content, Some(BarcodeFormat::QrCode), corners));
    }

    if !detections.is_empty() {
        debug!(
            count = detections.len(),
            total_ms = start.elapsed().as_millis(),
            "QR detection found codes"
        );
    }
    detections
}

/// Grayscale copy of the frame without stride padding
fn copy_luma(frame: &CameraFrame) -> Vec<u8> {
    let (width, height) = (frame.width as usize, frame.height as usize);
    let mut result = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            result.push(frame.luma_at(x, y));
        }
    }
    result
}

/// Downscale the frame to grayscale using bilinear interpolation
fn downscale_luma(frame: &CameraFrame, dst_width: u32, dst_height: u32) -> Vec<u8> {
    let src_width = frame.width as usize;
    let src_height = frame.height as usize;
    let mut result = Vec::with_capacity((dst_width * dst_height) as usize);

    let x_ratio = src_width as f32 / dst_width as f32;
    let y_ratio = src_height as f32 / dst_height as f32;

    for y in 0..dst_height {
        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let src_y = y as f32 * y_ratio;

            let x0 = (src_x as usize).min(src_width - 1);
            let y0 = (src_y as usize).min(src_height - 1);
            let x1 = (x0 + 1).min(src_width - 1);
            let y1 = (y0 + 1).min(src_height - 1);

            let x_frac = src_x - x0 as f32;
            let y_frac = src_y - y0 as f32;

            let p00 = frame.luma_at(x0, y0) as f32;
            let p01 = frame.luma_at(x1, y0) as f32;
            let p10 = frame.luma_at(x0, y1) as f32;
            let p11 = frame.luma_at(x1, y1) as f32;

            let value = p00 * (1.0 - x_frac) * (1.0 - y_frac)
                + p01 * x_frac * (1.0 - y_frac)
                + p10 * (1.0 - x_frac) * y_frac
                + p11 * x_frac * y_frac;

            result.push(value as u8);
        }
    }

    result
}
