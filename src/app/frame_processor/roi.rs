// SPDX-License-Identifier: GPL-3.0-only

//! Region-of-interest geometry
//!
//! The ROI is never stored: it is recomputed from the configuration and the
//! current frame size on every frame, because the video source may change
//! resolution at any time.

use super::types::RoiRect;
use crate::config::{RoiConfig, RoiShape};

/// Compute the ROI rectangle for a frame
///
/// The ROI is sized from the frame's shorter side, centered, then shrunk by
/// `padding` on every edge. Out-of-range configuration values are clamped,
/// so the result always lies inside the frame with non-negative size.
pub fn compute_roi(frame_width: u32, frame_height: u32, config: &RoiConfig) -> RoiRect {
    let config = config.sanitized();

    let short_side = frame_width.min(frame_height);
    let base = ((short_side as f32 * config.size_ratio).floor().max(0.0) as u32).min(short_side);

    let (width, height) = match config.shape {
        RoiShape::Square => (base, base),
        RoiShape::Rect => {
            let aspect = config.aspect_ratio;
            if aspect >= 1.0 {
                (base, (base as f32 / aspect).floor() as u32)
            } else {
                ((base as f32 * aspect).floor() as u32, base)
            }
        }
    };

    let x = (frame_width - width) / 2;
    let y = (frame_height - height) / 2;

    // Padding larger than half an edge collapses that edge onto its center
    let padding = config.padding.floor() as u32;
    let inset_x = padding.min(width / 2);
    let inset_y = padding.min(height / 2);

    RoiRect::new(
        x + inset_x,
        y + inset_y,
        width.saturating_sub(padding.saturating_mul(2)),
        height.saturating_sub(padding.saturating_mul(2)),
    )
}
