// SPDX-License-Identifier: GPL-3.0-only

//! Scanner overlay rendering
//!
//! The overlay is redrawn completely on every processed frame, in this
//! order:
//!
//! 1. darkened mask over the whole frame with the ROI cut out
//! 2. optional translucent fill inside the ROI
//! 3. ROI border, either a full rounded rectangle or four corner brackets
//! 4. outline of the detected code, mirrored for the front camera
//!
//! # Coordinate System
//!
//! Everything is drawn in frame-pixel coordinates; the surface is resized
//! to the frame at the start of every render.

pub mod paths;
mod raster;
mod recording;

pub use paths::{Path, PathCommand, Polyline};
pub use raster::RasterSurface;
pub use recording::{DrawOp, RecordingSurface, SurfaceLog};

use crate::app::frame_processor::types::{Point, RoiRect};
use crate::config::{BorderStyle, ScannerConfig};
use crate::errors::ScanError;
use serde::{Deserialize, Serialize};

/// RGBA color with components in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::from_rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_array(rgba: [f32; 4]) -> Self {
        Self::from_rgba(rgba[0], rgba[1], rgba[2], rgba[3])
    }

    /// Same color with a different opacity
    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Convert to 8-bit channels
    pub fn to_rgba8(self) -> [u8; 4] {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }
}

/// Drawing surface the overlay is rendered onto
pub trait OverlaySurface: Send {
    /// Start a new, fully transparent frame of the given size
    ///
    /// An error means the surface is gone; the scheduler stops.
    fn begin_frame(&mut self, width: u32, height: u32) -> Result<(), ScanError>;

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color);

    fn fill_path(&mut self, path: &Path, color: Color);

    /// Clear everything inside `path` back to transparent
    fn cut_out(&mut self, path: &Path);

    fn stroke_path(&mut self, path: &Path, color: Color, width: f32);

    /// Reflect subsequent drawing about the frame's vertical centerline
    fn set_mirrored(&mut self, mirrored: bool);
}

/// Per-frame inputs of [`render_overlay`]
#[derive(Debug, Clone, Copy)]
pub struct OverlayFrame<'a> {
    pub frame_width: u32,
    pub frame_height: u32,
    pub roi: RoiRect,
    /// A code was detected this frame (selects the active border color)
    pub active: bool,
    /// Smoothed outline of the top detection
    pub outline: Option<&'a [Point]>,
    pub mirrored: bool,
}

/// Draw the full overlay for one frame
pub fn render_overlay(
    surface: &mut dyn OverlaySurface,
    frame: &OverlayFrame<'_>,
    config: &ScannerConfig,
) -> Result<(), ScanError> {
    surface.begin_frame(frame.frame_width, frame.frame_height)?;
    surface.set_mirrored(false);

    let roi_config = &config.roi;
    let colors = &config.colors;
    let roi = &frame.roi;
    let roi_path = paths::rounded_rect(roi, roi_config.corner_radius);

    if config.show_mask {
        surface.fill_rect(
            0.0,
            0.0,
            frame.frame_width as f32,
            frame.frame_height as f32,
            colors.mask,
        );
        if !roi.is_empty() {
            surface.cut_out(&roi_path);
        }
    }

    if roi_config.fill_opacity > 0.0 && !roi.is_empty() {
        surface.fill_path(&roi_path, colors.fill.with_alpha(roi_config.fill_opacity));
    }

    let border_color = if frame.active {
        colors.active
    } else {
        colors.idle
    };

    match roi_config.border_style {
        BorderStyle::Full => {
            if roi_config.border_width > 0.0 {
                surface.stroke_path(&roi_path, border_color, roi_config.border_width);
            }
        }
        BorderStyle::Corner => {
            if roi_config.corner_width > 0.0 {
                for bracket in
                    paths::corner_brackets(roi, roi_config.corner_radius, roi_config.corner_length)
                {
                    surface.stroke_path(&bracket, border_color, roi_config.corner_width);
                }
            }
        }
    }

    if let Some(outline) = frame.outline.filter(|points| points.len() >= 3) {
        surface.set_mirrored(frame.mirrored);
        surface.stroke_path(&Path::polygon(outline), colors.outline, colors.outline_width);
        surface.set_mirrored(false);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoiConfig;

    fn outline() -> Vec<Point> {
        vec![
            Point::new(10.0, 10.0),
            Point::new(30.0, 10.0),
            Point::new(30.0, 30.0),
            Point::new(10.0, 30.0),
        ]
    }

    fn render(config: &ScannerConfig, active: bool, outline: Option<&[Point]>, mirrored: bool) -> Vec<DrawOp> {
        let mut surface = RecordingSurface::new();
        let log = surface.log();
        let frame = OverlayFrame {
            frame_width: 200,
            frame_height: 100,
            roi: RoiRect::new(50, 0, 100, 100),
            active,
            outline,
            mirrored,
        };
        render_overlay(&mut surface, &frame, config).unwrap();
        log.ops()
    }

    #[test]
    fn test_draw_order_with_corner_brackets() {
        let config = ScannerConfig {
            roi: RoiConfig {
                fill_opacity: 0.2,
                ..RoiConfig::default()
            },
            ..ScannerConfig::default()
        };
        let points = outline();
        let ops = render(&config, true, Some(&points), false);

        assert!(matches!(ops[0], DrawOp::BeginFrame { width: 200, height: 100 }));
        assert!(matches!(ops[2], DrawOp::FillRect { .. }));
        assert!(matches!(ops[3], DrawOp::CutOut { .. }));
        assert!(matches!(ops[4], DrawOp::FillPath { .. }));
        let brackets = ops
            .iter()
            .filter(|op| matches!(op, DrawOp::StrokePath { color, .. } if *color == config.colors.active))
            .count();
        assert_eq!(brackets, 4);
        assert!(matches!(
            ops.last(),
            Some(DrawOp::SetMirrored(false))
        ));
    }

    #[test]
    fn test_idle_color_and_no_mask() {
        let config = ScannerConfig {
            show_mask: false,
            roi: RoiConfig {
                border_style: BorderStyle::Full,
                ..RoiConfig::default()
            },
            ..ScannerConfig::default()
        };
        let ops = render(&config, false, None, false);

        assert!(!ops.iter().any(|op| matches!(op, DrawOp::FillRect { .. } | DrawOp::CutOut { .. })));
        let strokes: Vec<_> = ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::StrokePath { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert_eq!(strokes, vec![config.colors.idle]);
    }

    #[test]
    fn test_outline_is_mirrored_on_request() {
        let config = ScannerConfig::default();
        let points = outline();
        let ops = render(&config, true, Some(&points), true);

        let mirror_on = ops
            .iter()
            .position(|op| *op == DrawOp::SetMirrored(true))
            .expect("outline mirrored");
        assert!(matches!(
            &ops[mirror_on + 1],
            DrawOp::StrokePath { color, .. } if *color == config.colors.outline
        ));
    }

    #[test]
    fn test_color_conversion() {
        assert_eq!(Color::from_rgb(1.0, 0.0, 0.5).to_rgba8(), [255, 0, 128, 255]);
        assert_eq!(Color::from_rgb(2.0, -1.0, 0.0).with_alpha(0.0).to_rgba8(), [255, 0, 0, 0]);
    }
}
