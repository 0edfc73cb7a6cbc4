// SPDX-License-Identifier: GPL-3.0-only

//! CPU rasterizer for the overlay
//!
//! Draws onto an `image::RgbaImage` so overlays can be composited or saved
//! without a GPU. Fills use the even-odd rule sampled at pixel centers;
//! strokes cover every pixel whose center lies within half the stroke width
//! of the path.

use super::{Color, OverlaySurface, Path, Polyline};
use crate::app::frame_processor::types::Point;
use crate::constants::overlay::ARC_SEGMENTS_PER_QUARTER;
use crate::errors::{ScanError, ScanResult};
use image::{Rgba, RgbaImage};
use std::path::Path as FsPath;
use tracing::debug;

/// Overlay surface backed by an RGBA image
pub struct RasterSurface {
    canvas: RgbaImage,
    mirrored: bool,
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width, height),
            mirrored: false,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Write the current overlay as PNG (or any format `image` infers)
    pub fn save(&self, path: &FsPath) -> ScanResult<()> {
        self.canvas.save(path)?;
        debug!(path = %path.display(), "Saved overlay image");
        Ok(())
    }

    fn polylines(&self, path: &Path) -> Vec<Polyline> {
        let width = self.canvas.width() as f32;
        let mut polylines = path.flatten(ARC_SEGMENTS_PER_QUARTER);
        if self.mirrored {
            for polyline in &mut polylines {
                for point in &mut polyline.points {
                    *point = point.mirrored(width);
                }
            }
        }
        polylines
    }

    /// Coverage mask of the even-odd interior of `polylines`
    fn fill_mask(&self, polylines: &[Polyline]) -> Vec<bool> {
        let (width, height) = self.canvas.dimensions();
        let mut mask = vec![false; (width * height) as usize];
        let edges: Vec<(Point, Point)> = polylines
            .iter()
            .flat_map(|polyline| {
                let n = polyline.points.len();
                // fills always close their subpaths
                (0..n).map(move |i| (polyline.points[i], polyline.points[(i + 1) % n]))
            })
            .collect();

        let mut crossings = Vec::new();
        for row in 0..height {
            let yc = row as f32 + 0.5;
            crossings.clear();
            for (a, b) in &edges {
                if (a.y <= yc && b.y > yc) || (b.y <= yc && a.y > yc) {
                    let t = (yc - a.y) / (b.y - a.y);
                    crossings.push(a.x + t * (b.x - a.x));
                }
            }
            crossings.sort_by(|a, b| a.total_cmp(b));
            for span in crossings.chunks_exact(2) {
                let start = (span[0] - 0.5).ceil().max(0.0) as u32;
                let end = ((span[1] - 0.5).ceil().max(0.0) as u32).min(width);
                for col in start..end {
                    mask[(row * width + col) as usize] = true;
                }
            }
        }
        mask
    }

    /// Coverage mask of a stroke of `stroke_width` along `polylines`
    fn stroke_mask(&self, polylines: &[Polyline], stroke_width: f32) -> Vec<bool> {
        let (width, height) = self.canvas.dimensions();
        let mut mask = vec![false; (width * height) as usize];
        if width == 0 || height == 0 {
            return mask;
        }
        let half = (stroke_width / 2.0).max(0.5);

        for polyline in polylines {
            let n = polyline.points.len();
            let segments = if polyline.closed { n } else { n.saturating_sub(1) };
            for i in 0..segments {
                let a = polyline.points[i];
                let b = polyline.points[(i + 1) % n];
                let min_x = (a.x.min(b.x) - half).floor().max(0.0) as u32;
                let max_x = ((a.x.max(b.x) + half).ceil().max(0.0) as u32).min(width - 1);
                let min_y = (a.y.min(b.y) - half).floor().max(0.0) as u32;
                let max_y = ((a.y.max(b.y) + half).ceil().max(0.0) as u32).min(height - 1);
                for row in min_y..=max_y {
                    for col in min_x..=max_x {
                        let center = Point::new(col as f32 + 0.5, row as f32 + 0.5);
                        if distance_to_segment(center, a, b) <= half {
                            mask[(row * width + col) as usize] = true;
                        }
                    }
                }
            }
        }
        mask
    }

    fn blend_mask(&mut self, mask: &[bool], color: Color) {
        let width = self.canvas.width();
        let src = color.to_rgba8();
        for (index, covered) in mask.iter().enumerate() {
            if *covered {
                let x = index as u32 % width;
                let y = index as u32 / width;
                blend(self.canvas.get_pixel_mut(x, y), src);
            }
        }
    }
}

impl OverlaySurface for RasterSurface {
    fn begin_frame(&mut self, width: u32, height: u32) -> Result<(), ScanError> {
        if self.canvas.dimensions() != (width, height) {
            debug!(width, height, "Resizing overlay canvas");
            self.canvas = RgbaImage::new(width, height);
        } else {
            for pixel in self.canvas.pixels_mut() {
                *pixel = Rgba([0, 0, 0, 0]);
            }
        }
        Ok(())
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        let (canvas_w, canvas_h) = self.canvas.dimensions();
        let (x, width) = if self.mirrored {
            (canvas_w as f32 - x - width, width)
        } else {
            (x, width)
        };
        let start_x = x.round().max(0.0) as u32;
        let end_x = ((x + width).round().max(0.0) as u32).min(canvas_w);
        let start_y = y.round().max(0.0) as u32;
        let end_y = ((y + height).round().max(0.0) as u32).min(canvas_h);
        let src = color.to_rgba8();
        for row in start_y..end_y {
            for col in start_x..end_x {
                blend(self.canvas.get_pixel_mut(col, row), src);
            }
        }
    }

    fn fill_path(&mut self, path: &Path, color: Color) {
        let mask = self.fill_mask(&self.polylines(path));
        self.blend_mask(&mask, color);
    }

    fn cut_out(&mut self, path: &Path) {
        let mask = self.fill_mask(&self.polylines(path));
        let width = self.canvas.width();
        for (index, covered) in mask.iter().enumerate() {
            if *covered {
                let pixel = self
                    .canvas
                    .get_pixel_mut(index as u32 % width, index as u32 / width);
                *pixel = Rgba([0, 0, 0, 0]);
            }
        }
    }

    fn stroke_path(&mut self, path: &Path, color: Color, width: f32) {
        if width <= 0.0 {
            return;
        }
        let mask = self.stroke_mask(&self.polylines(path), width);
        self.blend_mask(&mask, color);
    }

    fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }
}

/// Source-over blend of `src` onto `dst`
fn blend(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let src_a = src[3] as f32 / 255.0;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for channel in 0..3 {
        let s = src[channel] as f32 / 255.0;
        let d = dst[channel] as f32 / 255.0;
        let out = (s * src_a + d * dst_a * (1.0 - src_a)) / out_a;
        dst[channel] = (out * 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.x + t * dx, a.y + t * dy);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::frame_processor::types::RoiRect;
    use crate::app::qr_overlay::paths;

    const RED: Color = Color::from_rgb(1.0, 0.0, 0.0);

    fn alpha(surface: &RasterSurface, x: u32, y: u32) -> u8 {
        surface.image().get_pixel(x, y)[3]
    }

    #[test]
    fn test_mask_with_cut_out_hole() {
        let mut surface = RasterSurface::default();
        surface.begin_frame(40, 20).unwrap();
        surface.fill_rect(0.0, 0.0, 40.0, 20.0, Color::from_rgba(0.0, 0.0, 0.0, 0.5));
        surface.cut_out(&paths::rounded_rect(&RoiRect::new(10, 5, 20, 10), 0.0));

        assert_eq!(alpha(&surface, 0, 0), 128);
        assert_eq!(alpha(&surface, 39, 19), 128);
        assert_eq!(alpha(&surface, 15, 10), 0);
        assert_eq!(alpha(&surface, 10, 5), 0);
        assert_eq!(alpha(&surface, 9, 5), 128);
    }

    #[test]
    fn test_stroke_covers_only_the_line() {
        let mut surface = RasterSurface::new(20, 20);
        let path = Path::new()
            .move_to(Point::new(2.0, 10.0))
            .line_to(Point::new(18.0, 10.0));
        surface.stroke_path(&path, RED, 2.0);

        assert_eq!(surface.image().get_pixel(10, 9).0, [255, 0, 0, 255]);
        assert_eq!(alpha(&surface, 10, 10), 255);
        assert_eq!(alpha(&surface, 10, 5), 0);
        assert_eq!(alpha(&surface, 0, 10), 0);
    }

    #[test]
    fn test_mirrored_drawing_is_reflected() {
        let mut surface = RasterSurface::new(20, 10);
        surface.set_mirrored(true);
        surface.fill_rect(0.0, 0.0, 5.0, 10.0, RED);
        assert_eq!(alpha(&surface, 17, 5), 255);
        assert_eq!(alpha(&surface, 2, 5), 0);
    }

    #[test]
    fn test_begin_frame_resizes_and_clears() {
        let mut surface = RasterSurface::new(4, 4);
        surface.fill_rect(0.0, 0.0, 4.0, 4.0, RED);
        surface.begin_frame(4, 4).unwrap();
        assert_eq!(alpha(&surface, 1, 1), 0);
        surface.begin_frame(8, 2).unwrap();
        assert_eq!(surface.image().dimensions(), (8, 2));
    }

    #[test]
    fn test_blend_over_translucent() {
        let mut pixel = Rgba([0, 0, 0, 128]);
        blend(&mut pixel, [255, 255, 255, 255]);
        assert_eq!(pixel.0, [255, 255, 255, 255]);
    }
}
