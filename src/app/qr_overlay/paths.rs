// SPDX-License-Identifier: GPL-3.0-only

//! Vector paths for the scanner overlay
//!
//! Angles are in radians with the y axis pointing down, so increasing
//! angles sweep clockwise on screen.

use crate::app::frame_processor::types::{Point, RoiRect};
use std::f32::consts::{FRAC_PI_2, PI};

/// A single path instruction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    /// Start a new subpath
    MoveTo(Point),
    LineTo(Point),
    /// Circular arc; a straight line joins the current point to the arc start
    Arc {
        center: Point,
        radius: f32,
        start_angle: f32,
        end_angle: f32,
    },
    /// Close the current subpath
    Close,
}

/// A flattened subpath
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
    pub closed: bool,
}

/// A sequence of path commands
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    commands: Vec<PathCommand>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(mut self, point: Point) -> Self {
        self.commands.push(PathCommand::MoveTo(point));
        self
    }

    pub fn line_to(mut self, point: Point) -> Self {
        self.commands.push(PathCommand::LineTo(point));
        self
    }

    pub fn arc(mut self, center: Point, radius: f32, start_angle: f32, end_angle: f32) -> Self {
        self.commands.push(PathCommand::Arc {
            center,
            radius,
            start_angle,
            end_angle,
        });
        self
    }

    pub fn close(mut self) -> Self {
        self.commands.push(PathCommand::Close);
        self
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Closed polygon through `points`
    pub fn polygon(points: &[Point]) -> Self {
        let mut iter = points.iter();
        let Some(first) = iter.next() else {
            return Self::new();
        };
        iter.fold(Self::new().move_to(*first), |path, p| path.line_to(*p))
            .close()
    }

    /// Convert arcs to line segments, `segments_per_quarter` per 90 degrees
    pub fn flatten(&self, segments_per_quarter: usize) -> Vec<Polyline> {
        let segments_per_quarter = segments_per_quarter.max(1);
        let mut polylines = Vec::new();
        let mut current = Polyline {
            points: Vec::new(),
            closed: false,
        };

        for command in &self.commands {
            match *command {
                PathCommand::MoveTo(point) => {
                    if current.points.len() > 1 {
                        polylines.push(current);
                    }
                    current = Polyline {
                        points: vec![point],
                        closed: false,
                    };
                }
                PathCommand::LineTo(point) => current.points.push(point),
                PathCommand::Arc {
                    center,
                    radius,
                    start_angle,
                    end_angle,
                } => {
                    let sweep = end_angle - start_angle;
                    let steps = ((sweep.abs() / FRAC_PI_2) * segments_per_quarter as f32)
                        .ceil()
                        .max(1.0) as usize;
                    for step in 0..=steps {
                        let angle = start_angle + sweep * step as f32 / steps as f32;
                        current.points.push(Point::new(
                            center.x + radius * angle.cos(),
                            center.y + radius * angle.sin(),
                        ));
                    }
                }
                PathCommand::Close => {
                    current.closed = true;
                    let start = current.points.first().copied();
                    if current.points.len() > 1 {
                        polylines.push(current);
                    }
                    current = Polyline {
                        points: start.into_iter().collect(),
                        closed: false,
                    };
                }
            }
        }

        if current.points.len() > 1 {
            polylines.push(current);
        }
        polylines
    }
}

/// Corner radius that fits the rectangle
pub fn effective_radius(roi: &RoiRect, radius: f32) -> f32 {
    radius
        .max(0.0)
        .min(roi.width as f32 / 2.0)
        .min(roi.height as f32 / 2.0)
}

/// Closed rounded rectangle around the ROI
pub fn rounded_rect(roi: &RoiRect, radius: f32) -> Path {
    let x = roi.x as f32;
    let y = roi.y as f32;
    let w = roi.width as f32;
    let h = roi.height as f32;
    let r = effective_radius(roi, radius);

    Path::new()
        .move_to(Point::new(x + r, y))
        .line_to(Point::new(x + w - r, y))
        .arc(Point::new(x + w - r, y + r), r, -FRAC_PI_2, 0.0)
        .line_to(Point::new(x + w, y + h - r))
        .arc(Point::new(x + w - r, y + h - r), r, 0.0, FRAC_PI_2)
        .line_to(Point::new(x + r, y + h))
        .arc(Point::new(x + r, y + h - r), r, FRAC_PI_2, PI)
        .line_to(Point::new(x, y + r))
        .arc(Point::new(x + r, y + r), r, PI, PI + FRAC_PI_2)
        .close()
}

/// Straight arm lengths of the corner brackets (horizontal, vertical)
///
/// Each arm stops at the middle of its edge, so brackets never overlap.
pub fn bracket_arms(roi: &RoiRect, radius: f32, length: f32) -> (f32, f32) {
    let r = effective_radius(roi, radius);
    let length = length.max(0.0);
    let horizontal = length.min((roi.width as f32 / 2.0 - r).max(0.0));
    let vertical = length.min((roi.height as f32 / 2.0 - r).max(0.0));
    (horizontal, vertical)
}

/// Four open L-shaped brackets following the rounded corners
///
/// Order: top-left, top-right, bottom-right, bottom-left.
pub fn corner_brackets(roi: &RoiRect, radius: f32, length: f32) -> [Path; 4] {
    let x = roi.x as f32;
    let y = roi.y as f32;
    let w = roi.width as f32;
    let h = roi.height as f32;
    let r = effective_radius(roi, radius);
    let (sh, sv) = bracket_arms(roi, radius, length);

    [
        Path::new()
            .move_to(Point::new(x, y + r + sv))
            .line_to(Point::new(x, y + r))
            .arc(Point::new(x + r, y + r), r, PI, PI + FRAC_PI_2)
            .line_to(Point::new(x + r + sh, y)),
        Path::new()
            .move_to(Point::new(x + w - r - sh, y))
            .line_to(Point::new(x + w - r, y))
            .arc(Point::new(x + w - r, y + r), r, -FRAC_PI_2, 0.0)
            .line_to(Point::new(x + w, y + r + sv)),
        Path::new()
            .move_to(Point::new(x + w, y + h - r - sv))
            .line_to(Point::new(x + w, y + h - r))
            .arc(Point::new(x + w - r, y + h - r), r, 0.0, FRAC_PI_2)
            .line_to(Point::new(x + w - r - sh, y + h)),
        Path::new()
            .move_to(Point::new(x + r + sh, y + h))
            .line_to(Point::new(x + r, y + h))
            .arc(Point::new(x + r, y + h - r), r, FRAC_PI_2, PI)
            .line_to(Point::new(x, y + h - r - sv)),
    ]
}
