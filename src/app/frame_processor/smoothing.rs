// SPDX-License-Identifier: GPL-3.0-only

//! Temporal smoothing of detection outlines
//!
//! Backends report slightly different corners every frame, which makes a raw
//! outline jitter. An exponential moving average over the vertices steadies
//! it while still following real movement.

use super::types::Point;
use crate::constants::timing::SMOOTHING_ALPHA;

/// Blend `next` into `previous` with smoothing factor `alpha`
///
/// Returns a copy of `next` when there is no previous polygon or when the
/// vertex counts differ, since averaging across different shapes is
/// meaningless.
pub fn smooth(previous: Option<&[Point]>, next: &[Point], alpha: f32) -> Vec<Point> {
    match previous {
        Some(previous) if previous.len() == next.len() => previous
            .iter()
            .zip(next)
            .map(|(p, n)| Point::new(p.x + alpha * (n.x - p.x), p.y + alpha * (n.y - p.y)))
            .collect(),
        _ => next.to_vec(),
    }
}

/// Arithmetic mean of the vertices
///
/// Returns `None` for an empty slice.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(x, y), p| (x + p.x, y + p.y));
    Some(Point::new(sum_x / n, sum_y / n))
}

/// Smoothing memory for one scanner session
#[derive(Debug, Clone)]
pub struct SmoothingFilter {
    alpha: f32,
    last: Option<Vec<Point>>,
}

impl Default for SmoothingFilter {
    fn default() -> Self {
        Self::new(SMOOTHING_ALPHA)
    }
}

impl SmoothingFilter {
    /// Create a filter; `alpha` is clamped to 0.0..=1.0
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: if alpha.is_finite() { alpha.clamp(0.0, 1.0) } else { SMOOTHING_ALPHA },
            last: None,
        }
    }

    /// Feed the next polygon and return the smoothed one
    pub fn update(&mut self, next: &[Point]) -> &[Point] {
        let smoothed = smooth(self.last.as_deref(), next, self.alpha);
        self.last.insert(smoothed).as_slice()
    }

    /// Last smoothed polygon
    pub fn current(&self) -> Option<&[Point]> {
        self.last.as_deref()
    }

    /// Forget the previous polygon
    pub fn reset(&mut self) {
        self.last = None;
    }
}
