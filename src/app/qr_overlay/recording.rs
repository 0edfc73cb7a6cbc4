// SPDX-License-Identifier: GPL-3.0-only

//! Surface that records draw calls instead of rasterizing them

use super::{Color, OverlaySurface, Path};
use crate::errors::ScanError;
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded draw call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    BeginFrame {
        width: u32,
        height: u32,
    },
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    FillPath {
        path: Path,
        color: Color,
    },
    CutOut {
        path: Path,
    },
    StrokePath {
        path: Path,
        color: Color,
        width: f32,
    },
    SetMirrored(bool),
}

#[derive(Debug, Default)]
struct LogInner {
    ops: Vec<DrawOp>,
    available: bool,
}

/// Shared handle onto a [`RecordingSurface`]'s log
///
/// Stays usable after the surface itself has been handed to a scanner.
#[derive(Debug, Clone)]
pub struct SurfaceLog {
    inner: Arc<Mutex<LogInner>>,
}

impl SurfaceLog {
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        // A poisoned log only means a test panicked mid-draw
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every draw call so far
    pub fn ops(&self) -> Vec<DrawOp> {
        self.lock().ops.clone()
    }

    /// Number of frames started
    pub fn frames_rendered(&self) -> usize {
        self.lock()
            .ops
            .iter()
            .filter(|op| matches!(op, DrawOp::BeginFrame { .. }))
            .count()
    }

    /// Draw calls of the most recent frame
    pub fn last_frame(&self) -> Vec<DrawOp> {
        let inner = self.lock();
        let start = inner
            .ops
            .iter()
            .rposition(|op| matches!(op, DrawOp::BeginFrame { .. }))
            .unwrap_or(0);
        inner.ops[start..].to_vec()
    }

    pub fn clear(&self) {
        self.lock().ops.clear();
    }

    /// Simulate the surface going away (or coming back)
    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }
}

/// Records every draw call into a [`SurfaceLog`]
#[derive(Debug)]
pub struct RecordingSurface {
    log: SurfaceLog,
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            log: SurfaceLog {
                inner: Arc::new(Mutex::new(LogInner {
                    ops: Vec::new(),
                    available: true,
                })),
            },
        }
    }

    /// Handle for inspecting the recorded calls
    pub fn log(&self) -> SurfaceLog {
        self.log.clone()
    }

    fn record(&mut self, op: DrawOp) {
        self.log.lock().ops.push(op);
    }
}

impl OverlaySurface for RecordingSurface {
    fn begin_frame(&mut self, width: u32, height: u32) -> Result<(), ScanError> {
        if !self.log.lock().available {
            return Err(ScanError::Surface("recording surface unavailable".into()));
        }
        self.record(DrawOp::BeginFrame { width, height });
        Ok(())
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.record(DrawOp::FillRect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn fill_path(&mut self, path: &Path, color: Color) {
        self.record(DrawOp::FillPath {
            path: path.clone(),
            color,
        });
    }

    fn cut_out(&mut self, path: &Path) {
        self.record(DrawOp::CutOut { path: path.clone() });
    }

    fn stroke_path(&mut self, path: &Path, color: Color, width: f32) {
        self.record(DrawOp::StrokePath {
            path: path.clone(),
            color,
            width,
        });
    }

    fn set_mirrored(&mut self, mirrored: bool) {
        self.record(DrawOp::SetMirrored(mirrored));
    }
}
