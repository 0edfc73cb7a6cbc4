// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera sources

use crate::app::frame_processor::types::RoiRect;
use std::sync::Arc;
use std::time::Instant;

/// Pixel layout of a [`CameraFrame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    Rgba,
    /// Gray8 - 8-bit luma (1 byte per pixel)
    Gray8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A single video frame snapshot
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// Pixel data, `stride` bytes per row
    pub data: Arc<[u8]>,
    pub format: PixelFormat,
    /// Bytes per row (may include padding)
    pub stride: u32,
    /// When the frame was captured
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA pixels
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::Rgba,
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// Wrap tightly packed 8-bit luma
    pub fn from_gray(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: PixelFormat::Gray8,
            stride: width,
            captured_at: Instant::now(),
        }
    }

    /// Copy the pixels inside `region` into a new, tightly packed frame
    ///
    /// The region is clipped to the frame; stride padding is dropped.
    pub fn crop(&self, region: RoiRect) -> CameraFrame {
        let x = region.x.min(self.width);
        let y = region.y.min(self.height);
        let width = region.width.min(self.width - x);
        let height = region.height.min(self.height - y);

        let bpp = self.format.bytes_per_pixel();
        let stride = self.stride as usize;
        let row_bytes = width as usize * bpp;
        let mut data = Vec::with_capacity(row_bytes * height as usize);

        for row in y as usize..(y + height) as usize {
            let start = row * stride + x as usize * bpp;
            let end = start + row_bytes;
            if end <= self.data.len() {
                data.extend_from_slice(&self.data[start..end]);
            }
        }

        CameraFrame {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            format: self.format,
            stride: width * bpp as u32,
            captured_at: self.captured_at,
        }
    }

    /// Luma value at (x, y) using BT.601 weights for RGBA input
    pub fn luma_at(&self, x: usize, y: usize) -> u8 {
        let stride = self.stride as usize;
        match self.format {
            PixelFormat::Gray8 => self.data.get(y * stride + x).copied().unwrap_or(0),
            PixelFormat::Rgba => {
                let offset = y * stride + x * 4;
                match self.data.get(offset..offset + 3) {
                    Some(&[r, g, b]) => {
                        ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000) as u8
                    }
                    _ => 0,
                }
            }
        }
    }
}
