// SPDX-License-Identifier: GPL-3.0-only

//! Core types for frame processing results
//!
//! All coordinates are in frame pixels with the origin at the top-left
//! corner of the full (uncropped) frame.

use serde::{Deserialize, Serialize};

/// A point in frame-pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Shift the point by an offset
    pub fn translated(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Reflect about the vertical centerline of a frame `frame_width` wide
    pub fn mirrored(self, frame_width: f32) -> Self {
        Self::new(frame_width - self.x, self.y)
    }
}

/// The region of interest, derived every frame from the config and frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoiRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RoiRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Inclusive containment test: points on the border count as inside
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x as f32
            && point.x <= self.right() as f32
            && point.y >= self.y as f32
            && point.y <= self.bottom() as f32
    }

    /// Whether the rectangle lies completely inside a frame
    pub fn fits_within(&self, frame_width: u32, frame_height: u32) -> bool {
        self.right() <= frame_width && self.bottom() <= frame_height
    }
}

/// Symbology reported by a detection backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    QrCode,
    MicroQrCode,
    Aztec,
    DataMatrix,
    Pdf417,
    Code128,
    Code39,
    Code93,
    Codabar,
    Ean13,
    Ean8,
    Itf,
    UpcA,
    UpcE,
}

impl BarcodeFormat {
    /// Parse the tag used by platform barcode detectors (e.g. `qr_code`)
    pub fn from_tag(tag: &str) -> Option<Self> {
        let format = match tag.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "qr_code" | "qrcode" | "qr" => Self::QrCode,
            "micro_qr_code" | "microqrcode" => Self::MicroQrCode,
            "aztec" => Self::Aztec,
            "data_matrix" | "datamatrix" => Self::DataMatrix,
            "pdf417" => Self::Pdf417,
            "code_128" | "code128" => Self::Code128,
            "code_39" | "code39" => Self::Code39,
            "code_93" | "code93" => Self::Code93,
            "codabar" => Self::Codabar,
            "ean_13" | "ean13" => Self::Ean13,
            "ean_8" | "ean8" => Self::Ean8,
            "itf" => Self::Itf,
            "upc_a" | "upca" => Self::UpcA,
            "upc_e" | "upce" => Self::UpcE,
            _ => return None,
        };
        Some(format)
    }
}

/// A decoded code with its location
///
/// Produced fresh by the active backend every frame and never mutated;
/// coordinate fixes produce a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedCode {
    /// Decoded text content
    pub raw_value: String,
    pub format: Option<BarcodeFormat>,
    /// Closed polygon, at least three points when present
    pub corners: Option<Vec<Point>>,
}

impl DetectedCode {
    /// Create a detection, dropping degenerate polygons with fewer than 3 points
    pub fn new(raw_value: String, format: Option<BarcodeFormat>, corners: Vec<Point>) -> Self {
        Self {
            raw_value,
            format,
            corners: (corners.len() >= 3).then_some(corners),
        }
    }

    /// Copy of this detection with every corner shifted by an offset
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            raw_value: self.raw_value.clone(),
            format: self.format,
            corners: self
                .corners
                .as_ref()
                .map(|corners| corners.iter().map(|p| p.translated(dx, dy)).collect()),
        }
    }

    /// The polygon, if the backend reported one
    pub fn polygon(&self) -> Option<&[Point]> {
        self.corners.as_deref()
    }
}
