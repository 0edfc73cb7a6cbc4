// SPDX-License-Identifier: GPL-3.0-only

//! Scanner configuration
//!
//! Every option has a default from [`crate::constants`]. Values read from
//! disk or the command line are never rejected; [`ScannerConfig::sanitized`]
//! clamps them into their valid ranges instead.

use crate::app::qr_overlay::Color;
use crate::constants::{self, CameraFacing, app_info};
use crate::errors::{ScanError, ScanResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Shape of the region of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoiShape {
    #[default]
    Square,
    /// Rectangle following `aspect_ratio`
    Rect,
}

/// How the ROI border is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderStyle {
    /// Continuous rounded rectangle
    Full,
    /// Four L-shaped brackets hugging the rounded corners
    #[default]
    Corner,
}

/// Region-of-interest geometry and styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub shape: RoiShape,
    /// Width divided by height, only used by [`RoiShape::Rect`]
    pub aspect_ratio: f32,
    /// Fraction of the frame's shorter side (0.0 to 1.0)
    pub size_ratio: f32,
    /// Inward padding in pixels
    pub padding: f32,
    pub corner_radius: f32,
    pub border_style: BorderStyle,
    pub border_width: f32,
    /// Arm length of each corner bracket
    pub corner_length: f32,
    /// Stroke width of each corner bracket
    pub corner_width: f32,
    /// Opacity of the fill inside the ROI (0.0 to 1.0)
    pub fill_opacity: f32,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            shape: RoiShape::default(),
            aspect_ratio: constants::roi::ASPECT_RATIO,
            size_ratio: constants::roi::SIZE_RATIO,
            padding: constants::roi::PADDING,
            corner_radius: constants::roi::CORNER_RADIUS,
            border_style: BorderStyle::default(),
            border_width: constants::roi::BORDER_WIDTH,
            corner_length: constants::roi::CORNER_LENGTH,
            corner_width: constants::roi::CORNER_WIDTH,
            fill_opacity: constants::roi::FILL_OPACITY,
        }
    }
}

impl RoiConfig {
    /// Clamp every value into its valid range
    pub fn sanitized(&self) -> Self {
        Self {
            shape: self.shape,
            aspect_ratio: finite_or(self.aspect_ratio, constants::roi::ASPECT_RATIO)
                .max(constants::roi::MIN_ASPECT_RATIO),
            size_ratio: finite_or(self.size_ratio, constants::roi::SIZE_RATIO).clamp(0.0, 1.0),
            padding: non_negative(self.padding),
            corner_radius: non_negative(self.corner_radius),
            border_style: self.border_style,
            border_width: non_negative(self.border_width),
            corner_length: non_negative(self.corner_length),
            corner_width: non_negative(self.corner_width),
            fill_opacity: finite_or(self.fill_opacity, 0.0).clamp(0.0, 1.0),
        }
    }
}

/// Colors used by the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayColors {
    pub mask: Color,
    pub idle: Color,
    pub active: Color,
    pub fill: Color,
    pub outline: Color,
    pub outline_width: f32,
}

impl Default for OverlayColors {
    fn default() -> Self {
        Self {
            mask: Color::from_array(constants::overlay::MASK_COLOR),
            idle: Color::from_array(constants::overlay::IDLE_COLOR),
            active: Color::from_array(constants::overlay::ACTIVE_COLOR),
            fill: Color::from_array(constants::overlay::FILL_COLOR),
            outline: Color::from_array(constants::overlay::OUTLINE_COLOR),
            outline_width: constants::overlay::OUTLINE_WIDTH,
        }
    }
}

/// Complete scanner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Process one in every `frame_skip` ticks (>= 1)
    pub frame_skip: u32,
    /// Mirror the detection outline while the front camera is active
    pub mirror_front_camera: bool,
    pub roi: RoiConfig,
    /// Darken the frame outside the ROI
    pub show_mask: bool,
    /// Only hand the ROI crop to the detector
    pub crop_to_roi: bool,
    /// Drop detections whose centroid lies outside the ROI
    pub roi_only: bool,
    /// Skip the native detector entirely
    #[serde(alias = "force_wasm")]
    pub force_fallback: bool,
    /// Native detector time budget in ms (0 disables)
    pub native_timeout_ms: u64,
    /// Consecutive empty native results before falling back (0 disables)
    pub native_max_zero_frames: u32,
    /// Start (or stay) paused
    pub paused: bool,
    /// Release the camera device while paused
    pub release_on_pause: bool,
    /// Publish detection events
    pub emit_detections: bool,
    /// Stop scanning after the first detection
    #[serde(alias = "scan_once")]
    pub stop_after_detection: bool,
    pub tick_interval_ms: u64,
    /// Detection budget in ms before a frame counts as stalled (0 follows
    /// the frame cadence)
    pub detect_stall_ms: u64,
    pub smoothing_alpha: f32,
    /// Camera used when scanning starts
    pub facing: CameraFacing,
    pub colors: OverlayColors,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            frame_skip: constants::timing::FRAME_SKIP,
            mirror_front_camera: true,
            roi: RoiConfig::default(),
            show_mask: true,
            crop_to_roi: false,
            roi_only: false,
            force_fallback: false,
            native_timeout_ms: constants::engine::NATIVE_TIMEOUT_MS,
            native_max_zero_frames: constants::engine::NATIVE_MAX_ZERO_FRAMES,
            paused: false,
            release_on_pause: false,
            emit_detections: true,
            stop_after_detection: false,
            tick_interval_ms: constants::timing::TICK_INTERVAL_MS,
            detect_stall_ms: constants::timing::DETECT_STALL_MS,
            smoothing_alpha: constants::timing::SMOOTHING_ALPHA,
            facing: CameraFacing::default(),
            colors: OverlayColors::default(),
        }
    }
}

impl ScannerConfig {
    /// Clamp every value into its valid range
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        config.frame_skip = self.frame_skip.max(1);
        config.roi = self.roi.sanitized();
        config.tick_interval_ms = self.tick_interval_ms.max(1);
        config.smoothing_alpha =
            finite_or(self.smoothing_alpha, constants::timing::SMOOTHING_ALPHA).clamp(0.0, 1.0);
        config.colors.outline_width = non_negative(self.colors.outline_width);
        config
    }

    /// Native detector budget, if enabled
    pub fn native_timeout(&self) -> Option<Duration> {
        (self.native_timeout_ms > 0).then(|| Duration::from_millis(self.native_timeout_ms))
    }

    /// Consecutive empty native results tolerated, if enabled
    pub fn native_max_zero_frames(&self) -> Option<u32> {
        (self.native_max_zero_frames > 0).then_some(self.native_max_zero_frames)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Time a detection may take before its frame is skipped as stalled
    ///
    /// Without an override this is the time until the next processed frame.
    pub fn detect_stall_budget(&self) -> Duration {
        if self.detect_stall_ms > 0 {
            Duration::from_millis(self.detect_stall_ms)
        } else {
            self.tick_interval() * self.frame_skip.max(1)
        }
    }

    /// Whether the outline is mirrored for the given camera
    pub fn mirrored_for(&self, facing: CameraFacing) -> bool {
        self.mirror_front_camera && facing == CameraFacing::Front
    }

    /// Default config file location (`<config dir>/roi-scanner/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app_info::APP_NAME).join(app_info::CONFIG_FILE))
    }

    /// Load a configuration file; the result is already sanitized
    pub fn load(path: &Path) -> ScanResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScanError::Config(format!("{}: {}", path.display(), e)))?;
        let config: ScannerConfig = serde_json::from_str(&text)?;
        info!(path = %path.display(), "Loaded scanner configuration");
        Ok(config.sanitized())
    }

    /// Load the file at `path`, or the default location, or fall back to defaults
    pub fn load_or_default(path: Option<&Path>) -> ScanResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> ScanResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved scanner configuration");
        Ok(())
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

fn non_negative(value: f32) -> f32 {
    finite_or(value, 0.0).max(0.0)
}
