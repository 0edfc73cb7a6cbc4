// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};

/// Which way the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// User-facing camera (selfie mode)
    Front,
    /// Environment-facing camera (default for scanning)
    #[default]
    Back,
}

impl CameraFacing {
    /// All facings, for UI iteration
    pub const ALL: [CameraFacing; 2] = [CameraFacing::Front, CameraFacing::Back];

    /// The other camera
    pub fn toggled(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }

    /// Get display name for the facing
    pub fn display_name(&self) -> &'static str {
        match self {
            CameraFacing::Front => "Front",
            CameraFacing::Back => "Back",
        }
    }
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Region-of-interest defaults
pub mod roi {
    /// Fraction of the frame's shorter side covered by the ROI
    pub const SIZE_RATIO: f32 = 0.6;

    /// Width/height ratio used by the `rect` shape
    pub const ASPECT_RATIO: f32 = 1.0;

    /// Smallest aspect ratio accepted before clamping
    pub const MIN_ASPECT_RATIO: f32 = 0.01;

    /// Inner padding in pixels
    pub const PADDING: f32 = 0.0;

    /// Corner radius in pixels
    pub const CORNER_RADIUS: f32 = 12.0;

    /// Border stroke width in pixels
    pub const BORDER_WIDTH: f32 = 2.0;

    /// Corner bracket arm length in pixels
    pub const CORNER_LENGTH: f32 = 28.0;

    /// Corner bracket stroke width in pixels
    pub const CORNER_WIDTH: f32 = 4.0;

    /// Opacity of the fill drawn inside the ROI (0 disables it)
    pub const FILL_OPACITY: f32 = 0.0;
}

/// Detection engine selection defaults
pub mod engine {
    /// Native engine budget before falling back, in ms (0 disables)
    pub const NATIVE_TIMEOUT_MS: u64 = 0;

    /// Consecutive empty native results before falling back (0 disables)
    pub const NATIVE_MAX_ZERO_FRAMES: u32 = 0;

    /// Frames are downscaled to this before software decoding
    pub const FALLBACK_MAX_DIMENSION: u32 = 640;
}

/// Frame cadence and smoothing
pub mod timing {
    /// Tick interval approximating a 60 Hz display refresh
    pub const TICK_INTERVAL_MS: u64 = 16;

    /// Detection budget override in ms; 0 allows detection until the next
    /// processed frame is due
    pub const DETECT_STALL_MS: u64 = 0;

    /// Process one in every N ticks
    pub const FRAME_SKIP: u32 = 1;

    /// Exponential moving average factor for the detection outline
    pub const SMOOTHING_ALPHA: f32 = 0.35;

    /// Ticks between periodic frame statistics in the log
    pub const FRAME_LOG_INTERVAL: u64 = 120;
}

/// Overlay colors as RGBA components in 0.0..=1.0
pub mod overlay {
    /// Darkened area outside the ROI
    pub const MASK_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.5];

    /// ROI border while nothing is detected
    pub const IDLE_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.9];

    /// ROI border while a code is detected
    pub const ACTIVE_COLOR: [f32; 4] = [0.30, 0.69, 0.31, 1.0];

    /// Fill color inside the ROI (alpha comes from the fill opacity)
    pub const FILL_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

    /// Outline of the detected code
    pub const OUTLINE_COLOR: [f32; 4] = [0.29, 0.56, 0.89, 1.0];

    /// Outline stroke width in pixels
    pub const OUTLINE_WIDTH: f32 = 3.0;

    /// Line segments used to flatten a quarter circle
    pub const ARC_SEGMENTS_PER_QUARTER: usize = 8;
}

/// Image file extensions accepted as virtual camera frames
pub mod file_formats {
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application info
pub mod app_info {
    /// Application name, also the config directory name
    pub const APP_NAME: &str = "roi-scanner";

    /// Config file name inside the config directory
    pub const CONFIG_FILE: &str = "config.json";

    /// Version string injected by build.rs
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
