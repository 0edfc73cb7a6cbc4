// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for constants module

use roi_scanner::constants::{self, CameraFacing, file_formats};

#[test]
fn test_camera_facing_values() {
    assert_eq!(CameraFacing::ALL.len(), 2);
    for facing in CameraFacing::ALL {
        assert_ne!(facing, facing.toggled());
        assert_eq!(facing, facing.toggled().toggled());
        assert!(!facing.display_name().is_empty());
    }
}

#[test]
fn test_roi_defaults_are_in_range() {
    assert!(constants::roi::SIZE_RATIO > 0.0 && constants::roi::SIZE_RATIO <= 1.0);
    assert!(constants::roi::ASPECT_RATIO >= constants::roi::MIN_ASPECT_RATIO);
    assert!(constants::roi::CORNER_LENGTH > 0.0);
    assert!((0.0..=1.0).contains(&constants::roi::FILL_OPACITY));
}

#[test]
fn test_native_limits_disabled_by_default() {
    assert_eq!(constants::engine::NATIVE_TIMEOUT_MS, 0);
    assert_eq!(constants::engine::NATIVE_MAX_ZERO_FRAMES, 0);
}

#[test]
fn test_smoothing_factor() {
    assert_eq!(constants::timing::SMOOTHING_ALPHA, 0.35);
    assert!(constants::timing::FRAME_SKIP >= 1);
    // detection budget follows the frame cadence unless overridden
    assert_eq!(constants::timing::DETECT_STALL_MS, 0);
}

#[test]
fn test_image_extensions() {
    assert!(file_formats::is_image_extension("png"));
    assert!(file_formats::is_image_extension("JPG"));
    assert!(!file_formats::is_image_extension("mp4"));
}

#[test]
fn test_version_is_set() {
    assert!(!constants::app_info::version().is_empty());
}
