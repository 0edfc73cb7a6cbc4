// SPDX-License-Identifier: GPL-3.0-only

//! Detection engines implemented in this crate

pub mod qr_detector;

pub use qr_detector::QrDetector;
