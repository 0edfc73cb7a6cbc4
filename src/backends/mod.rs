// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for frame sources and code detection
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  App Layer                   │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                   │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │   Camera    │    │    Detection     │   │
//! │  │  (frames)   │    │ (native/fallback)│   │
//! │  └─────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod camera;
pub mod detection;

pub use camera::{CameraFacing, CameraFrame, CameraProvider, CameraStream};
pub use detection::{DetectionBackend, DetectionEngineSelector, EngineKind};
